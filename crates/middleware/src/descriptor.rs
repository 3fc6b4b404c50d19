//! Analytics descriptor — the tracking intent carried in an action's metadata.
//!
//! Two layouts are understood, selected by [`DescriptorShape`]:
//!
//! ```json
//! // nested
//! {"type": "Login", "metadata": {"analytics": {
//!     "eventName": "login", "type": "Auth", "props": {"method": "sso"},
//!     "timeEvent": "session", "increment": ["logins", 1]}}}
//!
//! // flag
//! {"type": "Login", "metadata": {"analytics": {"method": "sso"},
//!     "analyticsIncrement": "logins"}}
//! ```
//!
//! Malformed fields never fail a read; they are normalized to "absent".

use mixtrack_core::{Action, DescriptorShape, Increment, Properties};
use serde_json::Value;

/// Tracking intent of one action, with defaults already resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyticsDescriptor {
    /// Unformatted event name; `None` means no track call.
    pub event_name: Option<String>,
    /// Unformatted label for the `action` property; `None` adds no such property.
    pub action_label: Option<String>,
    pub properties: Properties,
    pub time_event: Option<String>,
    pub increment: Option<Increment>,
}

impl AnalyticsDescriptor {
    /// True when no client call would result from this descriptor.
    pub fn is_empty(&self) -> bool {
        self.event_name.is_none() && self.time_event.is_none() && self.increment.is_none()
    }
}

/// Reads [`AnalyticsDescriptor`]s from actions.
#[derive(Debug, Clone)]
pub struct DescriptorReader {
    shape: DescriptorShape,
    metadata_key: String,
    increment_key: String,
}

impl DescriptorReader {
    pub fn new(shape: DescriptorShape, metadata_key: impl Into<String>) -> Self {
        let metadata_key = metadata_key.into();
        Self {
            shape,
            increment_key: format!("{metadata_key}Increment"),
            metadata_key,
        }
    }

    /// Read the descriptor, or `None` when the action carries no analytics
    /// intent at all.
    pub fn read(&self, action: &Action) -> Option<AnalyticsDescriptor> {
        let descriptor = match self.shape {
            DescriptorShape::Nested => self.read_nested(action),
            DescriptorShape::Flag => self.read_flag(action),
        };
        descriptor.filter(|d| !d.is_empty())
    }

    fn read_nested(&self, action: &Action) -> Option<AnalyticsDescriptor> {
        let fields = action.metadata_field(&self.metadata_key)?.as_object()?;

        let event_name = non_empty_str(fields.get("eventName"));
        let action_label = event_name.as_ref().map(|_| {
            non_empty_str(fields.get("type")).unwrap_or_else(|| action.action_type.clone())
        });

        Some(AnalyticsDescriptor {
            event_name,
            action_label,
            properties: object_or_empty(fields.get("props")),
            time_event: non_empty_str(fields.get("timeEvent")),
            increment: fields.get("increment").and_then(Increment::from_value),
        })
    }

    fn read_flag(&self, action: &Action) -> Option<AnalyticsDescriptor> {
        let flag = action.metadata_field(&self.metadata_key);
        let increment = action
            .metadata_field(&self.increment_key)
            .and_then(Increment::from_value);

        let tracked = flag.is_some_and(is_truthy);
        if !tracked && increment.is_none() {
            return None;
        }

        Some(AnalyticsDescriptor {
            event_name: tracked.then(|| action.action_type.clone()),
            action_label: None,
            properties: if tracked {
                object_or_empty(flag)
            } else {
                Properties::new()
            },
            time_event: None,
            increment,
        })
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn object_or_empty(value: Option<&Value>) -> Properties {
    value
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Number};

    fn action(value: Value) -> Action {
        serde_json::from_value(value).unwrap()
    }

    fn nested() -> DescriptorReader {
        DescriptorReader::new(DescriptorShape::Nested, "analytics")
    }

    #[test]
    fn test_no_metadata() {
        let reader = nested();
        assert!(reader.read(&Action::new("Action")).is_none());
        assert!(reader
            .read(&action(json!({"type": "Action", "metadata": {"foo": "bar"}})))
            .is_none());
    }

    #[test]
    fn test_nested_full() {
        let reader = nested();
        let d = reader
            .read(&action(json!({
                "type": "Action",
                "metadata": {"analytics": {
                    "eventName": "fooEvent",
                    "type": "Custom",
                    "props": {"foo": "bar"},
                    "timeEvent": "checkout",
                    "increment": {"login": 1}
                }}
            })))
            .unwrap();

        assert_eq!(d.event_name.as_deref(), Some("fooEvent"));
        assert_eq!(d.action_label.as_deref(), Some("Custom"));
        assert_eq!(d.properties["foo"], "bar");
        assert_eq!(d.time_event.as_deref(), Some("checkout"));
        assert_eq!(
            d.increment,
            Some(Increment::Batch {
                deltas: vec![("login".into(), Number::from(1))]
            })
        );
        assert!(d.event_name.is_some());
    }

    #[test]
    fn test_nested_label_falls_back_to_action_type() {
        let reader = nested();
        let d = reader
            .read(&action(json!({
                "type": "Action",
                "metadata": {"analytics": {"eventName": "fooEvent"}}
            })))
            .unwrap();
        assert_eq!(d.action_label.as_deref(), Some("Action"));
        assert!(d.properties.is_empty());
    }

    #[test]
    fn test_nested_malformed_props_become_empty() {
        let reader = nested();
        let d = reader
            .read(&action(json!({
                "type": "Action",
                "metadata": {"analytics": {"eventName": "fooEvent", "props": "oops"}}
            })))
            .unwrap();
        assert!(d.properties.is_empty());
    }

    #[test]
    fn test_nested_without_event_name_still_times_and_increments() {
        let reader = nested();
        let d = reader
            .read(&action(json!({
                "type": "Action",
                "metadata": {"analytics": {"timeEvent": "checkout", "increment": "login"}}
            })))
            .unwrap();
        assert!(d.event_name.is_none());
        assert!(d.action_label.is_none());
        assert_eq!(d.time_event.as_deref(), Some("checkout"));
    }

    #[test]
    fn test_nested_non_object_or_inert_is_absent() {
        let reader = nested();
        assert!(reader
            .read(&action(json!({"type": "A", "metadata": {"analytics": true}})))
            .is_none());
        assert!(reader
            .read(&action(json!({"type": "A", "metadata": {"analytics": {"increment": ""}}})))
            .is_none());
    }

    #[test]
    fn test_flag_true_tracks_action_type() {
        let reader = DescriptorReader::new(DescriptorShape::Flag, "analytics");
        let d = reader
            .read(&action(json!({"type": "Action", "metadata": {"analytics": true}})))
            .unwrap();
        assert_eq!(d.event_name.as_deref(), Some("Action"));
        assert!(d.action_label.is_none());
        assert!(d.properties.is_empty());
    }

    #[test]
    fn test_flag_object_supplies_properties() {
        let reader = DescriptorReader::new(DescriptorShape::Flag, "mixpanel");
        let d = reader
            .read(&action(json!({
                "type": "Action",
                "metadata": {"mixpanel": {"foo": "bar"}, "mixpanelIncrement": ["login"]}
            })))
            .unwrap();
        assert_eq!(d.properties["foo"], "bar");
        assert_eq!(
            d.increment,
            Some(Increment::Property {
                name: "login".into()
            })
        );
    }

    #[test]
    fn test_flag_falsy_values() {
        let reader = DescriptorReader::new(DescriptorShape::Flag, "analytics");
        for flag in [json!(false), json!(0), json!(""), Value::Null] {
            let a = action(json!({"type": "A", "metadata": {"analytics": flag}}));
            assert!(reader.read(&a).is_none());
        }
    }

    #[test]
    fn test_flag_increment_without_tracking() {
        let reader = DescriptorReader::new(DescriptorShape::Flag, "analytics");
        let d = reader
            .read(&action(json!({
                "type": "A",
                "metadata": {"analyticsIncrement": "login"}
            })))
            .unwrap();
        assert!(d.event_name.is_none());
        assert!(d.increment.is_some());
    }
}
