use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Event or person properties. Insertion order is preserved so formatted
/// payloads keep the key order of the source mapping.
pub type Properties = serde_json::Map<String, Value>;

/// A record flowing through the host application's dispatch pipeline.
///
/// The tracking layer only ever reads an action; it is forwarded to the next
/// stage exactly as it was received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Properties>,
}

impl Action {
    pub fn new(action_type: impl Into<String>) -> Self {
        Self {
            action_type: action_type.into(),
            payload: None,
            metadata: None,
        }
    }

    /// Look up a single metadata field.
    pub fn metadata_field(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|meta| meta.get(key))
    }
}

/// Numeric person-property deltas to apply through the collaborator. Deltas
/// keep the JSON number they were written as, integer or float.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Increment {
    /// Increment one property by the collaborator's default amount.
    Property { name: String },
    /// Increment one property by an explicit delta.
    PropertyBy { name: String, by: Number },
    /// Increment several properties in one call.
    Batch { deltas: Vec<(String, Number)> },
}

impl Increment {
    /// Interpret a raw instruction by its JSON shape.
    ///
    /// Returns `None` for anything that should not trigger a call: empty
    /// strings, empty arrays or objects, and scalars that are not strings.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(name) if !name.is_empty() => Some(Increment::Property {
                name: name.clone(),
            }),
            Value::Array(items) => {
                let name = items.first()?.as_str().filter(|n| !n.is_empty())?;
                match items.get(1) {
                    Some(Value::Number(by)) => Some(Increment::PropertyBy {
                        name: name.to_string(),
                        by: by.clone(),
                    }),
                    _ => Some(Increment::Property {
                        name: name.to_string(),
                    }),
                }
            }
            Value::Object(map) => {
                let deltas: Vec<(String, Number)> = map
                    .iter()
                    .filter_map(|(key, delta)| match delta {
                        Value::Number(d) => Some((key.clone(), d.clone())),
                        _ => None,
                    })
                    .collect();
                if deltas.is_empty() {
                    None
                } else {
                    Some(Increment::Batch { deltas })
                }
            }
            _ => None,
        }
    }

    /// Rename every target property, keeping deltas. Batch keys that collide
    /// after renaming keep the last delta at the first key's position.
    pub fn map_names(&self, rename: impl Fn(&str) -> String) -> Self {
        match self {
            Increment::Property { name } => Increment::Property { name: rename(name) },
            Increment::PropertyBy { name, by } => Increment::PropertyBy {
                name: rename(name),
                by: by.clone(),
            },
            Increment::Batch { deltas } => {
                let mut renamed: Vec<(String, Number)> = Vec::with_capacity(deltas.len());
                for (key, delta) in deltas {
                    let key = rename(key);
                    match renamed.iter_mut().find(|(existing, _)| *existing == key) {
                        Some(slot) => slot.1 = delta.clone(),
                        None => renamed.push((key, delta.clone())),
                    }
                }
                Increment::Batch { deltas: renamed }
            }
        }
    }
}
