//! Formatting hooks applied to event names, property keys and property values
//! before they reach the analytics client. Every hook defaults to identity.

use std::fmt;
use std::sync::Arc;

use mixtrack_core::{Increment, Properties};
use serde_json::Value;

pub type NameFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;
pub type ValueFormatter = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

#[derive(Clone)]
pub struct Formatters {
    action_type: NameFormatter,
    property: NameFormatter,
    value: ValueFormatter,
}

impl Default for Formatters {
    fn default() -> Self {
        Self {
            action_type: Arc::new(|name: &str| name.to_string()),
            property: Arc::new(|key: &str| key.to_string()),
            value: Arc::new(|value: &Value| value.clone()),
        }
    }
}

impl fmt::Debug for Formatters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formatters").finish_non_exhaustive()
    }
}

impl Formatters {
    pub fn with_action_type<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.action_type = Arc::new(formatter);
        self
    }

    pub fn with_property<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.property = Arc::new(formatter);
        self
    }

    pub fn with_value<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.value = Arc::new(formatter);
        self
    }

    /// Format an event name or action type label.
    pub fn action_type(&self, name: &str) -> String {
        (self.action_type)(name)
    }

    pub fn property(&self, key: &str) -> String {
        (self.property)(key)
    }

    pub fn value(&self, value: &Value) -> Value {
        (self.value)(value)
    }

    /// `prefix` followed by the formatted name.
    pub fn event_name(&self, prefix: &str, name: &str) -> String {
        let formatted = self.action_type(name);
        if prefix.is_empty() {
            formatted
        } else {
            format!("{prefix}{formatted}")
        }
    }

    /// Rebuild a property mapping with every key and value formatted.
    /// Keys that collide after formatting keep the last value.
    pub fn properties(&self, source: &Properties) -> Properties {
        source
            .iter()
            .fold(Properties::with_capacity(source.len()), |mut out, (key, value)| {
                out.insert(self.property(key), self.value(value));
                out
            })
    }

    /// Rename increment targets with the property formatter.
    pub fn increment(&self, increment: &Increment) -> Increment {
        increment.map_names(|name| self.property(name))
    }
}
