//! Analytics collaborator — the client the tracking middleware forwards to.
//!
//! The middleware receives an `Arc<dyn AnalyticsClient>` (or any concrete
//! implementation) at construction, so hosts plug in their real service client
//! and tests substitute a [`RecordingClient`] without touching global state.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ClientError;
use crate::types::{Increment, Properties};

/// Passthrough options forwarded opaquely to [`AnalyticsClient::init`].
pub type InitOptions = Properties;

/// Operation set of an analytics service client. Every call is fire-and-forget
/// from the caller's point of view; a returned error is reported, never retried.
pub trait AnalyticsClient: Send + Sync {
    /// One-time setup with the service access token.
    fn init(&self, token: &str, options: &InitOptions) -> Result<(), ClientError>;

    /// Associate subsequent calls with a user.
    fn identify(&self, unique_id: &str) -> Result<(), ClientError>;

    /// Upsert the current user's profile record.
    fn set_person_properties(&self, profile: &Properties) -> Result<(), ClientError>;

    /// Record one event occurrence.
    fn track(&self, event_name: &str, properties: &Properties) -> Result<(), ClientError>;

    /// Start a duration timer consumed by a later `track` of the same name.
    fn time_event(&self, event_name: &str) -> Result<(), ClientError>;

    /// Increment one or more numeric person properties.
    fn increment(&self, increment: &Increment) -> Result<(), ClientError>;
}

impl<C: AnalyticsClient + ?Sized> AnalyticsClient for Arc<C> {
    fn init(&self, token: &str, options: &InitOptions) -> Result<(), ClientError> {
        (**self).init(token, options)
    }

    fn identify(&self, unique_id: &str) -> Result<(), ClientError> {
        (**self).identify(unique_id)
    }

    fn set_person_properties(&self, profile: &Properties) -> Result<(), ClientError> {
        (**self).set_person_properties(profile)
    }

    fn track(&self, event_name: &str, properties: &Properties) -> Result<(), ClientError> {
        (**self).track(event_name, properties)
    }

    fn time_event(&self, event_name: &str) -> Result<(), ClientError> {
        (**self).time_event(event_name)
    }

    fn increment(&self, increment: &Increment) -> Result<(), ClientError> {
        (**self).increment(increment)
    }
}

/// A single collaborator invocation, as data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum ClientCall {
    Init {
        token: String,
        options: InitOptions,
    },
    Identify {
        unique_id: String,
    },
    SetPersonProperties {
        profile: Properties,
    },
    Track {
        event_name: String,
        properties: Properties,
    },
    TimeEvent {
        event_name: String,
    },
    Increment {
        increment: Increment,
    },
}

impl ClientCall {
    /// Operation name, used in logs and metrics labels.
    pub fn operation(&self) -> &'static str {
        match self {
            ClientCall::Init { .. } => "init",
            ClientCall::Identify { .. } => "identify",
            ClientCall::SetPersonProperties { .. } => "set_person_properties",
            ClientCall::Track { .. } => "track",
            ClientCall::TimeEvent { .. } => "time_event",
            ClientCall::Increment { .. } => "increment",
        }
    }

    /// Issue this call against a client.
    pub fn apply<C: AnalyticsClient + ?Sized>(&self, client: &C) -> Result<(), ClientError> {
        match self {
            ClientCall::Init { token, options } => client.init(token, options),
            ClientCall::Identify { unique_id } => client.identify(unique_id),
            ClientCall::SetPersonProperties { profile } => client.set_person_properties(profile),
            ClientCall::Track {
                event_name,
                properties,
            } => client.track(event_name, properties),
            ClientCall::TimeEvent { event_name } => client.time_event(event_name),
            ClientCall::Increment { increment } => client.increment(increment),
        }
    }
}

/// Client that writes every call to the `tracing` log. Calls made before
/// `init` fail with [`ClientError::NotInitialized`].
#[derive(Default)]
pub struct LoggingClient {
    initialized: AtomicBool,
}

impl LoggingClient {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_initialized(&self) -> Result<(), ClientError> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ClientError::NotInitialized)
        }
    }
}

impl AnalyticsClient for LoggingClient {
    fn init(&self, token: &str, options: &InitOptions) -> Result<(), ClientError> {
        self.initialized.store(true, Ordering::Release);
        info!(token_len = token.len(), options = options.len(), "analytics client initialized");
        Ok(())
    }

    fn identify(&self, unique_id: &str) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        info!(unique_id, "identify");
        Ok(())
    }

    fn set_person_properties(&self, profile: &Properties) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        info!(profile = %serde_json::Value::Object(profile.clone()), "set person properties");
        Ok(())
    }

    fn track(&self, event_name: &str, properties: &Properties) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        info!(
            event_name,
            properties = %serde_json::Value::Object(properties.clone()),
            "track"
        );
        Ok(())
    }

    fn time_event(&self, event_name: &str) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        info!(event_name, "time event");
        Ok(())
    }

    fn increment(&self, increment: &Increment) -> Result<(), ClientError> {
        self.ensure_initialized()?;
        info!(?increment, "increment");
        Ok(())
    }
}

/// In-memory client that captures calls for testing. Operations listed in
/// `failing` are still recorded but return a transport error.
#[derive(Default)]
pub struct RecordingClient {
    calls: Mutex<Vec<ClientCall>>,
    failing: HashSet<&'static str>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose listed operations (e.g. `"track"`) always fail.
    pub fn failing(operations: &[&'static str]) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: operations.iter().copied().collect(),
        }
    }

    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().expect("recording client mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().expect("recording client mutex poisoned").len()
    }

    pub fn count_op(&self, operation: &str) -> usize {
        self.calls
            .lock()
            .expect("recording client mutex poisoned")
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Calls recorded after initialization.
    pub fn calls_after_init(&self) -> Vec<ClientCall> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, ClientCall::Init { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().expect("recording client mutex poisoned").clear();
    }

    fn record(&self, call: ClientCall) -> Result<(), ClientError> {
        let operation = call.operation();
        self.calls
            .lock()
            .expect("recording client mutex poisoned")
            .push(call);
        if self.failing.contains(operation) {
            Err(ClientError::Transport(format!("{operation} failed")))
        } else {
            Ok(())
        }
    }
}

impl AnalyticsClient for RecordingClient {
    fn init(&self, token: &str, options: &InitOptions) -> Result<(), ClientError> {
        self.record(ClientCall::Init {
            token: token.to_string(),
            options: options.clone(),
        })
    }

    fn identify(&self, unique_id: &str) -> Result<(), ClientError> {
        self.record(ClientCall::Identify {
            unique_id: unique_id.to_string(),
        })
    }

    fn set_person_properties(&self, profile: &Properties) -> Result<(), ClientError> {
        self.record(ClientCall::SetPersonProperties {
            profile: profile.clone(),
        })
    }

    fn track(&self, event_name: &str, properties: &Properties) -> Result<(), ClientError> {
        self.record(ClientCall::Track {
            event_name: event_name.to_string(),
            properties: properties.clone(),
        })
    }

    fn time_event(&self, event_name: &str) -> Result<(), ClientError> {
        self.record(ClientCall::TimeEvent {
            event_name: event_name.to_string(),
        })
    }

    fn increment(&self, increment: &Increment) -> Result<(), ClientError> {
        self.record(ClientCall::Increment {
            increment: increment.clone(),
        })
    }
}

/// Convenience: create a recording client for tests.
pub fn recording_client() -> Arc<RecordingClient> {
    Arc::new(RecordingClient::new())
}
