//! Tracking middleware — plans the analytics calls for each dispatched action,
//! issues them best-effort, then forwards the action to the next stage.

use std::marker::PhantomData;

use mixtrack_core::{
    Action, AnalyticsClient, ClientCall, DescriptorShape, InitOptions, TrackerError,
    TrackerResult, TrackerSettings,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::descriptor::{AnalyticsDescriptor, DescriptorReader};
use crate::formatter::Formatters;
use crate::identity::IdentityResolver;

/// A stage in a unidirectional dispatch pipeline. Receives a read-only view of
/// the current state and the continuation to the next stage, and returns
/// whatever the continuation returns.
pub trait Middleware<S> {
    fn dispatch<R, N>(&self, state: &S, action: Action, next: N) -> R
    where
        N: FnOnce(Action) -> R;

    /// Bind this stage to a state view and a downstream stage, producing the
    /// dispatch function for the composed pipeline.
    fn bind<'a, R, N>(&'a self, state: &'a S, mut next: N) -> impl FnMut(Action) -> R + 'a
    where
        N: FnMut(Action) -> R + 'a,
        Self: Sized,
    {
        move |action| self.dispatch(state, action, &mut next)
    }
}

/// Forwards analytics intent found in action metadata to an analytics client.
pub struct TrackingMiddleware<S, C> {
    client: C,
    reader: DescriptorReader,
    formatters: Formatters,
    event_prefix: String,
    identity: Option<IdentityResolver<S>>,
}

impl<S> TrackingMiddleware<S, ()> {
    pub fn builder(token: impl Into<String>) -> TrackingMiddlewareBuilder<S> {
        TrackingMiddlewareBuilder::new(token)
    }
}

impl<S, C: AnalyticsClient> TrackingMiddleware<S, C> {
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Compute the client calls a dispatch of `action` would issue against the
    /// given state, in issue order. Pure; the client is not touched.
    pub fn plan(&self, state: &S, action: &Action) -> Vec<ClientCall> {
        match self.reader.read(action) {
            Some(descriptor) => self.plan_descriptor(state, &descriptor),
            None => Vec::new(),
        }
    }

    fn plan_descriptor(&self, state: &S, descriptor: &AnalyticsDescriptor) -> Vec<ClientCall> {
        let mut calls = Vec::new();

        if let Some(event_name) = &descriptor.event_name {
            if let Some(identity) = self.identity.as_ref().and_then(|r| r.resolve(state)) {
                calls.push(ClientCall::Identify {
                    unique_id: identity.unique_id,
                });
                calls.push(ClientCall::SetPersonProperties {
                    profile: identity.profile,
                });
            }

            let mut properties = self.formatters.properties(&descriptor.properties);
            if let Some(label) = &descriptor.action_label {
                properties.insert(
                    "action".to_string(),
                    Value::String(self.formatters.action_type(label)),
                );
            }

            calls.push(ClientCall::Track {
                event_name: self.formatters.event_name(&self.event_prefix, event_name),
                properties,
            });
        }

        if let Some(time_event) = &descriptor.time_event {
            calls.push(ClientCall::TimeEvent {
                event_name: self.formatters.action_type(time_event),
            });
        }

        if let Some(increment) = &descriptor.increment {
            calls.push(ClientCall::Increment {
                increment: self.formatters.increment(increment),
            });
        }

        calls
    }

    /// Dispatch `action` and also return the client calls that were issued
    /// for it, whether or not each one succeeded.
    pub fn dispatch_with_calls<R, N>(
        &self,
        state: &S,
        action: Action,
        next: N,
    ) -> (R, Vec<ClientCall>)
    where
        N: FnOnce(Action) -> R,
    {
        metrics::counter!("tracker.actions").increment(1);
        let calls = self.plan(state, &action);
        if !calls.is_empty() {
            self.emit(&action.action_type, &calls);
        }
        (next(action), calls)
    }

    /// Issue each call independently. A failed call is logged and counted;
    /// it never prevents the remaining calls.
    fn emit(&self, action_type: &str, calls: &[ClientCall]) {
        for call in calls {
            let operation = call.operation();
            metrics::counter!("tracker.calls", "op" => operation).increment(1);
            match call.apply(&self.client) {
                Ok(()) => debug!(action_type, operation, "analytics call issued"),
                Err(e) => {
                    metrics::counter!("tracker.client_errors", "op" => operation).increment(1);
                    warn!(action_type, operation, error = %e, "analytics call failed");
                }
            }
        }
    }
}

impl<S, C: AnalyticsClient> Middleware<S> for TrackingMiddleware<S, C> {
    fn dispatch<R, N>(&self, state: &S, action: Action, next: N) -> R
    where
        N: FnOnce(Action) -> R,
    {
        self.dispatch_with_calls(state, action, next).0
    }
}

/// Builder for [`TrackingMiddleware`]. Every option is optional; only the
/// token is required.
pub struct TrackingMiddlewareBuilder<S> {
    token: String,
    init_options: InitOptions,
    formatters: Formatters,
    event_prefix: String,
    shape: DescriptorShape,
    metadata_key: String,
    identity: Option<IdentityResolver<S>>,
    _state: PhantomData<fn(&S)>,
}

impl<S> TrackingMiddlewareBuilder<S> {
    pub fn new(token: impl Into<String>) -> Self {
        let defaults = TrackerSettings::default();
        Self {
            token: token.into(),
            init_options: defaults.init,
            formatters: Formatters::default(),
            event_prefix: defaults.event_prefix,
            shape: defaults.shape,
            metadata_key: defaults.metadata_key,
            identity: None,
            _state: PhantomData,
        }
    }

    /// Start from loaded settings: token, prefix, shape, metadata key and
    /// init options.
    pub fn from_settings(settings: &TrackerSettings) -> Self {
        Self::new(settings.token.clone())
            .event_prefix(settings.event_prefix.clone())
            .shape(settings.shape)
            .metadata_key(settings.metadata_key.clone())
            .init_options(settings.init.clone())
    }

    pub fn identity(mut self, resolver: IdentityResolver<S>) -> Self {
        self.identity = Some(resolver);
        self
    }

    pub fn action_type_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.formatters = self.formatters.with_action_type(formatter);
        self
    }

    pub fn property_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.formatters = self.formatters.with_property(formatter);
        self
    }

    pub fn value_formatter<F>(mut self, formatter: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.formatters = self.formatters.with_value(formatter);
        self
    }

    pub fn event_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.event_prefix = prefix.into();
        self
    }

    pub fn shape(mut self, shape: DescriptorShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn metadata_key(mut self, key: impl Into<String>) -> Self {
        self.metadata_key = key.into();
        self
    }

    pub fn init_options(mut self, options: InitOptions) -> Self {
        self.init_options = options;
        self
    }

    /// Initialize the client once with the token and init options, and
    /// return the middleware bound to it. An empty token is rejected before
    /// the client is touched.
    pub fn build<C: AnalyticsClient>(self, client: C) -> TrackerResult<TrackingMiddleware<S, C>> {
        if self.token.is_empty() {
            return Err(TrackerError::Config("token must not be empty".into()));
        }
        client.init(&self.token, &self.init_options)?;
        info!(
            shape = ?self.shape,
            metadata_key = %self.metadata_key,
            identity = self.identity.is_some(),
            "tracking middleware initialized"
        );

        Ok(TrackingMiddleware {
            client,
            reader: DescriptorReader::new(self.shape, self.metadata_key),
            formatters: self.formatters,
            event_prefix: self.event_prefix,
            identity: self.identity,
        })
    }
}
