//! Event tracking middleware — inspects actions flowing through a dispatch
//! pipeline, forwards analytics intent to an [`AnalyticsClient`], and always
//! passes the action on unchanged.
//!
//! # Modules
//!
//! - [`descriptor`] — Reads analytics intent from action metadata (nested or flag shape)
//! - [`formatter`] — Event-name, property-key and property-value formatting hooks
//! - [`identity`] — Resolves the current user's id and profile from application state
//! - [`middleware`] — The pipeline contract and the tracking middleware itself
//!
//! [`AnalyticsClient`]: mixtrack_core::AnalyticsClient

pub mod descriptor;
pub mod formatter;
pub mod identity;
pub mod middleware;

pub use descriptor::{AnalyticsDescriptor, DescriptorReader};
pub use formatter::Formatters;
pub use identity::{IdentityResolver, ResolvedIdentity};
pub use middleware::{Middleware, TrackingMiddleware, TrackingMiddlewareBuilder};
