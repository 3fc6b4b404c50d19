pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{AnalyticsClient, ClientCall, InitOptions};
pub use config::{DescriptorShape, TrackerSettings};
pub use error::{ClientError, TrackerError, TrackerResult};
pub use types::{Action, Increment, Properties};
