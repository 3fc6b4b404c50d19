//! mixtrack-replay — dry-run the tracking middleware over recorded actions.
//!
//! Reads actions as JSON lines, dispatches them through the middleware against
//! a logging analytics client, and prints the calls each action produced.

mod replay;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mixtrack_core::client::LoggingClient;
use mixtrack_core::{DescriptorShape, TrackerSettings};
use mixtrack_middleware::{IdentityResolver, TrackingMiddlewareBuilder};
use serde_json::Value;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ShapeArg {
    Nested,
    Flag,
}

impl From<ShapeArg> for DescriptorShape {
    fn from(shape: ShapeArg) -> Self {
        match shape {
            ShapeArg::Nested => DescriptorShape::Nested,
            ShapeArg::Flag => DescriptorShape::Flag,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mixtrack-replay")]
#[command(about = "Replay recorded actions through the tracking middleware")]
#[command(version)]
struct Cli {
    /// JSON-lines file of actions ("-" for stdin)
    #[arg(long, short, default_value = "-")]
    input: String,

    /// JSON application state used for identity resolution
    #[arg(long)]
    state: Option<PathBuf>,

    /// TOML settings file (environment `MIXTRACK__*` overrides it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analytics token (overrides config)
    #[arg(long, env = "MIXTRACK__TOKEN")]
    token: Option<String>,

    /// Event name prefix (overrides config)
    #[arg(long)]
    prefix: Option<String>,

    /// Descriptor shape (overrides config)
    #[arg(long, value_enum)]
    shape: Option<ShapeArg>,

    /// Pointer to the unique user id inside the state
    #[arg(long, default_value = "/user/id")]
    id_pointer: String,

    /// Pointer to the user profile inside the state
    #[arg(long, default_value = "/user")]
    person_pointer: String,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "mixtrack_replay=info,mixtrack_core=info,mixtrack_middleware=info".into()
    });
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut settings = TrackerSettings::load_from(cli.config.as_deref())
        .context("failed to load tracker settings")?;

    // Apply CLI overrides
    if let Some(token) = cli.token {
        settings.token = token;
    }
    if let Some(prefix) = cli.prefix {
        settings.event_prefix = prefix;
    }
    if let Some(shape) = cli.shape {
        settings.shape = shape.into();
    }
    settings.validate().context("invalid settings")?;

    info!(
        shape = ?settings.shape,
        metadata_key = %settings.metadata_key,
        event_prefix = %settings.event_prefix,
        "Settings loaded"
    );

    let mut builder = TrackingMiddlewareBuilder::<Value>::from_settings(&settings);
    let state = match &cli.state {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open state file {}", path.display()))?;
            builder = builder.identity(IdentityResolver::from_pointers(
                &cli.id_pointer,
                &cli.person_pointer,
            ));
            serde_json::from_reader(BufReader::new(file)).context("failed to parse state file")?
        }
        None => Value::Null,
    };
    let middleware = builder.build(LoggingClient::new())?;

    let stdout = io::stdout().lock();
    let summary = if cli.input == "-" {
        replay::replay(&middleware, &state, io::stdin().lock(), stdout)?
    } else {
        let file = File::open(&cli.input)
            .with_context(|| format!("failed to open input {}", cli.input))?;
        replay::replay(&middleware, &state, BufReader::new(file), stdout)?
    };

    info!(
        actions = summary.actions,
        calls = summary.calls,
        skipped = summary.skipped,
        "Replay complete"
    );
    Ok(())
}
