//! Replays a JSON-lines stream of actions through the tracking middleware and
//! writes the client calls each one produced.

use std::io::{BufRead, Write};

use mixtrack_core::{Action, AnalyticsClient};
use mixtrack_middleware::TrackingMiddleware;
use serde_json::{json, Value};
use tracing::warn;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub actions: usize,
    pub calls: usize,
    pub skipped: usize,
}

/// Dispatch every line of `input` as an action against `state`. For each
/// action one JSON line `{"type": ..., "calls": [...]}` is written to `output`.
/// Blank lines are ignored; lines that are not actions are logged and skipped.
pub fn replay<C, R, W>(
    middleware: &TrackingMiddleware<Value, C>,
    state: &Value,
    input: R,
    mut output: W,
) -> anyhow::Result<ReplaySummary>
where
    C: AnalyticsClient,
    R: BufRead,
    W: Write,
{
    let mut summary = ReplaySummary::default();

    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let action: Action = match serde_json::from_str(&line) {
            Ok(action) => action,
            Err(e) => {
                warn!(line = index + 1, error = %e, "skipping malformed action");
                summary.skipped += 1;
                continue;
            }
        };

        let (action_type, calls) =
            middleware.dispatch_with_calls(state, action, |forwarded| forwarded.action_type);

        summary.actions += 1;
        summary.calls += calls.len();
        writeln!(
            output,
            "{}",
            json!({"type": action_type, "calls": calls})
        )?;
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixtrack_core::client::RecordingClient;
    use mixtrack_middleware::IdentityResolver;

    #[test]
    fn test_replay_writes_calls_per_action() {
        let middleware = TrackingMiddleware::builder("TOKEN")
            .identity(IdentityResolver::from_pointers("/user/id", "/user"))
            .build(RecordingClient::new())
            .unwrap();
        let state = json!({"user": {"id": "u-1", "name": "Foo"}});

        let input = concat!(
            r#"{"type": "Plain"}"#,
            "\n",
            "not json\n",
            "\n",
            r#"{"type": "Login", "metadata": {"analytics": {"eventName": "login", "increment": "logins"}}}"#,
            "\n",
        );
        let mut output = Vec::new();
        let summary = replay(&middleware, &state, input.as_bytes(), &mut output).unwrap();

        assert_eq!(
            summary,
            ReplaySummary {
                actions: 2,
                calls: 4,
                skipped: 1
            }
        );

        let lines: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], json!({"type": "Plain", "calls": []}));
        assert_eq!(lines[1]["type"], "Login");
        assert_eq!(lines[1]["calls"][0]["op"], "identify");
        assert_eq!(lines[1]["calls"][2]["event_name"], "login");
        assert_eq!(lines[1]["calls"][3]["increment"]["name"], "logins");

        // init + identify + set_person_properties + track + increment
        assert_eq!(middleware.client().count(), 5);

        // the printed calls are the ones the client received
        let issued = serde_json::to_value(middleware.client().calls_after_init()).unwrap();
        assert_eq!(lines[1]["calls"], issued);
    }
}
