//! Handshake scenarios.
//!
//! A scenario is a JSON list of steps replayed against one web component:
//! raise a request (with the host's scripted reply), wait, navigate, answer
//! deferred replies, tear down. The replay produces a [`Report`] with every
//! settled outcome and who produced it.

mod replay;

use std::path::Path;

use serde::{Deserialize, Serialize};

use webgate_core::{Error, EventName, Outcome, Result};
use webgate_runtime::{SettleSource, TokenId};

pub use replay::replay;

/// A scripted sequence of engine and host actions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_component_id")]
    pub component: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

fn default_component_id() -> String {
    "webgate-scenario".to_string()
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Self = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Scenario(format!("Failed to read scenario {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    fn validate(&self) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            if let Step::Raise(request) = step
                && request.event.category().is_none()
            {
                return Err(Error::Scenario(format!(
                    "Step {index}: {} is a lifecycle event, not a request",
                    request.event
                )));
            }
        }
        Ok(())
    }
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Attach the component (fires `onAttach`).
    Attach,
    /// Engine raises a request.
    Raise(Request),
    /// Run every reply that was marked `defer`.
    AnswerDeferred,
    /// Let time pass, then settle anything overdue.
    Wait { ms: u64 },
    /// Page navigates away.
    Navigate { url: String },
    /// Component is destroyed.
    Teardown,
}

/// A request raised by the engine and the host's scripted answer.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub event: EventName,
    /// Category context; missing fields take their defaults.
    #[serde(default)]
    pub context: serde_json::Value,
    /// Decision the host answers with, in the category's decision format.
    /// Absent means the host keeps the handler and never answers.
    #[serde(default)]
    pub reply: Option<serde_json::Value>,
    /// Answer on a later `answer_deferred` step instead of inside the callback.
    #[serde(default)]
    pub defer: bool,
    /// Return value of boolean callbacks.
    #[serde(default = "yes")]
    pub handled: bool,
    /// Whether a callback is registered for the event at all.
    #[serde(default = "yes")]
    pub register: bool,
}

const fn yes() -> bool {
    true
}

/// Result of replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub component: String,
    pub entries: Vec<ReportEntry>,
}

/// The settled outcome of one raised request.
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub step: usize,
    pub event: EventName,
    pub token_id: TokenId,
    pub outcome: Outcome,
    pub settled: SettleSource,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_steps_with_defaults() {
        let scenario = Scenario::from_json(
            r#"{
                "steps": [
                    { "step": "attach" },
                    { "step": "raise", "event": "onSslErrorEventReceive" },
                    { "step": "wait", "ms": 5 },
                    { "step": "teardown" }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(scenario.component, "webgate-scenario");
        assert_eq!(scenario.steps.len(), 4);
        let Step::Raise(request) = &scenario.steps[1] else {
            panic!("expected a raise step");
        };
        assert_eq!(request.event, EventName::SslErrorEventReceive);
        assert!(request.reply.is_none());
        assert!(request.handled);
        assert!(request.register);
        assert!(!request.defer);
    }

    #[test]
    fn lifecycle_event_cannot_be_raised() {
        let err =
            Scenario::from_json(r#"{ "steps": [ { "step": "raise", "event": "onDetach" } ] }"#)
                .unwrap_err();
        assert!(matches!(err, Error::Scenario(_)));
    }

    #[test]
    fn unknown_event_is_rejected() {
        let result =
            Scenario::from_json(r#"{ "steps": [ { "step": "raise", "event": "onNothing" } ] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenario.json");
        std::fs::write(&path, r#"{ "component": "web-7", "steps": [] }"#).unwrap();

        let scenario = Scenario::load(&path).unwrap();
        assert_eq!(scenario.component, "web-7");
        assert!(scenario.steps.is_empty());

        assert!(Scenario::load(&dir.path().join("missing.json")).is_err());
    }
}
