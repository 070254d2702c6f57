//! Snapshots published to the presentation surface.

use handwave_orchestrator_core::AvatarView;
use serde::Serialize;

/// Whether the surface should show the avatar or a "not ready" indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionStatus {
    /// Detector still loading.
    Starting,
    Ready,
    /// Detector failed to load. Persistent: no detection is ever attempted.
    Failed { reason: String },
    Stopped,
}

/// One published snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationFrame {
    pub status: SessionStatus,
    pub view: AvatarView,
    /// Session time of publication.
    pub at_ns: u64,
}

impl PresentationFrame {
    pub fn is_ready(&self) -> bool {
        self.status == SessionStatus::Ready
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            SessionStatus::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use handwave_orchestrator_core::ResponseOrchestrator;

    #[test]
    fn test_failure_reason() {
        let frame = PresentationFrame {
            status: SessionStatus::Failed {
                reason: "no model".to_string(),
            },
            view: ResponseOrchestrator::with_defaults().view(),
            at_ns: 0,
        };
        assert!(!frame.is_ready());
        assert_eq!(frame.failure_reason(), Some("no model"));
    }

    #[test]
    fn test_status_serializes_with_tag() {
        let json = serde_json::to_string(&SessionStatus::Failed {
            reason: "no model".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"state":"failed","reason":"no model"}"#);
    }
}
