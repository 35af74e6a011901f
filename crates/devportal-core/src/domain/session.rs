//! Test-session state machine and reporting types.
//!
//! ```text
//! Idle ─► Discovering ─► ServingAssets ─► PortalLoading ─► Injecting ─► InvokingMethods ─► Done
//!              │               │
//!              └──► Failed ◄───┘
//! ```
//!
//! Only discovery (no device) and asset serving (no build output) can fail a
//! session.  Every later step records a soft failure in its [`StepReport`]
//! and the session still reaches `Done`.

use std::fmt;

use uuid::Uuid;

use super::device::DiscoveredDevice;
use super::payload::PluginManifest;
use super::remote_call::RemoteCallResult;

/// Where a test session currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Discovering,
    ServingAssets,
    PortalLoading,
    Injecting,
    InvokingMethods,
    Done,
    Failed,
}

impl SessionState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Discovering)
                | (Discovering, ServingAssets)
                | (Discovering, Failed)
                | (ServingAssets, PortalLoading)
                | (ServingAssets, Failed)
                | (PortalLoading, Injecting)
                | (Injecting, InvokingMethods)
                | (InvokingMethods, Done)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::Discovering => "Discovering",
            SessionState::ServingAssets => "ServingAssets",
            SessionState::PortalLoading => "PortalLoading",
            SessionState::Injecting => "Injecting",
            SessionState::InvokingMethods => "InvokingMethods",
            SessionState::Done => "Done",
            SessionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// Ordered record of the states a session has passed through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionTrail {
    states: Vec<SessionState>,
}

impl Default for SessionTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionTrail {
    /// A fresh trail positioned at [`SessionState::Idle`].
    pub fn new() -> Self {
        Self {
            states: vec![SessionState::Idle],
        }
    }

    pub fn current(&self) -> SessionState {
        // The trail is never empty: it starts at Idle and only grows.
        self.states.last().copied().unwrap_or(SessionState::Idle)
    }

    /// Moves to `next` if the transition is legal.  Returns `false` and leaves
    /// the trail unchanged otherwise.
    pub fn advance(&mut self, next: SessionState) -> bool {
        if self.current().can_transition_to(next) {
            self.states.push(next);
            true
        } else {
            false
        }
    }

    pub fn states(&self) -> &[SessionState] {
        &self.states
    }

    /// `Idle→Discovering→...` rendering used in logs.
    pub fn render(&self) -> String {
        self.states
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("→")
    }
}

/// Pass/soft-fail verdict for one session step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Passed,
    /// The step failed but the session carried on.
    Soft(String),
}

impl StepOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, StepOutcome::Passed)
    }
}

/// What happened during one state of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub step: SessionState,
    pub outcome: StepOutcome,
    pub detail: String,
}

impl StepReport {
    pub fn passed(step: SessionState, detail: impl Into<String>) -> Self {
        Self {
            step,
            outcome: StepOutcome::Passed,
            detail: detail.into(),
        }
    }

    pub fn soft(step: SessionState, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self {
            step,
            outcome: StepOutcome::Soft(reason.clone()),
            detail: reason,
        }
    }
}

/// A smoke-test call and what came back.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub result: RemoteCallResult,
}

/// Summary of a session that reached `Done`.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub device: DiscoveredDevice,
    pub plugin: PluginManifest,
    pub trail: SessionTrail,
    pub steps: Vec<StepReport>,
    pub calls: Vec<MethodCall>,
    /// Items in the normalised home listing, when `getHome` succeeded.
    pub home_item_count: Option<usize>,
}

impl SessionReport {
    pub fn calls_passed(&self) -> usize {
        self.calls.iter().filter(|c| c.result.success).count()
    }

    pub fn calls_failed(&self) -> usize {
        self.calls.len() - self.calls_passed()
    }

    /// Steps that ended in a soft failure.
    pub fn soft_failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| !s.outcome.is_passed())
    }

    pub fn call(&self, method: &str) -> Option<&RemoteCallResult> {
        self.calls
            .iter()
            .find(|c| c.method == method)
            .map(|c| &c.result)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const HAPPY_PATH: [SessionState; 7] = [
        SessionState::Idle,
        SessionState::Discovering,
        SessionState::ServingAssets,
        SessionState::PortalLoading,
        SessionState::Injecting,
        SessionState::InvokingMethods,
        SessionState::Done,
    ];

    #[test]
    fn test_happy_path_transitions_are_legal() {
        for pair in HAPPY_PATH.windows(2) {
            assert!(
                pair[0].can_transition_to(pair[1]),
                "{} -> {} must be legal",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_failed_reachable_only_from_discovering_and_serving_assets() {
        for state in HAPPY_PATH {
            let expected = matches!(
                state,
                SessionState::Discovering | SessionState::ServingAssets
            );
            assert_eq!(
                state.can_transition_to(SessionState::Failed),
                expected,
                "{state} -> Failed"
            );
        }
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        for next in HAPPY_PATH {
            assert!(!SessionState::Done.can_transition_to(next));
            assert!(!SessionState::Failed.can_transition_to(next));
        }
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Injecting.is_terminal());
    }

    #[test]
    fn test_trail_starts_idle_and_records_happy_path() {
        // Arrange
        let mut trail = SessionTrail::new();

        // Act
        for state in &HAPPY_PATH[1..] {
            assert!(trail.advance(*state));
        }

        // Assert
        assert_eq!(trail.states(), &HAPPY_PATH);
        assert_eq!(
            trail.render(),
            "Idle→Discovering→ServingAssets→PortalLoading→Injecting→InvokingMethods→Done"
        );
    }

    #[test]
    fn test_trail_rejects_skipped_state() {
        let mut trail = SessionTrail::new();

        assert!(!trail.advance(SessionState::Injecting));
        assert_eq!(trail.current(), SessionState::Idle);
        assert_eq!(trail.states().len(), 1);
    }

    #[test]
    fn test_step_report_constructors() {
        let ok = StepReport::passed(SessionState::Injecting, "HTTP 200");
        let soft = StepReport::soft(SessionState::Injecting, "connection reset");

        assert!(ok.outcome.is_passed());
        assert_eq!(soft.outcome, StepOutcome::Soft("connection reset".to_string()));
        assert_eq!(soft.detail, "connection reset");
    }

    #[test]
    fn test_report_counts_calls() {
        // Arrange
        let report = SessionReport {
            session_id: Uuid::new_v4(),
            device: DiscoveredDevice::manual("10.0.0.5", 11337).unwrap(),
            plugin: PluginManifest::default(),
            trail: SessionTrail::new(),
            steps: vec![
                StepReport::passed(SessionState::PortalLoading, "ready"),
                StepReport::soft(SessionState::Injecting, "timeout"),
            ],
            calls: vec![
                MethodCall {
                    method: "enable".to_string(),
                    result: RemoteCallResult::ok(json!(null)),
                },
                MethodCall {
                    method: "getHome".to_string(),
                    result: RemoteCallResult::failed("HTTP 500"),
                },
            ],
            home_item_count: None,
        };

        // Act / Assert
        assert_eq!(report.calls_passed(), 1);
        assert_eq!(report.calls_failed(), 1);
        assert_eq!(report.soft_failures().count(), 1);
        assert!(report.call("enable").unwrap().success);
        assert!(report.call("missing").is_none());
    }
}
