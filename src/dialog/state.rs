//! Registration dialog state machine.

use serde::{Deserialize, Serialize};

/// The states of one registration pass.
///
/// Progresses linearly: Idle → CollectingName → CollectingUniversity →
/// CollectingFaculty → CollectingInfoSource → AwaitingConfirmation →
/// Registered. `Registered` is not strictly terminal: an explicit edit
/// re-enters `CollectingName`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    Idle,
    CollectingName,
    CollectingUniversity,
    CollectingFaculty,
    CollectingInfoSource,
    AwaitingConfirmation,
    Registered,
}

impl DialogState {
    /// The next state in the linear collection sequence, if any.
    pub fn next(&self) -> Option<DialogState> {
        use DialogState::*;
        match self {
            Idle => Some(CollectingName),
            CollectingName => Some(CollectingUniversity),
            CollectingUniversity => Some(CollectingFaculty),
            CollectingFaculty => Some(CollectingInfoSource),
            CollectingInfoSource => Some(AwaitingConfirmation),
            AwaitingConfirmation => Some(Registered),
            Registered => None,
        }
    }

    /// Whether this state consumes free-text input.
    pub fn expects_text(&self) -> bool {
        matches!(self, Self::CollectingName | Self::CollectingUniversity)
    }

    /// Whether the registration pass is complete.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

impl Default for DialogState {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for DialogState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::CollectingName => "collecting_name",
            Self::CollectingUniversity => "collecting_university",
            Self::CollectingFaculty => "collecting_faculty",
            Self::CollectingInfoSource => "collecting_info_source",
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::Registered => "registered",
        };
        write!(f, "{s}")
    }
}

/// Transient per-participant cursor for one registration pass.
///
/// Held in memory only; recreated on restart or edit. Collected values go
/// straight into the guest record, so the session carries just the state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogSession {
    pub user_id: i64,
    pub state: DialogState,
}

impl DialogSession {
    pub fn new(user_id: i64, state: DialogState) -> Self {
        Self { user_id, state }
    }

    /// Advance to the next state in sequence. Returns the new state, or
    /// `None` when already at `Registered`.
    pub fn advance(&mut self) -> Option<DialogState> {
        let next = self.state.next()?;
        self.state = next;
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_the_full_sequence() {
        use DialogState::*;
        let expected = [
            CollectingName,
            CollectingUniversity,
            CollectingFaculty,
            CollectingInfoSource,
            AwaitingConfirmation,
            Registered,
        ];
        let mut current = Idle;
        for expected_next in expected {
            let next = current.next().unwrap();
            assert_eq!(next, expected_next);
            current = next;
        }
        assert!(current.next().is_none());
    }

    #[test]
    fn text_states() {
        assert!(DialogState::CollectingName.expects_text());
        assert!(DialogState::CollectingUniversity.expects_text());
        assert!(!DialogState::CollectingFaculty.expects_text());
        assert!(!DialogState::AwaitingConfirmation.expects_text());
        assert!(!DialogState::Idle.expects_text());
    }

    #[test]
    fn registered_is_terminal() {
        assert!(DialogState::Registered.is_terminal());
        assert!(!DialogState::AwaitingConfirmation.is_terminal());
    }

    #[test]
    fn session_advance_stops_at_registered() {
        let mut session = DialogSession::new(1, DialogState::AwaitingConfirmation);
        assert_eq!(session.advance(), Some(DialogState::Registered));
        assert_eq!(session.advance(), None);
        assert_eq!(session.state, DialogState::Registered);
    }

    #[test]
    fn display_matches_serde() {
        use DialogState::*;
        for state in [
            Idle,
            CollectingName,
            CollectingUniversity,
            CollectingFaculty,
            CollectingInfoSource,
            AwaitingConfirmation,
            Registered,
        ] {
            let display = format!("{state}");
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }
}
