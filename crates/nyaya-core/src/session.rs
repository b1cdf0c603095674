use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::CourtError,
    types::{
        CaseConfig, PracticeConfig, SessionSnapshot, SessionStatus, SessionSummary, Speaker, Turn,
    },
};

/// Number of trailing history entries inspected by the judge transition.
const RECENT_USER_WINDOW: usize = 2;

/// Turn-order state of one practice debate.
///
/// `waiting_for` names the role whose submission advances the session under
/// normal flow; the judge may speak regardless (see [`Speaker::may_interject`]).
/// `round` starts at 1 and grows by exactly one on every opposing-counsel turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub session_id: String,
    pub case: CaseConfig,
    pub practice: PracticeConfig,
    pub history: Vec<Turn>,
    pub current_speaker: Speaker,
    pub waiting_for: Speaker,
    pub round: u32,
    pub max_rounds: u32,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl DebateSession {
    /// Fresh session with no history, waiting for the user in round 1.
    /// The judge's opening is expected to be the first submitted turn.
    pub fn new(
        session_id: impl Into<String>,
        case: CaseConfig,
        practice: PracticeConfig,
        max_rounds: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            case,
            practice,
            history: Vec::new(),
            current_speaker: Speaker::Judge,
            waiting_for: Speaker::User,
            round: 1,
            max_rounds,
            status: SessionStatus::Active,
            created_at: now,
            last_updated: now,
        }
    }

    /// Check whether `speaker` may speak now without touching any state.
    pub fn check_turn(&self, speaker: Speaker) -> Result<(), CourtError> {
        if self.status == SessionStatus::Completed {
            return Err(CourtError::SessionEnded(self.session_id.clone()));
        }
        if speaker != self.waiting_for && !speaker.may_interject() {
            return Err(CourtError::InvalidTurn {
                speaker,
                expected: self.waiting_for,
            });
        }
        Ok(())
    }

    /// Record a turn and advance the speaker pointer.
    ///
    /// All validation happens before the first mutation, so a rejected
    /// submission leaves the session untouched.
    pub fn submit_turn(
        &mut self,
        speaker: Speaker,
        text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), CourtError> {
        self.check_turn(speaker)?;

        self.history.push(Turn {
            speaker,
            text: text.into(),
            timestamp: at,
        });
        self.current_speaker = speaker;
        self.last_updated = at;
        self.waiting_for = self.next_speaker_after(speaker);
        if speaker == Speaker::AiLawyer {
            self.round += 1;
        }
        Ok(())
    }

    fn next_speaker_after(&self, speaker: Speaker) -> Speaker {
        match speaker {
            // If the user just spoke, let counsel answer rather than handing
            // the floor straight back to the user.
            Speaker::Judge => {
                if self.waiting_for == Speaker::User && self.user_spoke_recently() {
                    Speaker::AiLawyer
                } else {
                    Speaker::User
                }
            },
            Speaker::User => Speaker::AiLawyer,
            Speaker::AiLawyer => Speaker::Judge,
        }
    }

    fn user_spoke_recently(&self) -> bool {
        self.history
            .iter()
            .rev()
            .take(RECENT_USER_WINDOW)
            .any(|t| t.speaker == Speaker::User)
    }

    /// Advisory only: turns are still accepted past this point.
    pub fn ready_for_final_judgment(&self) -> bool {
        self.round >= self.max_rounds
    }

    /// Last `n` turns, oldest first.
    pub fn recent_history(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn complete(&mut self, at: DateTime<Utc>) {
        self.status = SessionStatus::Completed;
        self.last_updated = at;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            case: self.case.clone(),
            practice: self.practice.clone(),
            history: self.history.clone(),
            current_speaker: self.current_speaker,
            waiting_for: self.waiting_for,
            round: self.round,
            max_rounds: self.max_rounds,
            status: self.status,
            ready_for_final_judgment: self.ready_for_final_judgment(),
            created_at: self.created_at,
            last_updated: self.last_updated,
        }
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session_id: self.session_id.clone(),
            case_title: self.case.title(),
            case_type: self.case.case_type.clone(),
            user_role: self.case.user_role.clone(),
            status: self.status,
            round: self.round,
            max_rounds: self.max_rounds,
            ready_for_final_judgment: self.ready_for_final_judgment(),
            last_updated: self.last_updated,
        }
    }
}
