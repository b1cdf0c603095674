//! Session lifecycle and turn routing.
//!
//! Model calls never run under a session lock. A user turn is drafted on a
//! clone of the session, the replies are generated unlocked, and the new
//! turns are then replayed onto the live session in one step. If anything
//! fails along the way the live session is left exactly as it was.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::CourtError,
    intent::{classify_intent, decide_responders, IntentTags, Responders},
    llm::{GenerationError, GenerationParams, TextGenerator},
    prompts,
    session::DebateSession,
    store::{SessionHandle, SessionStore},
    types::{
        CaseConfig, PracticeConfig, SessionSnapshot, SessionStatus, SessionSummary, Speaker, Turn,
    },
};

const DEFAULT_COURT: &str = "Practice Court";

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    /// Advisory round bound used when the practice config sets none.
    pub max_rounds: u32,
    /// Trailing turns rendered into judge and lawyer prompts.
    pub history_window: usize,
    pub llm_timeout: Duration,
    /// Idle sessions older than this are evicted by the sweep.
    pub session_max_age: chrono::Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            max_rounds: 10,
            history_window: prompts::DEFAULT_HISTORY_WINDOW,
            llm_timeout: Duration::from_secs(60),
            session_max_age: chrono::Duration::hours(24),
        }
    }
}

/// Result of a committed turn: every turn it added plus the new state.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responders: Option<Responders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<IntentTags>,
    pub turns: Vec<Turn>,
    pub state: SessionSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartedSession {
    pub session_id: String,
    pub opening: String,
    pub state: SessionSnapshot,
}

pub struct DebateCoordinator {
    store: Arc<dyn SessionStore>,
    llm: Arc<dyn TextGenerator>,
    settings: CoordinatorSettings,
    /// Sessions with model calls outstanding. The sweep leaves these alone.
    in_flight: Mutex<HashMap<String, Pending>>,
}

#[derive(Debug, Default)]
struct Pending {
    user_turn: bool,
    bench: usize,
}

impl Pending {
    fn is_idle(&self) -> bool {
        !self.user_turn && self.bench == 0
    }
}

/// Releases a session's in-flight claim on drop.
struct InFlight<'a> {
    map: &'a Mutex<HashMap<String, Pending>>,
    session_id: String,
    user_turn: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut map = self.map.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pending) = map.get_mut(&self.session_id) {
            if self.user_turn {
                pending.user_turn = false;
            } else {
                pending.bench = pending.bench.saturating_sub(1);
            }
            if pending.is_idle() {
                map.remove(&self.session_id);
            }
        }
    }
}

impl DebateCoordinator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn TextGenerator>,
        settings: CoordinatorSettings,
    ) -> Self {
        Self {
            store,
            llm,
            settings,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    pub fn generator_name(&self) -> String {
        self.llm.name()
    }

    pub async fn session_count(&self) -> usize {
        self.store.len().await
    }

    // ── Lifecycle ────────────────────────────────────────────────────────

    /// Validate the case, have the judge open court, and store the session.
    /// Nothing is stored if the opening cannot be generated.
    pub async fn start_session(
        &self,
        mut case: CaseConfig,
        practice: PracticeConfig,
    ) -> Result<StartedSession, CourtError> {
        let now = Utc::now();
        validate_case(&case)?;
        let max_rounds = practice.max_rounds.unwrap_or(self.settings.max_rounds);
        if max_rounds == 0 {
            return Err(CourtError::Configuration("max_rounds must be at least 1".into()));
        }
        if case.court.trim().is_empty() {
            case.court = DEFAULT_COURT.to_string();
        }
        if case.case_number.trim().is_empty() {
            case.case_number = format!("PC-{}", now.timestamp());
        }

        let session_id = Uuid::new_v4().to_string();
        let prompt = prompts::opening_prompt(&case, &practice);
        let opening = self
            .generate(&session_id, &prompt, GenerationParams::OPENING)
            .await?;

        let mut session = DebateSession::new(&session_id, case, practice, max_rounds, now);
        session.submit_turn(Speaker::Judge, opening.clone(), Utc::now())?;
        let state = session.snapshot();
        self.store.insert(session).await;

        info!(
            session_id = %session_id,
            case_type = %state.case.case_type,
            user_role = %state.case.user_role,
            max_rounds,
            "court opened"
        );
        Ok(StartedSession {
            session_id,
            opening,
            state,
        })
    }

    /// Summaries of every stored session, most recently active first.
    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries = Vec::new();
        for (_, handle) in self.store.handles().await {
            if let Some(session) = handle.lock().await.as_ref() {
                summaries.push(session.summary());
            }
        }
        summaries.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        summaries
    }

    pub async fn get_state(&self, session_id: &str) -> Result<SessionSnapshot, CourtError> {
        let handle = self.handle(session_id).await?;
        let slot = handle.lock().await;
        let session = live(&slot, session_id)?;
        Ok(session.snapshot())
    }

    /// Mark the session completed without a verdict. Ending twice is a no-op.
    pub async fn end_session(&self, session_id: &str) -> Result<SessionSnapshot, CourtError> {
        let handle = self.handle(session_id).await?;
        let mut slot = handle.lock().await;
        let session = live_mut(&mut slot, session_id)?;
        if session.status == SessionStatus::Active {
            session.complete(Utc::now());
            info!(session_id, round = session.round, "session ended");
        }
        Ok(session.snapshot())
    }

    // ── Turns ────────────────────────────────────────────────────────────

    /// Submit one utterance.
    ///
    /// User text is classified and answered by the judge or by opposing
    /// counsel (followed by the judge closing the round). Text attributed to
    /// the judge or opposing counsel is recorded verbatim.
    pub async fn submit_turn(
        &self,
        session_id: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<TurnOutcome, CourtError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CourtError::InvalidInput("turn text is empty".into()));
        }
        match speaker {
            Speaker::User => self.argue(session_id, text).await,
            Speaker::Judge | Speaker::AiLawyer => {
                self.record_verbatim(session_id, speaker, text).await
            },
        }
    }

    async fn record_verbatim(
        &self,
        session_id: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<TurnOutcome, CourtError> {
        let handle = self.handle(session_id).await?;
        let mut slot = handle.lock().await;
        let session = live_mut(&mut slot, session_id)?;
        if let Err(e) = session.submit_turn(speaker, text, Utc::now()) {
            warn!(session_id, speaker = %speaker, error = %e, "turn rejected");
            return Err(e);
        }
        info!(session_id, speaker = %speaker, round = session.round, "turn recorded");
        let turns = session.history.last().cloned().into_iter().collect();
        Ok(TurnOutcome {
            responders: None,
            tags: None,
            turns,
            state: session.snapshot(),
        })
    }

    async fn argue(&self, session_id: &str, text: &str) -> Result<TurnOutcome, CourtError> {
        let tags = classify_intent(text);
        let responders = decide_responders(&tags);
        let window = self.settings.history_window;
        debug!(session_id, ?tags, ?responders, "classified utterance");

        let handle = self.handle(session_id).await?;
        let (mut draft, base_len, _claim) = {
            let slot = handle.lock().await;
            let session = live(&slot, session_id)?;
            let claim = session
                .check_turn(Speaker::User)
                .and_then(|()| self.claim_user_turn(session_id));
            let claim = match claim {
                Ok(claim) => claim,
                Err(e) => {
                    warn!(session_id, speaker = "user", error = %e, "turn rejected");
                    return Err(e);
                },
            };
            let base_len = session.history.len();
            let mut draft = session.clone();
            draft.submit_turn(Speaker::User, text, Utc::now())?;
            (draft, base_len, claim)
        };

        if responders.judge_should_respond {
            let prompt = prompts::judge_intervention_prompt(&draft, text, &tags, window);
            let ruling = self
                .generate(session_id, &prompt, GenerationParams::JUDGE)
                .await?;
            draft.submit_turn(Speaker::Judge, ruling, Utc::now())?;
        } else {
            let prompt = if tags.is_greeting {
                prompts::greeting_prompt(&draft, text)
            } else {
                prompts::lawyer_prompt(&draft, window)
            };
            let reply = self
                .generate(session_id, &prompt, GenerationParams::LAWYER)
                .await?;
            draft.submit_turn(Speaker::AiLawyer, reply, Utc::now())?;

            // Counsel has spoken, so the bench closes the round.
            let prompt = prompts::judge_prompt(&draft, window);
            let direction = self
                .generate(session_id, &prompt, GenerationParams::JUDGE)
                .await?;
            draft.submit_turn(Speaker::Judge, direction, Utc::now())?;
        }

        let new_turns = draft.history.split_off(base_len);
        let state = self.commit(&handle, session_id, &new_turns).await?;
        info!(
            session_id,
            speaker = "user",
            round = state.round,
            judge = responders.judge_should_respond,
            added = new_turns.len(),
            "user turn answered"
        );
        Ok(TurnOutcome {
            responders: Some(responders),
            tags: Some(tags),
            turns: new_turns,
            state,
        })
    }

    /// On-demand direction from the bench over the recent dialogue.
    pub async fn direct(&self, session_id: &str) -> Result<TurnOutcome, CourtError> {
        let handle = self.handle(session_id).await?;
        let (prompt, _claim) = {
            let slot = handle.lock().await;
            let session = live(&slot, session_id)?;
            session.check_turn(Speaker::Judge)?;
            let prompt = prompts::judge_prompt(session, self.settings.history_window);
            (prompt, self.claim_bench(session_id))
        };
        let direction = self
            .generate(session_id, &prompt, GenerationParams::JUDGE)
            .await?;
        let turn = Turn {
            speaker: Speaker::Judge,
            text: direction,
            timestamp: Utc::now(),
        };
        let state = self.commit(&handle, session_id, std::slice::from_ref(&turn)).await?;
        info!(session_id, speaker = "judge", round = state.round, "direction given");
        Ok(TurnOutcome {
            responders: None,
            tags: None,
            turns: vec![turn],
            state,
        })
    }

    /// Final judgment. Recorded as a judge turn; the session is then completed.
    pub async fn deliver_verdict(&self, session_id: &str) -> Result<TurnOutcome, CourtError> {
        let handle = self.handle(session_id).await?;
        let (prompt, _claim) = {
            let slot = handle.lock().await;
            let session = live(&slot, session_id)?;
            session.check_turn(Speaker::Judge)?;
            (prompts::verdict_prompt(session), self.claim_bench(session_id))
        };
        let judgment = self
            .generate(session_id, &prompt, GenerationParams::VERDICT)
            .await?;

        let mut slot = handle.lock().await;
        let session = live_mut(&mut slot, session_id)?;
        let now = Utc::now();
        session.submit_turn(Speaker::Judge, judgment, now)?;
        session.complete(now);
        info!(session_id, round = session.round, "verdict delivered");
        let turns = session.history.last().cloned().into_iter().collect();
        Ok(TurnOutcome {
            responders: None,
            tags: None,
            turns,
            state: session.snapshot(),
        })
    }

    // ── Eviction ─────────────────────────────────────────────────────────

    /// Evict sessions idle for longer than `session_max_age`. Returns how
    /// many were evicted. Sessions with model calls outstanding are skipped;
    /// claims are taken under the session lock, so checking under it too
    /// cannot miss one.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let max_age = self.settings.session_max_age;
        let mut evicted = 0;
        for (id, handle) in self.store.handles().await {
            let expired = {
                let mut slot = handle.lock().await;
                let stale = slot.as_ref().map(|s| now - s.last_updated > max_age);
                match stale {
                    Some(true) if self.is_in_flight(&id) => {
                        debug!(session_id = %id, "idle session busy; not evicting");
                        false
                    },
                    Some(true) => {
                        *slot = None;
                        true
                    },
                    Some(false) => false,
                    // Already evicted; only the map entry is left.
                    None => {
                        self.store.remove(&id).await;
                        false
                    },
                }
            };
            if expired {
                self.store.remove(&id).await;
                evicted += 1;
                info!(session_id = %id, "evicted idle session");
            }
        }
        evicted
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    async fn handle(&self, session_id: &str) -> Result<SessionHandle, CourtError> {
        self.store
            .get(session_id)
            .await
            .ok_or_else(|| CourtError::SessionNotFound(session_id.to_string()))
    }

    /// One user turn per session may await replies at a time.
    fn claim_user_turn(&self, session_id: &str) -> Result<InFlight<'_>, CourtError> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        let pending = map.entry(session_id.to_string()).or_default();
        if pending.user_turn {
            return Err(CourtError::TurnInFlight(session_id.to_string()));
        }
        pending.user_turn = true;
        Ok(InFlight {
            map: &self.in_flight,
            session_id: session_id.to_string(),
            user_turn: true,
        })
    }

    /// Directions and verdicts may overlap; they only pin the session.
    fn claim_bench(&self, session_id: &str) -> InFlight<'_> {
        let mut map = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        map.entry(session_id.to_string()).or_default().bench += 1;
        InFlight {
            map: &self.in_flight,
            session_id: session_id.to_string(),
            user_turn: false,
        }
    }

    fn is_in_flight(&self, session_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .is_some_and(|p| !p.is_idle())
    }

    /// Replay `turns` onto a copy of the live session and swap it in.
    async fn commit(
        &self,
        handle: &SessionHandle,
        session_id: &str,
        turns: &[Turn],
    ) -> Result<SessionSnapshot, CourtError> {
        let mut slot = handle.lock().await;
        let mut next = live(&slot, session_id)?.clone();
        for turn in turns {
            if let Err(e) = next.submit_turn(turn.speaker, turn.text.clone(), turn.timestamp) {
                warn!(session_id, speaker = %turn.speaker, error = %e, "session moved on; dropping replies");
                return Err(e);
            }
        }
        let state = next.snapshot();
        *slot = Some(next);
        Ok(state)
    }

    async fn generate(
        &self,
        session_id: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, CourtError> {
        let timeout = self.settings.llm_timeout;
        let result = match tokio::time::timeout(timeout, self.llm.generate(prompt, params)).await {
            Ok(r) => r,
            Err(_) => Err(GenerationError::Transient(format!(
                "no reply within {}s",
                timeout.as_secs_f32()
            ))),
        };
        let text = match result {
            Ok(text) if text.trim().is_empty() => Err(GenerationError::Empty),
            Ok(text) => Ok(text.trim().to_string()),
            Err(e) => Err(e),
        };
        match text {
            Ok(text) => {
                debug!(session_id, backend = %self.llm.name(), chars = text.len(), "generation ok");
                Ok(text)
            },
            Err(e) => {
                warn!(
                    session_id,
                    backend = %self.llm.name(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "generation failed"
                );
                Err(e.into())
            },
        }
    }
}

fn validate_case(case: &CaseConfig) -> Result<(), CourtError> {
    if case.case_type.trim().is_empty() {
        return Err(CourtError::Configuration("case_type is required".into()));
    }
    if case.user_role.trim().is_empty() {
        return Err(CourtError::Configuration("user_role is required".into()));
    }
    Ok(())
}

fn live<'a>(
    slot: &'a Option<DebateSession>,
    session_id: &str,
) -> Result<&'a DebateSession, CourtError> {
    slot.as_ref()
        .ok_or_else(|| CourtError::SessionNotFound(session_id.to_string()))
}

fn live_mut<'a>(
    slot: &'a mut Option<DebateSession>,
    session_id: &str,
) -> Result<&'a mut DebateSession, CourtError> {
    slot.as_mut()
        .ok_or_else(|| CourtError::SessionNotFound(session_id.to_string()))
}
