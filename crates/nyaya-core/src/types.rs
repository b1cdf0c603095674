use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const NOT_SPECIFIED: &str = "Not specified";

// ── Speakers ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The human lawyer practising the case.
    User,
    /// Opposing counsel played by the model.
    AiLawyer,
    /// The presiding judge played by the model.
    Judge,
}

impl Speaker {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::AiLawyer => "ai_lawyer",
            Self::Judge => "judge",
        }
    }

    /// Courtroom interruption rule: the judge may speak whoever the session
    /// is waiting for. Every other speaker must wait for their turn.
    pub fn may_interject(self) -> bool {
        matches!(self, Self::Judge)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Self::User),
            "ai_lawyer" | "lawyer" => Ok(Self::AiLawyer),
            "judge" => Ok(Self::Judge),
            other => Err(format!("unknown speaker: {other}")),
        }
    }
}

/// One recorded utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

// ── Case configuration ───────────────────────────────────────────────────

/// Facts of the practice case. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseConfig {
    /// e.g. "criminal", "civil", "employment". Required.
    #[serde(default)]
    pub case_type: String,
    /// The user's side: plaintiff, defendant, prosecution, defense, ... Required.
    #[serde(default)]
    pub user_role: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub case_title: String,
    #[serde(default)]
    pub plaintiff: String,
    #[serde(default)]
    pub defendant: String,
    #[serde(default)]
    pub key_arguments: Vec<String>,
    #[serde(default)]
    pub court: String,
    #[serde(default)]
    pub case_number: String,
}

impl CaseConfig {
    /// The side opposing counsel argues for.
    pub fn opposing_side(&self) -> &'static str {
        match self.user_role.trim().to_lowercase().as_str() {
            "plaintiff" | "prosecution" | "prosecutor" | "petitioner" | "complainant" => {
                "defendant"
            },
            _ => "plaintiff",
        }
    }

    /// Display title; falls back to "<type> matter" when none was given.
    pub fn title(&self) -> String {
        if self.case_title.trim().is_empty() {
            format!("{} matter", or_not_specified(&self.case_type))
        } else {
            self.case_title.trim().to_string()
        }
    }
}

/// Knobs that tune the opponent and the bench. All optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub judge_strictness: Option<String>,
    #[serde(default)]
    pub opponent_experience: Option<String>,
    #[serde(default)]
    pub opponent_style: Option<String>,
    #[serde(default)]
    pub opponent_strengths: Option<String>,
    #[serde(default)]
    pub time_pressure: Option<String>,
    /// Overrides the configured default round bound.
    #[serde(default)]
    pub max_rounds: Option<u32>,
}

impl PracticeConfig {
    pub fn difficulty(&self) -> &str {
        knob(&self.difficulty_level, "Standard")
    }

    pub fn strictness(&self) -> &str {
        knob(&self.judge_strictness, "Moderate")
    }

    pub fn experience(&self) -> &str {
        knob(&self.opponent_experience, "Standard")
    }

    pub fn style(&self) -> &str {
        knob(&self.opponent_style, "Professional")
    }

    pub fn strengths(&self) -> &str {
        knob(&self.opponent_strengths, "General legal knowledge")
    }

    pub fn time_pressure(&self) -> &str {
        knob(&self.time_pressure, "None")
    }
}

fn knob<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
}

pub fn or_not_specified(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        NOT_SPECIFIED
    } else {
        trimmed
    }
}

// ── Session lifecycle ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    /// Ended by the caller or by a delivered verdict. Turns are rejected.
    Completed,
}

/// Read-only view of a session handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub case: CaseConfig,
    pub practice: PracticeConfig,
    pub history: Vec<Turn>,
    pub current_speaker: Speaker,
    pub waiting_for: Speaker,
    pub round: u32,
    pub max_rounds: u32,
    pub status: SessionStatus,
    pub ready_for_final_judgment: bool,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// One line per session for listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub case_title: String,
    pub case_type: String,
    pub user_role: String,
    pub status: SessionStatus,
    pub round: u32,
    pub max_rounds: u32,
    pub ready_for_final_judgment: bool,
    pub last_updated: DateTime<Utc>,
}
