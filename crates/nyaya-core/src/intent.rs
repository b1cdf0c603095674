//! Keyword routing for human utterances.
//!
//! Plain substring matching over a lowercased utterance. Tags overlap freely
//! and false positives are expected; [`decide_responders`] applies a fixed
//! precedence so the routing outcome is deterministic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentTag {
    AddressesJudge,
    AddressesOpposition,
    ProceduralRequest,
    EvidenceSubmission,
    DocumentAttachment,
    RequiresOppositionResponse,
}

/// Keyword sets per tag, in the order they are evaluated.
pub const KEYWORD_TABLE: &[(IntentTag, &[&str])] = &[
    (
        IntentTag::AddressesJudge,
        &[
            "your honour",
            "your honor",
            "judge",
            "court",
            "your lordship",
            "your worship",
            "may it please the court",
            "if it please the court",
        ],
    ),
    (
        IntentTag::AddressesOpposition,
        &[
            "counsel",
            "opposition",
            "defense",
            "defence",
            "prosecution",
            "my learned friend",
            "learned counsel",
            "opposing counsel",
        ],
    ),
    (
        IntentTag::ProceduralRequest,
        &[
            "objection",
            "object",
            "sustain",
            "overrule",
            "strike",
            "withdraw",
            "rephrase",
            "clarification",
            "recess",
            "adjourn",
            "continue",
            "proceed",
            "may i approach",
            "permission to",
            "request for",
            "ruling",
            "decision",
            "order",
        ],
    ),
    (
        IntentTag::EvidenceSubmission,
        &[
            "submit",
            "introduce",
            "exhibit",
            "evidence",
            "document",
            "file",
            "attached",
            "present",
            "offer",
            "produce",
            "tender",
            "mark as exhibit",
            "admit into evidence",
        ],
    ),
    (
        IntentTag::DocumentAttachment,
        &["attached", "uploaded", "upload", "file", "document", "pdf", "doc", "txt"],
    ),
    (
        IntentTag::RequiresOppositionResponse,
        &[
            "case",
            "plaintiff",
            "defendant",
            "prove",
            "allegations",
            "claims",
            "matter",
            "proceedings",
            "will prove",
            "allege",
            "demonstrate",
            "discrimination",
            "retaliation",
            "violation",
            "breach",
            "damages",
            "evidence",
            "witness",
            "testimony",
            "argument",
        ],
    ),
];

/// Phrases that, alongside an evidence keyword, show the exhibit was offered
/// for a stated purpose.
pub const EVIDENCE_PURPOSE_KEYWORDS: &[&str] = &[
    "as evidence",
    "supporting",
    "showing",
    "demonstrating",
    "proving",
    "establishing",
    "corroborating",
    "confirming",
    "verifying",
];

/// Whole-utterance greetings (exact match after trim + lowercase).
pub const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentTags {
    pub addresses_judge: bool,
    pub addresses_opposition: bool,
    pub is_procedural_request: bool,
    pub is_evidence_submission: bool,
    pub is_document_attachment: bool,
    pub has_proper_evidence_framing: bool,
    pub is_greeting: bool,
    pub requires_opposition_response: bool,
}

impl IntentTags {
    fn set(&mut self, tag: IntentTag) {
        match tag {
            IntentTag::AddressesJudge => self.addresses_judge = true,
            IntentTag::AddressesOpposition => self.addresses_opposition = true,
            IntentTag::ProceduralRequest => self.is_procedural_request = true,
            IntentTag::EvidenceSubmission => self.is_evidence_submission = true,
            IntentTag::DocumentAttachment => self.is_document_attachment = true,
            IntentTag::RequiresOppositionResponse => self.requires_opposition_response = true,
        }
    }
}

pub fn classify_intent(utterance: &str) -> IntentTags {
    let lower = utterance.to_lowercase();
    let mut tags = IntentTags::default();

    for (tag, keywords) in KEYWORD_TABLE {
        if keywords.iter().any(|k| lower.contains(k)) {
            tags.set(*tag);
        }
    }

    tags.has_proper_evidence_framing = tags.is_evidence_submission
        && EVIDENCE_PURPOSE_KEYWORDS.iter().any(|k| lower.contains(k));
    tags.is_greeting = GREETINGS.contains(&lower.trim());
    tags
}

/// Which model role answers the utterance. Exactly one field is true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responders {
    pub ai_lawyer_should_respond: bool,
    pub judge_should_respond: bool,
}

impl Responders {
    pub const JUDGE_ONLY: Self = Self {
        ai_lawyer_should_respond: false,
        judge_should_respond: true,
    };
    pub const LAWYER_ONLY: Self = Self {
        ai_lawyer_should_respond: true,
        judge_should_respond: false,
    };
}

pub fn decide_responders(tags: &IntentTags) -> Responders {
    // A bare greeting only goes to the bench when the bench is named.
    if tags.is_greeting {
        return if tags.addresses_judge {
            Responders::JUDGE_ONLY
        } else {
            Responders::LAWYER_ONLY
        };
    }

    if tags.addresses_judge || tags.is_procedural_request {
        return Responders::JUDGE_ONLY;
    }
    // Exhibits go through the bench before opposing counsel may answer them.
    if tags.is_evidence_submission
        || (tags.is_document_attachment && !tags.has_proper_evidence_framing)
    {
        return Responders::JUDGE_ONLY;
    }
    if tags.addresses_opposition || tags.requires_opposition_response {
        return Responders::LAWYER_ONLY;
    }
    Responders::LAWYER_ONLY
}
