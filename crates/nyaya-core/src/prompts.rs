//! Prompt builders for the bench and opposing counsel.
//!
//! Every builder is a pure function of session state and never fails;
//! absent case fields render as "Not specified".

use crate::{
    intent::IntentTags,
    session::DebateSession,
    types::{or_not_specified, CaseConfig, PracticeConfig, Turn},
};

pub const DEFAULT_HISTORY_WINDOW: usize = 5;

const JUDGE_PERSONA: &str = "an experienced High Court Judge with 20+ years of experience";
const LAWYER_PERSONA: &str = "a seasoned trial attorney with 15+ years of experience";

/// `ROLE: text` lines, oldest first.
pub fn format_history(turns: &[Turn]) -> String {
    if turns.is_empty() {
        return "(no dialogue yet)".to_string();
    }
    turns
        .iter()
        .map(|t| format!("{}: {}", t.speaker.as_str().to_uppercase(), t.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn case_facts(case: &CaseConfig) -> String {
    let key_arguments = if case.key_arguments.is_empty() {
        or_not_specified("").to_string()
    } else {
        case.key_arguments.join("; ")
    };
    format!(
        "CASE: {title}\n\
         - Case Type: {case_type}\n\
         - Specific Issue: {issue}\n\
         - Case Summary: {summary}\n\
         - Plaintiff: {plaintiff}\n\
         - Defendant: {defendant}\n\
         - User Role: {user_role}\n\
         - Key Arguments: {key_arguments}",
        title = case.title(),
        case_type = or_not_specified(&case.case_type),
        issue = or_not_specified(&case.issue),
        summary = or_not_specified(&case.summary),
        plaintiff = or_not_specified(&case.plaintiff),
        defendant = or_not_specified(&case.defendant),
        user_role = or_not_specified(&case.user_role),
    )
}

/// Burden-of-proof reminder for opposing counsel.
fn legal_standard(case_type: &str) -> &'static str {
    let t = case_type.to_lowercase();
    if t.contains("criminal") {
        "The burden lies on the prosecution to prove every element beyond reasonable doubt. \
         Courts weigh context, continuity and credibility of allegations."
    } else if t.contains("employment") {
        "The burden shifts with the claim: discrimination claims need prima facie evidence \
         before the burden moves to the employer."
    } else if t.contains("civil") || t.contains("contract") || t.contains("property") {
        "The plaintiff must establish the case on a preponderance of evidence."
    } else {
        "Hold the opposing side to the burden of proof that governs this type of matter."
    }
}

/// Round-closing direction from the bench.
pub fn judge_prompt(session: &DebateSession, window: usize) -> String {
    format!(
        "You are {JUDGE_PERSONA} presiding over this case.\n\n\
         {facts}\n\n\
         Strictness: {strictness}\n\n\
         RECENT DIALOGUE:\n{history}\n\n\
         Your task is to:\n\
         1. Acknowledge the last statement\n\
         2. Provide a concise ruling or guidance\n\
         3. Direct the next steps in the proceeding\n\n\
         Keep your response under 3 sentences. Be decisive and maintain courtroom decorum.",
        facts = case_facts(&session.case),
        strictness = session.practice.strictness(),
        history = format_history(session.recent_history(window)),
    )
}

pub fn lawyer_prompt(session: &DebateSession, window: usize) -> String {
    let practice = &session.practice;
    format!(
        "You are {LAWYER_PERSONA} representing the {side}.\n\n\
         {facts}\n\n\
         OPPONENT PROFILE (you):\n\
         - Experience Level: {experience}\n\
         - Argument Style: {style}\n\
         - Strengths: {strengths}\n\
         - Difficulty Level: {difficulty}\n\n\
         LEGAL STANDARD: {standard}\n\n\
         RECENT DIALOGUE:\n{history}\n\n\
         Your task is to:\n\
         1. Respond to the last statement\n\
         2. Make a strong legal argument or counter-argument\n\
         3. Reference relevant laws and precedents when possible\n\n\
         Keep your response under 100 words. Be persuasive but professional.",
        side = session.case.opposing_side(),
        facts = case_facts(&session.case),
        experience = practice.experience(),
        style = practice.style(),
        strengths = practice.strengths(),
        difficulty = practice.difficulty(),
        standard = legal_standard(&session.case.case_type),
        history = format_history(session.recent_history(window)),
    )
}

pub fn greeting_prompt(session: &DebateSession, utterance: &str) -> String {
    format!(
        "You are {LAWYER_PERSONA} acting as opposing counsel for the {side} in {title}. \
         The other lawyer has just greeted you.\n\
         Respond briefly and professionally. Do not start arguing the case yet; \
         acknowledge the greeting and invite them to begin.\n\n\
         Their greeting: \"{utterance}\"",
        side = session.case.opposing_side(),
        title = session.case.title(),
        utterance = utterance.trim(),
    )
}

/// The bench answering a direct address, a procedural request or an exhibit.
pub fn judge_intervention_prompt(
    session: &DebateSession,
    utterance: &str,
    tags: &IntentTags,
    window: usize,
) -> String {
    let mut situation = Vec::new();
    if tags.is_greeting {
        situation.push("The lawyer greeted the court; acknowledge the greeting.");
    }
    if tags.addresses_judge {
        situation.push("The court was addressed directly; acknowledge the address.");
    }
    if tags.is_procedural_request {
        situation.push("This is a procedural request (objection, motion, ruling); rule on it.");
    }
    if tags.is_evidence_submission || tags.is_document_attachment {
        if tags.has_proper_evidence_framing {
            situation.push(
                "Evidence was introduced with a stated purpose; acknowledge receipt, \
                 assign an exhibit label and ask opposing counsel for objections.",
            );
        } else {
            situation.push(
                "A document was offered without a stated purpose; instruct counsel to \
                 introduce it properly with its purpose and relevance.",
            );
        }
    }
    if situation.is_empty() {
        situation.push("Provide brief judicial guidance to keep the debate on track.");
    }

    format!(
        "You are {JUDGE_PERSONA}, an impartial judge overseeing a practice debate \
         between a human lawyer and opposing counsel.\n\n\
         {facts}\n\n\
         JUDGE CONFIGURATION:\n\
         - Strictness Level: {strictness}\n\
         - Difficulty Level: {difficulty}\n\n\
         RECENT DIALOGUE:\n{history}\n\n\
         HUMAN LAWYER'S STATEMENT: \"{utterance}\"\n\n\
         SITUATION:\n{situation}\n\n\
         Use judicial language (\"The Court observes...\", \"Counsel, please...\"). \
         Be authoritative, fair and concise.",
        facts = case_facts(&session.case),
        strictness = session.practice.strictness(),
        difficulty = session.practice.difficulty(),
        history = format_history(session.recent_history(window)),
        utterance = utterance.trim(),
        situation = situation
            .iter()
            .map(|s| format!("- {s}"))
            .collect::<Vec<_>>()
            .join("\n"),
    )
}

pub fn opening_prompt(case: &CaseConfig, practice: &PracticeConfig) -> String {
    format!(
        "You are {JUDGE_PERSONA} presiding over a new practice case in {court} \
         (case no. {number}). Deliver the formal opening of the court.\n\n\
         {facts}\n\n\
         PRACTICE CONFIGURATION:\n\
         - Difficulty Level: {difficulty}\n\
         - Judge Strictness: {strictness}\n\
         - Opponent Experience: {experience}\n\
         - Opponent Style: {style}\n\
         - Time Pressure: {time_pressure}\n\n\
         The opening must:\n\
         1. Acknowledge the appearance of both parties\n\
         2. Summarise the case briefly\n\
         3. Name the key legal issues to be addressed\n\
         4. Invite the {user_role} to begin\n\n\
         Use formal judicial language. Keep it concise.",
        court = or_not_specified(&case.court),
        number = or_not_specified(&case.case_number),
        facts = case_facts(case),
        difficulty = practice.difficulty(),
        strictness = practice.strictness(),
        experience = practice.experience(),
        style = practice.style(),
        time_pressure = practice.time_pressure(),
        user_role = or_not_specified(&case.user_role),
    )
}

/// Final judgment over the whole record.
pub fn verdict_prompt(session: &DebateSession) -> String {
    format!(
        "You are {JUDGE_PERSONA}. The practice debate has concluded after {rounds} round(s). \
         Deliver the final judgment.\n\n\
         {facts}\n\n\
         FULL RECORD:\n{history}\n\n\
         Your judgment must:\n\
         1. Summarise the strongest argument from each side\n\
         2. Rule on the issue, stating the applicable legal standard\n\
         3. Give the human lawyer two concrete points of feedback on their advocacy\n\n\
         Use formal judicial language.",
        rounds = session.round.saturating_sub(1),
        facts = case_facts(&session.case),
        history = format_history(&session.history),
    )
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::{intent::classify_intent, types::Speaker};

    fn session() -> DebateSession {
        let case = CaseConfig {
            case_type: "Criminal".into(),
            user_role: "prosecution".into(),
            issue: "Section 498A cruelty".into(),
            ..Default::default()
        };
        let mut s = DebateSession::new("p1", case, PracticeConfig::default(), 10, Utc::now());
        s.submit_turn(Speaker::Judge, "Court is in session.", Utc::now()).unwrap();
        s
    }

    #[test]
    fn history_lines_use_upper_role() {
        let s = session();
        assert_eq!(format_history(&s.history), "JUDGE: Court is in session.");
    }

    #[test]
    fn history_window_keeps_last_entries() {
        let mut s = session();
        for i in 0..3 {
            s.submit_turn(Speaker::User, format!("u{i}"), Utc::now()).unwrap();
            s.submit_turn(Speaker::AiLawyer, format!("l{i}"), Utc::now()).unwrap();
            s.submit_turn(Speaker::Judge, format!("j{i}"), Utc::now()).unwrap();
        }
        let prompt = judge_prompt(&s, 5);
        assert!(!prompt.contains("USER: u0"));
        assert!(!prompt.contains("USER: u1"));
        assert!(prompt.contains("AI_LAWYER: l1"));
        assert!(prompt.contains("JUDGE: j2"));
    }

    #[test]
    fn missing_fields_render_placeholder() {
        let s = session();
        let prompt = lawyer_prompt(&s, DEFAULT_HISTORY_WINDOW);
        assert!(prompt.contains("Case Summary: Not specified"));
        assert!(prompt.contains("representing the defendant"));
        assert!(prompt.contains("beyond reasonable doubt"));
    }

    #[test]
    fn intervention_prompt_guides_unframed_documents() {
        let s = session();
        let text = "Attached: 1.pdf";
        let prompt = judge_intervention_prompt(&s, text, &classify_intent(text), 5);
        assert!(prompt.contains("without a stated purpose"));
    }
}
