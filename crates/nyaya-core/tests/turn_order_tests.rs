use chrono::Utc;
use nyaya_core::{
    error::CourtError,
    session::DebateSession,
    types::{CaseConfig, PracticeConfig, SessionStatus, Speaker, Turn},
};

fn opened_session(max_rounds: u32) -> DebateSession {
    let case = CaseConfig {
        case_type: "employment".into(),
        user_role: "plaintiff".into(),
        issue: "wrongful termination".into(),
        ..Default::default()
    };
    let mut s = DebateSession::new("t1", case, PracticeConfig::default(), max_rounds, Utc::now());
    s.submit_turn(Speaker::Judge, "Court is now in session.", Utc::now())
        .unwrap();
    s
}

fn full_round(s: &mut DebateSession, n: u32) {
    s.submit_turn(Speaker::User, format!("argument {n}"), Utc::now()).unwrap();
    s.submit_turn(Speaker::AiLawyer, format!("rebuttal {n}"), Utc::now()).unwrap();
    s.submit_turn(Speaker::Judge, format!("direction {n}"), Utc::now()).unwrap();
}

#[test]
fn test_new_session_waits_for_user_after_opening() {
    let s = opened_session(10);
    assert_eq!(s.round, 1);
    assert_eq!(s.waiting_for, Speaker::User);
    assert_eq!(s.current_speaker, Speaker::Judge);
    assert_eq!(s.status, SessionStatus::Active);
    assert_eq!(s.history.len(), 1);
}

#[test]
fn test_round_only_advances_on_lawyer_turns() {
    let mut s = opened_session(10);
    let mut last_round = s.round;
    let sequence = [
        (Speaker::User, false),
        (Speaker::AiLawyer, true),
        (Speaker::Judge, false),
        (Speaker::Judge, false),
        (Speaker::User, false),
        (Speaker::AiLawyer, true),
    ];
    for (speaker, advances) in sequence {
        s.submit_turn(speaker, "x", Utc::now()).unwrap();
        let expected = if advances { last_round + 1 } else { last_round };
        assert_eq!(s.round, expected, "after {speaker}");
        last_round = s.round;
    }
}

#[test]
fn test_out_of_turn_submission_changes_nothing() {
    let mut s = opened_session(10);
    let before_len = s.history.len();

    let err = s.submit_turn(Speaker::AiLawyer, "too early", Utc::now()).unwrap_err();
    assert_eq!(
        err,
        CourtError::InvalidTurn {
            speaker: Speaker::AiLawyer,
            expected: Speaker::User
        }
    );
    assert_eq!(s.history.len(), before_len);
    assert_eq!(s.waiting_for, Speaker::User);
    assert_eq!(s.round, 1);

    s.submit_turn(Speaker::User, "opening argument", Utc::now()).unwrap();
    let err = s.submit_turn(Speaker::User, "again", Utc::now()).unwrap_err();
    assert!(matches!(err, CourtError::InvalidTurn { expected: Speaker::AiLawyer, .. }));
    assert_eq!(s.history.len(), before_len + 1);
    assert_eq!(s.waiting_for, Speaker::AiLawyer);
}

#[test]
fn test_judge_may_interject_while_user_awaited() {
    let mut s = opened_session(10);
    full_round(&mut s, 1);
    assert_eq!(s.waiting_for, Speaker::User);
    s.submit_turn(Speaker::Judge, "Counsel, be brief.", Utc::now()).unwrap();
    assert_eq!(s.waiting_for, Speaker::User);
}

#[test]
fn test_judge_interjection_after_user_hands_floor_to_counsel() {
    let mut s = opened_session(10);
    // The user spoke last and the session is still waiting on the user.
    s.history.push(Turn {
        speaker: Speaker::User,
        text: "I rest on the documents.".into(),
        timestamp: Utc::now(),
    });
    s.waiting_for = Speaker::User;

    s.submit_turn(Speaker::Judge, "Noted.", Utc::now()).unwrap();
    assert_eq!(s.waiting_for, Speaker::AiLawyer);
    s.submit_turn(Speaker::AiLawyer, "Response.", Utc::now()).unwrap();
    assert_eq!(s.waiting_for, Speaker::Judge);
}

#[test]
fn test_lawyer_turn_hands_floor_to_judge() {
    let mut s = opened_session(10);
    s.submit_turn(Speaker::User, "argument", Utc::now()).unwrap();
    s.submit_turn(Speaker::AiLawyer, "rebuttal", Utc::now()).unwrap();
    assert_eq!(s.waiting_for, Speaker::Judge);
    assert!(s.submit_turn(Speaker::User, "interrupt", Utc::now()).is_err());
}

#[test]
fn test_max_rounds_is_advisory() {
    let mut s = opened_session(10);
    for n in 1..=9 {
        assert!(!s.ready_for_final_judgment(), "ready too early at {n}");
        full_round(&mut s, n);
    }
    assert_eq!(s.round, 10);
    assert!(s.ready_for_final_judgment());
    assert!(s.snapshot().ready_for_final_judgment);

    s.submit_turn(Speaker::User, "one more point", Utc::now()).unwrap();
    assert_eq!(s.waiting_for, Speaker::AiLawyer);
    assert_eq!(s.round, 10);
}

#[test]
fn test_completed_session_rejects_everyone() {
    let mut s = opened_session(10);
    s.complete(Utc::now());
    for speaker in [Speaker::User, Speaker::AiLawyer, Speaker::Judge] {
        assert_eq!(
            s.submit_turn(speaker, "late", Utc::now()),
            Err(CourtError::SessionEnded("t1".into()))
        );
    }
    assert_eq!(s.history.len(), 1);
}
