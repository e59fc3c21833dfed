use super::*;

#[test]
fn zero_threads_is_rejected() {
    assert!(matches!(
        build_thread_pool(Some(0)),
        Err(GrimError::Config(_))
    ));
}

#[test]
fn explicit_thread_count_is_honored() {
    let pool = build_thread_pool(Some(2)).unwrap();
    assert_eq!(pool.current_num_threads(), 2);
}

#[test]
fn outcome_success_covers_skipped_stories() {
    let done = StoryOutcome {
        id: "a".to_string(),
        status: StoryStatus::AlreadyRendered { video: None },
    };
    let failed = StoryOutcome {
        id: "b".to_string(),
        status: StoryStatus::Failed {
            stage: Stage::Narrated,
            error: GrimError::unavailable("tts", "down"),
        },
    };
    assert!(done.is_success());
    assert!(!failed.is_success());
}

#[test]
fn duplicates_are_neither_success_nor_failure() {
    let dup = StoryOutcome {
        id: "b".to_string(),
        status: StoryStatus::Duplicate {
            of: "a".to_string(),
        },
    };
    assert!(!dup.is_success());
    assert!(!matches!(dup.status, StoryStatus::Failed { .. }));
}
