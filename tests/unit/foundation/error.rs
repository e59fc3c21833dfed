use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        GrimError::invalid_asset("x")
            .to_string()
            .contains("invalid asset:")
    );
    assert!(
        GrimError::timeline("image-coverage", "gap")
            .to_string()
            .contains("timeline inconsistency [image-coverage]: gap")
    );
    assert!(
        GrimError::config("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        GrimError::encoding("x")
            .to_string()
            .contains("encoding failure:")
    );
    assert!(GrimError::storage("x").to_string().contains("storage error:"));
    assert!(
        GrimError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = GrimError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}

#[test]
fn classification_splits_planning_from_collaborator_errors() {
    assert!(GrimError::invalid_asset("x").is_planning_error());
    assert!(GrimError::timeline("cue-order", "x").is_planning_error());
    assert!(!GrimError::invalid_asset("x").is_retryable());

    let rate = GrimError::RateLimited {
        provider: "tts".into(),
        retry_after: Some(Duration::from_millis(5)),
    };
    assert!(rate.is_retryable());
    assert!(GrimError::unavailable("tts", "down").is_retryable());
    assert!(
        GrimError::Timeout {
            operation: "narrate".into(),
            after: Duration::from_secs(1),
        }
        .is_retryable()
    );
    assert!(!GrimError::encoding("x").is_retryable());
    assert!(!GrimError::encoding("x").is_planning_error());
}
