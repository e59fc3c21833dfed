use super::*;

#[test]
fn defaults_validate_and_flatten() {
    let cfg = PlanConfig::default();
    cfg.validate().unwrap();
    let p = cfg.params("en").unwrap();
    assert_eq!(p.pacing.min_image_duration, Millis(3_000));
    assert_eq!(p.pacing.transition_overlap, Millis(1_000));
    assert_eq!(p.pacing.max_image_duration, None);
    assert_eq!(p.subtitles.words_per_subtitle, 8);
    assert_eq!(p.subtitles.max_chars_per_line, 50);
    assert_eq!(p.mix.fade_in, Millis(2_000));
    assert!((p.mix.music_gain - 0.12).abs() < 1e-6);
    assert_eq!(PlanParams::default(), p);
}

#[test]
fn language_overrides_narrow_line_budget() {
    let cfg = PlanConfig::default();
    assert_eq!(cfg.params("ja").unwrap().subtitles.max_chars_per_line, 20);
    assert_eq!(cfg.params(" ZH ").unwrap().subtitles.max_chars_per_line, 20);
    assert_eq!(cfg.params("de").unwrap().subtitles.max_chars_per_line, 50);
}

#[test]
fn partial_json_keeps_defaults() {
    let cfg = PlanConfig::from_json_str(r#"{ "words_per_subtitle": 5, "music_gain": 0.3 }"#)
        .unwrap();
    assert_eq!(cfg.words_per_subtitle, 5);
    assert_eq!(cfg.max_chars_per_line, 50);
    assert!((cfg.music_gain - 0.3).abs() < 1e-6);
}

#[test]
fn unknown_keys_are_rejected() {
    assert!(matches!(
        PlanConfig::from_json_str(r#"{ "words_per_cue": 5 }"#),
        Err(GrimError::Serde(_))
    ));
}

#[test]
fn invalid_values_are_config_errors() {
    let bad = [
        r#"{ "music_gain": 1.5 }"#,
        r#"{ "words_per_subtitle": 0 }"#,
        r#"{ "max_chars_per_line": 0 }"#,
        r#"{ "fade_in_s": -1 }"#,
        r#"{ "min_image_duration_s": 2, "transition_overlap_s": 2 }"#,
        r#"{ "max_image_duration_s": 2 }"#,
        r#"{ "languages": { "ja": { "max_chars_per_line": 0 } } }"#,
    ];
    for raw in bad {
        assert!(
            matches!(PlanConfig::from_json_str(raw), Err(GrimError::Config(_))),
            "{raw} should be rejected"
        );
    }
}

#[test]
fn requested_images_follow_target_duration_with_minimum() {
    let cfg = PlanConfig::default();
    assert_eq!(cfg.requested_image_count(Millis(120_000)), 12);
    assert_eq!(cfg.requested_image_count(Millis(15_000)), 3);
    assert_eq!(cfg.requested_image_count(Millis::ZERO), 3);
}
