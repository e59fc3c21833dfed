use super::*;

const BUNDLE: &str = r#"
{
  "id": "t3_abc",
  "text": "The door was open.",
  "narration": { "handle": "out/t3_abc.mp3", "duration_s": 12.5 },
  "images": ["img/a.png", "img/b.png"],
  "music": { "handle": "music/creepy.mp3", "duration_s": 0 }
}
"#;

#[test]
fn bundle_file_converts_seconds_and_numbers_images() {
    let bundle = AssetBundle::from_json_str(BUNDLE).unwrap();
    assert_eq!(bundle.story.language, "en");
    assert_eq!(bundle.narration.duration, Millis(12_500));
    assert_eq!(bundle.images.len(), 2);
    assert_eq!(bundle.images[1].ordinal, 1);
    assert_eq!(bundle.images[1].source.as_deref(), Some("img/b.png"));
}

#[test]
fn zero_length_music_counts_as_absent() {
    let bundle = AssetBundle::from_json_str(BUNDLE).unwrap();
    assert!(bundle.music.is_some());
    assert!(bundle.effective_music().is_none());
}

#[test]
fn negative_narration_is_invalid_asset() {
    let raw = r#"{ "id": "x", "text": "", "narration": { "handle": "n", "duration_s": -1 } }"#;
    assert!(matches!(
        AssetBundle::from_json_str(raw),
        Err(GrimError::InvalidAsset(_))
    ));
}

#[test]
fn unknown_fields_are_serde_errors() {
    let raw = r#"{ "id": "x", "text": "", "narration": { "handle": "n", "duration_s": 1 }, "extra": 1 }"#;
    assert!(matches!(
        AssetBundle::from_json_str(raw),
        Err(GrimError::Serde(_))
    ));
}

#[test]
fn out_of_order_ordinals_are_rejected() {
    let mut bundle = AssetBundle::from_json_str(BUNDLE).unwrap();
    bundle.images.swap(0, 1);
    let err = bundle.validate().unwrap_err();
    assert!(err.to_string().contains("ordinal"));
}
