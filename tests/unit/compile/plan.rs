use super::*;
use crate::assets::descriptors::{MusicAsset, NarrationAsset, StoryText};
use crate::audio::mix::GainPoint;

fn bundle(text: &str, duration_ms: u64, images: usize, music_ms: Option<u64>) -> AssetBundle {
    AssetBundle::new(
        StoryText {
            id: "s1".to_string(),
            text: text.to_string(),
            language: "en".to_string(),
        },
        NarrationAsset {
            handle: "s1.mp3".to_string(),
            duration: Millis(duration_ms),
        },
        (0..images).map(|i| format!("img_{i}.png")),
        music_ms.map(|ms| MusicAsset {
            handle: "bed.mp3".to_string(),
            duration: Millis(ms),
        }),
    )
}

fn story(words: usize) -> String {
    (0..words)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn assembled_plan_is_fitted_to_narration() {
    let b = bundle(&story(40), 60_000, 4, Some(200_000));
    let plan = assemble_plan(&b, &PlanParams::default()).unwrap();
    assert_eq!(plan.total_duration, Millis(60_000));
    assert_eq!(plan.image_segments.last().unwrap().end, Millis(60_000));
    assert_eq!(plan.subtitle_cues.last().unwrap().end, Millis(60_000));
    assert_eq!(plan.music, MusicBed::Trim { at: Millis(60_000) });
    assert_eq!(plan.narration_ref.handle, "s1.mp3");
    plan.validate().unwrap();
}

#[test]
fn zero_duration_narration_is_rejected() {
    let b = bundle("a few words", 0, 2, None);
    let err = assemble_plan(&b, &PlanParams::default()).unwrap_err();
    assert!(err.is_planning_error(), "{err}");
}

#[test]
fn no_images_is_invalid_asset() {
    let b = bundle("a few words", 10_000, 0, None);
    assert!(matches!(
        assemble_plan(&b, &PlanParams::default()),
        Err(GrimError::InvalidAsset(_))
    ));
}

fn valid_plan() -> RenderPlan {
    assemble_plan(&bundle(&story(24), 30_000, 3, None), &PlanParams::default()).unwrap()
}

fn invariant(err: GrimError) -> &'static str {
    match err {
        GrimError::TimelineInconsistency { invariant, .. } => invariant,
        other => panic!("expected timeline inconsistency, got {other}"),
    }
}

#[test]
fn segments_short_of_total_name_the_gap() {
    let mut plan = valid_plan();
    plan.image_segments.last_mut().unwrap().end = Millis(29_000);
    let err = plan.validate().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("[29000ms, 30000ms]"), "{msg}");
    assert_eq!(invariant(err), "image-coverage");
}

#[test]
fn overlapping_cues_are_rejected() {
    let mut plan = valid_plan();
    plan.subtitle_cues[1].start = plan.subtitle_cues[0].end - Millis(1);
    assert_eq!(invariant(plan.validate().unwrap_err()), "cue-order");
}

#[test]
fn cue_past_total_is_rejected() {
    let mut plan = valid_plan();
    plan.subtitle_cues.last_mut().unwrap().end = Millis(30_001);
    assert_eq!(invariant(plan.validate().unwrap_err()), "cue-bounds");
}

#[test]
fn double_counted_overlap_is_rejected() {
    let mut plan = valid_plan();
    let shift = plan.image_segments[1].transition_in;
    plan.image_segments[1].start = plan.image_segments[1].start - shift;
    assert_eq!(invariant(plan.validate().unwrap_err()), "image-contiguity");
}

#[test]
fn envelope_outside_timeline_is_rejected() {
    let mut plan = valid_plan();
    plan.gain_envelope.points.push(GainPoint {
        time: Millis(31_000),
        gain: 0.0,
    });
    assert_eq!(invariant(plan.validate().unwrap_err()), "envelope-bounds");

    let mut plan = valid_plan();
    plan.gain_envelope.points = vec![
        GainPoint {
            time: Millis(10),
            gain: 0.0,
        },
        GainPoint {
            time: Millis(5),
            gain: 0.0,
        },
    ];
    assert_eq!(invariant(plan.validate().unwrap_err()), "envelope-order");
}

#[test]
fn music_bed_must_match_total() {
    let mut plan = valid_plan();
    plan.music = MusicBed::Trim { at: Millis(12_000) };
    assert_eq!(invariant(plan.validate().unwrap_err()), "music-length");
}

#[test]
fn json_round_trip_revalidates() {
    let plan = valid_plan();
    let json = plan.to_json().unwrap();
    assert_eq!(RenderPlan::from_json_str(&json).unwrap(), plan);

    let broken = json.replacen("\"total_duration\": 30000", "\"total_duration\": 0", 1);
    assert!(RenderPlan::from_json_str(&broken).is_err());
}
