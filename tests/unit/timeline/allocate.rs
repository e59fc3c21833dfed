use super::*;

fn rules(min_ms: u64, overlap_ms: u64) -> PacingRules {
    PacingRules {
        min_image_duration: Millis(min_ms),
        max_image_duration: None,
        transition_overlap: Millis(overlap_ms),
    }
}

fn assert_contiguous(segments: &[ImageSegment], total: Millis) {
    assert_eq!(segments.first().unwrap().start, Millis::ZERO);
    assert_eq!(segments.last().unwrap().end, total);
    for pair in segments.windows(2) {
        assert_eq!(pair[0].transition_out, pair[1].transition_in);
        assert_eq!(pair[1].start, pair[0].end - pair[0].transition_out);
        assert!(pair[0].start < pair[1].start);
    }
}

fn covered(segments: &[ImageSegment]) -> u64 {
    let lens: u64 = segments.iter().map(|s| s.len().0).sum();
    let overlaps: u64 = segments.iter().map(|s| s.transition_out.0).sum();
    lens - overlaps
}

#[test]
fn six_images_over_two_minutes_share_one_second_crossfades() {
    let total = Millis(120_000);
    let segs = allocate_segments(total, 6, &rules(10_000, 1_000)).unwrap();
    assert_eq!(segs.len(), 6);
    assert_contiguous(&segs, total);
    assert_eq!(covered(&segs), total.0);
    assert_eq!(segs[0].transition_in, Millis::ZERO);
    assert_eq!(segs[5].transition_out, Millis::ZERO);
    for (i, s) in segs.iter().enumerate() {
        assert_eq!(s.image, i);
        assert!(s.len() >= Millis(10_000));
        // (120s + 5 * 1s) / 6 per segment, residual on the last one.
        assert!(s.len().0.abs_diff(20_833) <= 2, "segment {i}: {}", s.len());
    }
}

#[test]
fn floor_violation_reduces_slots_instead_of_failing() {
    let total = Millis(15_000);
    let segs = allocate_segments(total, 10, &rules(3_000, 0)).unwrap();
    assert_eq!(segs.len(), 5);
    assert_contiguous(&segs, total);
    for s in &segs {
        assert_eq!(s.len(), Millis(3_000));
    }
    let shown: Vec<_> = segs.iter().map(|s| s.image).collect();
    assert_eq!(shown, vec![0, 2, 4, 6, 8]);
}

#[test]
fn floor_holds_with_overlap() {
    let total = Millis(15_000);
    let segs = allocate_segments(total, 10, &rules(3_000, 1_000)).unwrap();
    assert_contiguous(&segs, total);
    assert_eq!(covered(&segs), total.0);
    for s in &segs {
        assert!(s.len() >= Millis(3_000));
    }
    assert!(segs.len() < 10);
}

#[test]
fn ceiling_repeats_images_cyclically() {
    let total = Millis(120_000);
    let r = PacingRules {
        max_image_duration: Some(Millis(20_000)),
        ..rules(3_000, 1_000)
    };
    let segs = allocate_segments(total, 3, &r).unwrap();
    assert_eq!(segs.len(), 7);
    assert_contiguous(&segs, total);
    assert_eq!(covered(&segs), total.0);
    let shown: Vec<_> = segs.iter().map(|s| s.image).collect();
    assert_eq!(shown, vec![0, 1, 2, 0, 1, 2, 0]);
    for s in &segs {
        assert!(s.len() <= Millis(20_000));
    }
}

#[test]
fn residual_lands_on_last_segment() {
    let total = Millis(10_001);
    let segs = allocate_segments(total, 3, &rules(1_000, 0)).unwrap();
    assert_eq!(segs[0].len(), Millis(3_333));
    assert_eq!(segs[1].len(), Millis(3_333));
    assert_eq!(segs[2].len(), Millis(3_335));
    assert_eq!(segs[2].end, total);
}

#[test]
fn single_image_has_no_transitions() {
    let total = Millis(42_000);
    let segs = allocate_segments(total, 1, &rules(3_000, 1_000)).unwrap();
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].span(), TimeSpan::new(Millis::ZERO, total).unwrap());
    assert_eq!(segs[0].transition_in, Millis::ZERO);
    assert_eq!(segs[0].transition_out, Millis::ZERO);
}

#[test]
fn narration_shorter_than_floor_gets_one_segment() {
    let total = Millis(2_000);
    let segs = allocate_segments(total, 4, &rules(3_000, 1_000)).unwrap();
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].end, total);
}

#[test]
fn zero_images_is_invalid_asset() {
    assert!(matches!(
        allocate_segments(Millis(1_000), 0, &PacingRules::default()),
        Err(GrimError::InvalidAsset(_))
    ));
}

#[test]
fn zero_duration_yields_empty_segment() {
    let segs = allocate_segments(Millis::ZERO, 3, &PacingRules::default()).unwrap();
    assert_eq!(segs.len(), 1);
    assert!(segs[0].is_empty());
}

#[test]
fn coverage_law_holds_across_shapes() {
    for total in [1_000u64, 7_777, 15_000, 61_234, 600_000] {
        for n in [1usize, 2, 3, 7, 25] {
            for (min, overlap) in [(0, 0), (2_000, 500), (3_000, 1_000)] {
                let segs = allocate_segments(Millis(total), n, &rules(min, overlap)).unwrap();
                assert_contiguous(&segs, Millis(total));
                assert_eq!(covered(&segs), total);
                if total >= min {
                    for s in &segs {
                        assert!(s.len() >= Millis(min));
                    }
                }
            }
        }
    }
}
