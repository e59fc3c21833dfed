use super::*;

fn words(n: usize) -> String {
    (0..n)
        .map(|i| format!("w{i:03}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn rules(words_per_subtitle: usize, max_chars_per_line: usize) -> SubtitleRules {
    SubtitleRules {
        words_per_subtitle,
        max_chars_per_line,
    }
}

#[test]
fn hundred_sixty_words_make_twenty_equal_cues() {
    let total = Millis(120_000);
    let cues = segment_subtitles(&words(160), total, &rules(8, 50)).unwrap();
    assert_eq!(cues.len(), 20);
    for (i, cue) in cues.iter().enumerate() {
        assert_eq!(cue.index, i);
        assert_eq!(cue.word_count(), 8);
        assert_eq!(cue.end - cue.start, Millis(6_000));
    }
    assert_eq!(cues[0].start, Millis::ZERO);
    assert_eq!(cues[19].end, total);
}

#[test]
fn cues_rejoin_to_normalized_text() {
    let raw = "The **thing** in the   hallway\nkept *whispering* my name, [removed] over and over until dawn broke.";
    let cues = segment_subtitles(raw, Millis(9_000), &rules(4, 20)).unwrap();
    let rejoined = cues
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CUE_DELIMITER);
    assert_eq!(rejoined, normalize_text(raw));
}

#[test]
fn cues_are_ordered_and_non_overlapping() {
    let cues = segment_subtitles(&words(37), Millis(10_007), &rules(5, 50)).unwrap();
    for cue in &cues {
        assert!(cue.start < cue.end);
    }
    for pair in cues.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    assert_eq!(cues.last().unwrap().end, Millis(10_007));
}

#[test]
fn character_budget_cuts_groups_short() {
    let text = "aaaaaaaaaa bbbbbbbbbb cccccccccc dddddddddd";
    let cues = segment_subtitles(text, Millis(4_000), &rules(8, 21)).unwrap();
    let texts: Vec<_> = cues.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["aaaaaaaaaa bbbbbbbbbb", "cccccccccc dddddddddd"]);
}

#[test]
fn over_long_word_is_kept_as_its_own_cue() {
    let text = "a supercalifragilisticexpialidocious b";
    let cues = segment_subtitles(text, Millis(3_000), &rules(8, 10)).unwrap();
    let texts: Vec<_> = cues.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["a", "supercalifragilisticexpialidocious", "b"]);
    assert_eq!(cues[1].end - cues[1].start, Millis(1_000));
}

#[test]
fn timing_is_proportional_to_word_count() {
    let text = "one two three four five six";
    let cues = segment_subtitles(text, Millis(6_000), &rules(4, 50)).unwrap();
    assert_eq!(cues.len(), 2);
    assert_eq!(cues[0].end, Millis(4_000));
    assert_eq!(cues[1].start, Millis(4_000));
    assert_eq!(cues[1].end, Millis(6_000));
}

#[test]
fn character_budget_counts_chars_not_bytes() {
    let text = "夜 の 廊下 で 声 が した";
    let cues = segment_subtitles(text, Millis(7_000), &rules(8, 5)).unwrap();
    for cue in &cues {
        assert!(cue.text.chars().count() <= 5, "{:?}", cue.text);
    }
    assert_eq!(cues.iter().map(|c| c.word_count()).sum::<usize>(), 7);
}

#[test]
fn no_words_means_no_cues() {
    assert!(segment_subtitles("", Millis(5_000), &rules(8, 50)).unwrap().is_empty());
    assert!(
        segment_subtitles("  [deleted]  ", Millis(5_000), &rules(8, 50))
            .unwrap()
            .is_empty()
    );
}

#[test]
fn narration_too_short_for_cues_is_invalid_asset() {
    let err = segment_subtitles(&words(10), Millis(2), &rules(1, 50)).unwrap_err();
    assert!(matches!(err, GrimError::InvalidAsset(_)));
}

#[test]
fn zero_budgets_are_config_errors() {
    assert!(matches!(
        segment_subtitles("a b", Millis(10), &rules(0, 50)),
        Err(GrimError::Config(_))
    ));
}
