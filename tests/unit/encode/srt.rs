use super::*;

#[test]
fn timestamps_carry_hours_and_millis() {
    assert_eq!(timestamp(Millis(0)), "00:00:00,000");
    assert_eq!(timestamp(Millis(6_000)), "00:00:06,000");
    assert_eq!(timestamp(Millis(3_723_045)), "01:02:03,045");
}

#[test]
fn cues_are_numbered_from_one() {
    let cues = vec![
        SubtitleCue {
            index: 0,
            start: Millis(0),
            end: Millis(1_500),
            text: "The house was quiet".to_string(),
        },
        SubtitleCue {
            index: 1,
            start: Millis(1_500),
            end: Millis(3_000),
            text: "until it wasn't.".to_string(),
        },
    ];
    let srt = write_srt(&cues);
    assert_eq!(
        srt,
        "1\n00:00:00,000 --> 00:00:01,500\nThe house was quiet\n\n\
         2\n00:00:01,500 --> 00:00:03,000\nuntil it wasn't.\n\n"
    );
}

#[test]
fn file_is_written_with_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cues.srt");
    write_srt_file(&[], &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}
