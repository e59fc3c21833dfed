use super::*;

fn rec(id: &str, title: &str, text: &str, stage: Option<Stage>) -> StoryRecord {
    let mut r = StoryRecord::new(id);
    r.title = title.to_string();
    r.text = text.to_string();
    if let Some(stage) = stage {
        r.complete(stage);
    }
    r
}

#[test]
fn stats_count_stages_failures_and_words() {
    let mut failed = rec("c", "The Well", "it was deep", Some(Stage::Fetched));
    failed.fail(Stage::Translated, "offline");
    let records = vec![
        rec("a", "The Door", "one two three", Some(Stage::Rendered)),
        rec("b", "The Hall", "four five", Some(Stage::Rendered)),
        failed,
        rec("d", "", "", None),
    ];
    let stats = StoreStats::from_records(&records);
    assert_eq!(stats.total, 4);
    assert_eq!(stats.at_stage(Stage::Rendered), 2);
    assert_eq!(stats.at_stage(Stage::Fetched), 1);
    assert_eq!(stats.at_stage(Stage::Narrated), 0);
    assert_eq!(stats.not_started, 1);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.total_words, 8);
    assert!((stats.average_words() - 2.0).abs() < 1e-9);
    assert!(stats.earliest_update <= stats.latest_update);
}

#[test]
fn empty_stats_have_no_range() {
    let stats = StoreStats::from_records(&[]);
    assert_eq!(stats.total, 0);
    assert_eq!(stats.average_words(), 0.0);
    assert!(stats.latest_update.is_none());
}

#[test]
fn search_matches_id_title_and_text_ignoring_case() {
    let records = vec![
        rec("cellar-1", "Down There", "the stairs creaked", None),
        rec("attic-2", "The ATTIC", "dust everywhere", None),
        rec("yard-3", "Out Back", "something in the Cellar", None),
    ];
    let ids: Vec<_> = search_records(&records, "cellar")
        .into_iter()
        .map(|r| r.id.as_str())
        .collect();
    assert_eq!(ids, vec!["cellar-1", "yard-3"]);
    assert_eq!(search_records(&records, "attic").len(), 1);
    assert!(search_records(&records, "   ").is_empty());
}

#[test]
fn title_key_ignores_case_and_spacing() {
    assert_eq!(title_key("  The   Thing\tIn the WALLS "), "the thing in the walls");
    assert_eq!(title_key(""), "");
}

#[test]
fn export_can_leave_out_content() {
    let mut r = rec("a", "The Door", "one two three", Some(Stage::Translated));
    r.translated_text = Some("un deux trois".to_string());
    let records = vec![r];

    let full = export_records(&records, true, Path::new("db.json")).unwrap();
    assert_eq!(full["export_metadata"]["total_stories"], 1);
    assert_eq!(full["export_metadata"]["content_included"], true);
    assert_eq!(full["export_metadata"]["source_file"], "db.json");
    assert_eq!(full["stories"][0]["text"], "one two three");

    let bare = export_records(&records, false, Path::new("db.json")).unwrap();
    let story = bare["stories"][0].as_object().unwrap();
    assert!(!story.contains_key("text"));
    assert!(!story.contains_key("translated_text"));
    assert_eq!(story["title"], "The Door");
    assert_eq!(story["completed"], "translated");
}
