use super::*;
use wm_core::parse_script;

fn row(step_id: &str, checksum: &str, success: bool) -> JournalRow {
    JournalRow {
        step_id: step_id.to_string(),
        step_name: format!("step {}", step_id),
        checksum: checksum.to_string(),
        applied_at: "2024-05-01 10:00:00+00".to_string(),
        duration_ms: 4,
        success,
        message: None,
    }
}

const SCRIPT: &str = "-- @step id:001 name:one
CREATE TABLE a (id INT);
-- @step id:002 name:two
CREATE TABLE b (id INT);
-- @step id:003 name:three
CREATE TABLE c (id INT);
-- @step id:004 name:four
CREATE TABLE d (id INT);
";

#[test]
fn test_compare_states() {
    let steps = parse_script(SCRIPT);
    let rows = vec![
        row("001", &compute_checksum(&steps[0].sql), true),
        row("002", "stale", true),
        row("003", &compute_checksum(&steps[2].sql), false),
        row("000", "gone", true),
    ];

    let entries = compare(&steps, rows);
    let states: Vec<_> = entries.iter().map(|e| (e.id.as_str(), e.state)).collect();
    assert_eq!(
        states,
        vec![
            ("001", StepState::Applied),
            ("002", StepState::Changed),
            ("003", StepState::Failed),
            ("004", StepState::Pending),
            ("000", StepState::Orphaned),
        ]
    );
    assert!(entries[3].applied_at.is_none());
}

#[test]
fn test_compare_without_journal() {
    let steps = parse_script(SCRIPT);
    let entries = compare(&steps, Vec::new());
    assert_eq!(entries.len(), 4);
    assert!(entries.iter().all(|e| e.state == StepState::Pending));
}

#[test]
fn test_duplicate_step_ids_listed_once() {
    let steps = parse_script(
        "-- @step id:001 name:one\nSELECT 1;\n-- @step id:001 name:again\nSELECT 2;\n",
    );
    assert_eq!(compare(&steps, Vec::new()).len(), 1);
}
