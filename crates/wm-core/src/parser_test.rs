use super::*;
use crate::source::{MigrationSource, StringSource};
use futures::StreamExt;
use std::io;

async fn parse_async(script: &str) -> Vec<MigrationStep> {
    let lines = StringSource::new(script).lines().await.unwrap();
    StepParser::new(lines)
        .into_stream()
        .map(|s| s.unwrap())
        .collect()
        .await
}

#[test]
fn test_parse_two_steps() {
    let script = "-- @step id:001 name:create.users\n\
                  CREATE TABLE users (id INT);\n\
                  -- @step id:002 name:index.users\n\
                  CREATE INDEX ix_users ON users(id);\n";
    let steps = parse_script(script);

    assert_eq!(steps.len(), 2);
    assert_eq!(steps[0].id, "001");
    assert_eq!(steps[0].name, "create.users");
    assert_eq!(steps[0].sql, "CREATE TABLE users (id INT);");
    assert!(steps[0].check_sql.is_none());
    assert_eq!(steps[1].id, "002");
    assert_eq!(steps[1].sql, "CREATE INDEX ix_users ON users(id);");
}

#[test]
fn test_name_keeps_spaces_and_is_trimmed() {
    let steps = parse_script("-- @step id:7 name:  add the orders table  \nSELECT 1;");
    assert_eq!(steps[0].name, "add the orders table");
}

#[test]
fn test_check_directive_sets_probe() {
    let script = "-- @step id:001 name:t\n\
                  -- @check SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = 't')  \n\
                  CREATE TABLE t (id INT);";
    let steps = parse_script(script);
    assert_eq!(
        steps[0].check_sql.as_deref(),
        Some("SELECT EXISTS (SELECT 1 FROM information_schema.tables WHERE table_name = 't')")
    );
    assert_eq!(steps[0].sql, "CREATE TABLE t (id INT);");
}

#[test]
fn test_later_check_overwrites_earlier() {
    let script = "-- @step id:1 name:a\n-- @check SELECT false\nSELECT 1;\n-- @check SELECT true\n";
    let steps = parse_script(script);
    assert_eq!(steps[0].check_sql.as_deref(), Some("SELECT true"));
    assert_eq!(steps[0].sql, "SELECT 1;");
}

#[test]
fn test_directive_keywords_are_case_insensitive() {
    let script = "--   @STEP id:A1 name:upper\n-- @Check select true\nselect 1;";
    let steps = parse_script(script);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].id, "A1");
    assert_eq!(steps[0].check_sql.as_deref(), Some("select true"));
}

#[test]
fn test_lines_before_first_step_are_ignored() {
    let script = "-- migrations for the app\nCREATE TABLE orphan (id INT);\n-- @check SELECT true\n\
                  -- @step id:1 name:a\nSELECT 1;";
    let steps = parse_script(script);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].sql, "SELECT 1;");
    assert!(steps[0].check_sql.is_none());
}

#[test]
fn test_bodiless_step_is_dropped() {
    let script = "-- @step id:1 name:empty\n\
                  -- @step id:2 name:real\n\
                  SELECT 2;\n\
                  -- @step id:3 name:blank\n\n   \n\
                  -- @step id:4 name:also.real\n\
                  SELECT 4;";
    let steps = parse_script(script);
    let ids: Vec<&str> = steps.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["2", "4"]);
}

#[test]
fn test_trailing_bodiless_step_is_dropped() {
    let steps = parse_script("-- @step id:1 name:a\nSELECT 1;\n-- @step id:2 name:b\n");
    assert_eq!(steps.len(), 1);
}

#[test]
fn test_body_keeps_blank_lines_and_comments() {
    let script = "-- @step id:1 name:a\n\
                  -- plain comment\n\
                  CREATE TABLE a (id INT);\n\
                  \n\
                  CREATE TABLE b (id INT);\n";
    let steps = parse_script(script);
    assert_eq!(
        steps[0].sql,
        "-- plain comment\nCREATE TABLE a (id INT);\n\nCREATE TABLE b (id INT);"
    );
}

#[test]
fn test_header_without_name_is_body_text() {
    let script = "-- @step id:1 name:a\nSELECT 1;\n-- @step id:2\nSELECT 2;";
    let steps = parse_script(script);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].sql, "SELECT 1;\n-- @step id:2\nSELECT 2;");
}

#[test]
fn test_empty_script() {
    assert!(parse_script("").is_empty());
    assert!(parse_script("SELECT 1;\n").is_empty());
}

#[tokio::test]
async fn test_async_parser_matches_sync_parser() {
    let script = "-- @step id:001 name:t\n-- @check SELECT false\nCREATE TABLE t(id int);\n\
                  -- @step id:skip name:nothing\n\
                  -- @step id:002 name:i\nCREATE INDEX ix ON t(id);";
    assert_eq!(parse_async(script).await, parse_script(script));
    assert_eq!(parse_async(script).await.len(), 2);
}

#[tokio::test]
async fn test_next_step_returns_none_after_end() {
    let lines = StringSource::new("-- @step id:1 name:a\nSELECT 1;")
        .lines()
        .await
        .unwrap();
    let mut parser = StepParser::new(lines);
    assert!(parser.next_step().await.is_some());
    assert!(parser.next_step().await.is_none());
    assert!(parser.next_step().await.is_none());
}

#[tokio::test]
async fn test_read_error_is_reported_once() {
    let lines: Vec<io::Result<String>> = vec![
        Ok("-- @step id:1 name:a".to_string()),
        Ok("SELECT 1;".to_string()),
        Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")),
        Ok("SELECT 2;".to_string()),
    ];
    let mut parser =
        StepParser::new(Box::pin(futures::stream::iter(lines))).with_source_name("broken.sql");

    match parser.next_step().await {
        Some(Err(CoreError::SourceIo { path, .. })) => assert_eq!(path, "broken.sql"),
        other => panic!("expected SourceIo, got {:?}", other),
    }
    assert!(parser.next_step().await.is_none());
}
