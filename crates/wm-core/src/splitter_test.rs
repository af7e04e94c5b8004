use super::*;

#[test]
fn test_two_plain_statements() {
    let stmts = split_statements("insert into t values(1);insert into t values(2);");
    assert_eq!(
        stmts,
        vec!["insert into t values(1)", "insert into t values(2)"]
    );
}

#[test]
fn test_trailing_statement_without_terminator() {
    let stmts = split_statements("CREATE TABLE a (id INT);\nCREATE INDEX ix ON a(id)\n");
    assert_eq!(stmts, vec!["CREATE TABLE a (id INT)", "CREATE INDEX ix ON a(id)"]);
}

#[test]
fn test_empty_statements_are_dropped() {
    assert!(split_statements("").is_empty());
    assert!(split_statements(" ;; \n ;").is_empty());
    assert_eq!(split_statements(";select 1;;"), vec!["select 1"]);
}

#[test]
fn test_dollar_quoted_body_is_one_statement() {
    let sql = r#"CREATE FUNCTION f() RETURNS int AS $$
BEGIN
    PERFORM 1;
    RETURN 2;
END;
$$ LANGUAGE plpgsql;"#;
    let stmts = split_statements(sql);
    assert_eq!(stmts.len(), 1);
    assert!(stmts[0].starts_with("CREATE FUNCTION f()"));
    assert!(stmts[0].ends_with("LANGUAGE plpgsql"));
}

#[test]
fn test_tagged_dollar_quote_must_match() {
    let sql = "DO $body$ BEGIN RAISE NOTICE '$$;'; END; $body$; SELECT 1;";
    let stmts = split_statements(sql);
    assert_eq!(
        stmts,
        vec![
            "DO $body$ BEGIN RAISE NOTICE '$$;'; END; $body$",
            "SELECT 1"
        ]
    );
}

#[test]
fn test_inner_plain_delimiter_does_not_close_tag() {
    let sql = "SELECT $fn$ a $$ ; b $fn$; SELECT 2";
    assert_eq!(
        split_statements(sql),
        vec!["SELECT $fn$ a $$ ; b $fn$", "SELECT 2"]
    );
}

#[test]
fn test_positional_parameter_is_not_a_tag() {
    let sql = "PREPARE p AS SELECT $1; SELECT 2;";
    assert_eq!(
        split_statements(sql),
        vec!["PREPARE p AS SELECT $1", "SELECT 2"]
    );
}

#[test]
fn test_semicolon_inside_string_literal() {
    let sql = "INSERT INTO t VALUES ('a;b'); INSERT INTO t VALUES ('c')";
    assert_eq!(
        split_statements(sql),
        vec!["INSERT INTO t VALUES ('a;b')", "INSERT INTO t VALUES ('c')"]
    );
}

#[test]
fn test_escaped_quote_does_not_end_literal() {
    let sql = "INSERT INTO t VALUES ('it''s; fine'); SELECT 1;";
    assert_eq!(
        split_statements(sql),
        vec!["INSERT INTO t VALUES ('it''s; fine')", "SELECT 1"]
    );
}

#[test]
fn test_semicolon_in_line_comment() {
    let sql = "SELECT 1 -- not; a split\n; SELECT 2;";
    assert_eq!(
        split_statements(sql),
        vec!["SELECT 1 -- not; a split", "SELECT 2"]
    );
}

#[test]
fn test_semicolon_in_block_comment() {
    let sql = "SELECT /* a; b */ 1; SELECT 2;";
    assert_eq!(split_statements(sql), vec!["SELECT /* a; b */ 1", "SELECT 2"]);
}

#[test]
fn test_block_comments_do_not_nest() {
    let sql = "SELECT /* outer /* inner */ 1; SELECT 2;";
    assert_eq!(
        split_statements(sql),
        vec!["SELECT /* outer /* inner */ 1", "SELECT 2"]
    );
}

#[test]
fn test_comment_only_statements_are_dropped() {
    let sql = "CREATE TABLE a (id INT);\n-- trailing note\n";
    assert_eq!(split_statements(sql), vec!["CREATE TABLE a (id INT)"]);

    let sql = "/* header */;\nSELECT 1;";
    assert_eq!(split_statements(sql), vec!["SELECT 1"]);
}

#[test]
fn test_leading_comment_stays_with_statement() {
    let sql = "-- users table\nCREATE TABLE users (id INT);";
    assert_eq!(
        split_statements(sql),
        vec!["-- users table\nCREATE TABLE users (id INT)"]
    );
}

#[test]
fn test_unterminated_literal_runs_to_end() {
    let sql = "SELECT 1; INSERT INTO t VALUES ('oops; SELECT 2;";
    assert_eq!(
        split_statements(sql),
        vec!["SELECT 1", "INSERT INTO t VALUES ('oops; SELECT 2;"]
    );
}

#[test]
fn test_unterminated_dollar_quote_runs_to_end() {
    let sql = "SELECT 1; DO $$ BEGIN; END;";
    assert_eq!(split_statements(sql), vec!["SELECT 1", "DO $$ BEGIN; END;"]);
}

#[test]
fn test_unterminated_block_comment_runs_to_end() {
    let sql = "SELECT 1; /* never closed; SELECT 2;";
    assert_eq!(split_statements(sql), vec!["SELECT 1"]);
}

#[test]
fn test_non_ascii_content() {
    let sql = "INSERT INTO t VALUES ('héllo; wörld'); SELECT 'ü';";
    assert_eq!(
        split_statements(sql),
        vec!["INSERT INTO t VALUES ('héllo; wörld')", "SELECT 'ü'"]
    );
}

#[test]
fn test_split_is_deterministic() {
    let sql = "CREATE TABLE a (id INT); CREATE TABLE b (id INT);";
    assert_eq!(split_statements(sql), split_statements(sql));
}
