//! SQL quoting helpers for the journal's dynamically built statements.
//!
//! Journal statements embed step ids, names, checksums and error text that
//! come from migration scripts and database error messages, so every value
//! goes through one of these helpers.

/// Quote a SQL identifier.
///
/// Wraps the identifier in double quotes and doubles any embedded double
/// quotes, following the SQL standard.
///
/// # Examples
/// ```
/// use wm_core::sql_utils::quote_ident;
/// assert_eq!(quote_ident("wm_migration_journal"), r#""wm_migration_journal""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Build a table reference from an optional schema and a table name.
///
/// # Examples
/// ```
/// use wm_core::sql_utils::table_ref;
/// assert_eq!(table_ref(None, "journal"), r#""journal""#);
/// assert_eq!(table_ref(Some("ops"), "journal"), r#""ops"."journal""#);
/// ```
pub fn table_ref(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", quote_ident(schema), quote_ident(table)),
        None => quote_ident(table),
    }
}

/// Escape a SQL string literal value by doubling single quotes.
///
/// This is for use inside single-quoted SQL string literals, not identifiers.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Render a value as a complete single-quoted SQL string literal.
pub fn string_literal(value: &str) -> String {
    format!("'{}'", escape_sql_string(value))
}

/// Render an optional value as a string literal or `NULL`.
pub fn nullable_literal(value: Option<&str>) -> String {
    value.map_or_else(|| "NULL".to_string(), string_literal)
}
