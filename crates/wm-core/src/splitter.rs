//! Split a block of SQL text into individually executable statements.
//!
//! A single left-to-right scan tracks which lexical region the cursor is in.
//! Only a `;` seen outside string literals, dollar-quoted bodies and comments
//! ends a statement. Unterminated literals and comments are not an error:
//! the scan simply runs to the end of the input and the remainder becomes
//! the final statement.

/// Lexical region the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode<'a> {
    Normal,
    SingleQuoted,
    /// Holds the full delimiter, e.g. `$$` or `$body$`
    DollarQuoted(&'a str),
    LineComment,
    BlockComment,
}

/// Split `sql` into trimmed statements.
///
/// Empty statements and statements made only of comments are dropped. Text
/// after the last `;` is returned as a trailing statement when it contains
/// anything besides whitespace and comments.
///
/// # Examples
/// ```
/// use wm_core::split_statements;
/// let stmts = split_statements("insert into t values(1);insert into t values(2);");
/// assert_eq!(stmts, vec!["insert into t values(1)", "insert into t values(2)"]);
/// ```
pub fn split_statements(sql: &str) -> Vec<String> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut mode = Mode::Normal;
    let mut start = 0;
    let mut significant = false;
    let mut i = 0;

    while i < bytes.len() {
        match mode {
            Mode::Normal => match bytes[i] {
                b';' => {
                    push_statement(&mut statements, &sql[start..i], significant);
                    start = i + 1;
                    significant = false;
                    i += 1;
                }
                b'\'' => {
                    mode = Mode::SingleQuoted;
                    significant = true;
                    i += 1;
                }
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    mode = Mode::LineComment;
                    i += 2;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    mode = Mode::BlockComment;
                    i += 2;
                }
                b'$' => {
                    significant = true;
                    match dollar_tag_at(sql, i) {
                        Some(delimiter) => {
                            mode = Mode::DollarQuoted(delimiter);
                            i += delimiter.len();
                        }
                        None => i += 1,
                    }
                }
                b if b.is_ascii_whitespace() => i += 1,
                _ => {
                    significant = true;
                    i += 1;
                }
            },
            Mode::SingleQuoted => {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        // '' is an escaped quote inside the literal
                        i += 2;
                    } else {
                        mode = Mode::Normal;
                        i += 1;
                    }
                } else {
                    i += 1;
                }
            }
            Mode::DollarQuoted(delimiter) => match sql[i..].find(delimiter) {
                Some(offset) => {
                    i += offset + delimiter.len();
                    mode = Mode::Normal;
                }
                None => i = bytes.len(),
            },
            Mode::LineComment => {
                if bytes[i] == b'\n' {
                    mode = Mode::Normal;
                }
                i += 1;
            }
            Mode::BlockComment => {
                if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
                    mode = Mode::Normal;
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }

    push_statement(&mut statements, &sql[start..], significant);
    statements
}

fn push_statement(statements: &mut Vec<String>, text: &str, significant: bool) {
    let trimmed = text.trim();
    if significant && !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// Return the dollar-quote delimiter opening at byte `pos`, if any.
///
/// The tag between the two `$` signs is empty or an identifier: a letter or
/// underscore followed by letters, digits and underscores. `$1` is a
/// positional parameter, not a delimiter.
fn dollar_tag_at(sql: &str, pos: usize) -> Option<&str> {
    let bytes = sql.as_bytes();
    let mut end = pos + 1;

    match bytes.get(end) {
        Some(b'$') => return Some(&sql[pos..=end]),
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => end += 1,
        _ => return None,
    }

    while let Some(b) = bytes.get(end) {
        if b.is_ascii_alphanumeric() || *b == b'_' {
            end += 1;
        } else if *b == b'$' {
            return Some(&sql[pos..=end]);
        } else {
            return None;
        }
    }
    None
}

#[cfg(test)]
#[path = "splitter_test.rs"]
mod tests;
