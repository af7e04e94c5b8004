//! Directive-annotated migration script parser.
//!
//! Scripts are plain SQL with two comment directives:
//!
//! ```text
//! -- @step id:<token> name:<free text>
//! -- @check <single-line boolean SQL>
//! ```
//!
//! Everything after a `@step` header up to the next header is that step's
//! body. Lines before the first header are ignored, and a step whose body is
//! blank is never emitted.

use crate::error::{CoreError, CoreResult};
use crate::source::LineStream;
use crate::step::{MigrationStep, StepId};
use futures::stream::{self, Stream, StreamExt};
use regex::Regex;
use std::sync::OnceLock;

static STEP_HEADER: OnceLock<Regex> = OnceLock::new();
static CHECK_HEADER: OnceLock<Regex> = OnceLock::new();
static DIRECTIVE_LIKE: OnceLock<Regex> = OnceLock::new();

fn step_header() -> &'static Regex {
    STEP_HEADER.get_or_init(|| {
        Regex::new(r"(?i)^\s*--\s*@step\s+id:(\S+)\s+name:(.*)$").expect("valid regex")
    })
}

fn check_header() -> &'static Regex {
    CHECK_HEADER.get_or_init(|| Regex::new(r"(?i)^\s*--\s*@check\s+(.*)$").expect("valid regex"))
}

fn directive_like() -> &'static Regex {
    DIRECTIVE_LIKE.get_or_init(|| Regex::new(r"(?i)^\s*--\s*@(step|check)\b").expect("valid regex"))
}

/// Classification of one script line.
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Step { id: StepId, name: &'a str },
    Check(&'a str),
    Body,
}

fn classify(line: &str) -> Line<'_> {
    if let Some(caps) = step_header().captures(line) {
        let id = caps.get(1).map_or("", |m| m.as_str());
        let name = caps.get(2).map_or("", |m| m.as_str().trim());
        if let Some(id) = StepId::try_new(id) {
            return Line::Step { id, name };
        }
    }
    if let Some(caps) = check_header().captures(line) {
        let sql = caps.get(1).map_or("", |m| m.as_str().trim());
        if !sql.is_empty() {
            return Line::Check(sql);
        }
    }
    if directive_like().is_match(line) {
        log::warn!("Malformed directive treated as SQL body: {}", line.trim());
    }
    Line::Body
}

/// A step whose header has been seen but whose body is still being read.
#[derive(Debug)]
struct PendingStep {
    id: StepId,
    name: String,
    check_sql: Option<String>,
    body: String,
}

impl PendingStep {
    fn finish(self) -> Option<MigrationStep> {
        let sql = self.body.trim();
        if sql.is_empty() {
            log::debug!("Dropping step {} with empty body", self.id);
            return None;
        }
        Some(MigrationStep {
            id: self.id,
            name: self.name,
            check_sql: self.check_sql,
            sql: sql.to_string(),
        })
    }
}

/// Line-at-a-time step assembly shared by the async and sync parsers.
#[derive(Debug, Default)]
struct StepAccumulator {
    current: Option<PendingStep>,
}

impl StepAccumulator {
    /// Feed one line; returns a step when a header closes the previous one.
    fn push_line(&mut self, line: &str) -> Option<MigrationStep> {
        match classify(line) {
            Line::Step { id, name } => {
                let completed = self.current.take().and_then(PendingStep::finish);
                self.current = Some(PendingStep {
                    id,
                    name: name.to_string(),
                    check_sql: None,
                    body: String::new(),
                });
                completed
            }
            Line::Check(sql) => {
                if let Some(current) = self.current.as_mut() {
                    current.check_sql = Some(sql.to_string());
                }
                None
            }
            Line::Body => {
                if let Some(current) = self.current.as_mut() {
                    current.body.push_str(line);
                    current.body.push('\n');
                }
                None
            }
        }
    }

    /// Close the open step at end of input.
    fn finish(&mut self) -> Option<MigrationStep> {
        self.current.take().and_then(PendingStep::finish)
    }
}

/// Pull-based parser turning a [`LineStream`] into [`MigrationStep`]s.
///
/// Makes a single forward pass and suspends only while waiting for the next
/// line. Only the body of the step currently being read is buffered.
pub struct StepParser {
    lines: LineStream,
    source_name: String,
    acc: StepAccumulator,
    done: bool,
}

impl StepParser {
    /// Create a parser over `lines`.
    pub fn new(lines: LineStream) -> Self {
        Self {
            lines,
            source_name: "<inline>".to_string(),
            acc: StepAccumulator::default(),
            done: false,
        }
    }

    /// Name reported in I/O errors.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = name.into();
        self
    }

    /// Read until the next complete step.
    ///
    /// Returns `None` once the input is exhausted. A read failure is
    /// returned once as [`CoreError::SourceIo`] and ends the sequence.
    pub async fn next_step(&mut self) -> Option<CoreResult<MigrationStep>> {
        if self.done {
            return None;
        }
        while let Some(line) = self.lines.next().await {
            match line {
                Ok(line) => {
                    if let Some(step) = self.acc.push_line(&line) {
                        return Some(Ok(step));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(CoreError::SourceIo {
                        path: self.source_name.clone(),
                        source: e,
                    }));
                }
            }
        }
        self.done = true;
        self.acc.finish().map(Ok)
    }

    /// Adapt the parser into a [`Stream`] of steps.
    pub fn into_stream(self) -> impl Stream<Item = CoreResult<MigrationStep>> + Send {
        stream::unfold(self, |mut parser| async move {
            parser.next_step().await.map(|step| (step, parser))
        })
    }
}

/// Parse a whole script held in memory.
pub fn parse_script(script: &str) -> Vec<MigrationStep> {
    let mut acc = StepAccumulator::default();
    let mut steps: Vec<MigrationStep> = script.lines().filter_map(|l| acc.push_line(l)).collect();
    steps.extend(acc.finish());
    steps
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
