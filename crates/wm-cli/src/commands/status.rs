//! Status command implementation

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use wm_core::{compute_checksum, MigrationStep};
use wm_db::DatabaseSchema;
use wm_migrate::{JournalRow, JournalStore};

use crate::cli::{GlobalArgs, OutputFormat, StatusArgs};
use crate::commands::common;

/// Journal state of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum StepState {
    /// No journal row
    Pending,
    /// Journaled as applied with the current checksum
    Applied,
    /// Last attempt failed
    Failed,
    /// Journaled as applied with a different checksum
    Changed,
    /// Journal row with no step in the script
    Orphaned,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepState::Pending => write!(f, "pending"),
            StepState::Applied => write!(f, "applied"),
            StepState::Failed => write!(f, "failed"),
            StepState::Changed => write!(f, "changed"),
            StepState::Orphaned => write!(f, "orphaned"),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusEntry {
    id: String,
    name: String,
    state: StepState,
    applied_at: Option<String>,
    message: Option<String>,
}

/// Execute the status command
pub async fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let steps = common::read_steps(&project.source(global)).await?;
    let db = common::open_database(&project).await?;

    let options = &project.config.migration;
    let journal_exists = db
        .relation_exists(options.journal_schema.as_deref(), &options.journal_table)
        .await
        .context("Failed to look up journal table")?;
    let rows = if journal_exists {
        JournalStore::from_options(db.as_ref(), options)
            .list()
            .await
            .context("Failed to read journal")?
    } else {
        Vec::new()
    };

    let entries = compare(&steps, rows);
    match args.output {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
    }
    Ok(())
}

/// Steps in file order, then orphaned journal rows
fn compare(steps: &[MigrationStep], rows: Vec<JournalRow>) -> Vec<StatusEntry> {
    let mut by_id: HashMap<String, JournalRow> = rows
        .into_iter()
        .map(|row| (row.step_id.clone(), row))
        .collect();
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for step in steps {
        if !seen.insert(step.id.as_str()) {
            continue;
        }
        let entry = match by_id.remove(step.id.as_str()) {
            None => StatusEntry {
                id: step.id.to_string(),
                name: step.name.clone(),
                state: StepState::Pending,
                applied_at: None,
                message: None,
            },
            Some(row) => {
                let state = if !row.success {
                    StepState::Failed
                } else if row.checksum == compute_checksum(&step.sql) {
                    StepState::Applied
                } else {
                    StepState::Changed
                };
                StatusEntry {
                    id: step.id.to_string(),
                    name: step.name.clone(),
                    state,
                    applied_at: Some(row.applied_at),
                    message: row.message,
                }
            }
        };
        entries.push(entry);
    }

    let mut orphaned: Vec<JournalRow> = by_id.into_values().collect();
    orphaned.sort_by(|a, b| a.step_id.cmp(&b.step_id));
    entries.extend(orphaned.into_iter().map(|row| StatusEntry {
        id: row.step_id,
        name: row.step_name,
        state: StepState::Orphaned,
        applied_at: Some(row.applied_at),
        message: row.message,
    }));
    entries
}

fn print_table(entries: &[StatusEntry]) {
    if entries.is_empty() {
        println!("No steps found.");
        return;
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.clone(),
                e.name.clone(),
                e.state.to_string(),
                e.applied_at.clone().unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();
    common::print_table(&["ID", "NAME", "STATE", "LAST ATTEMPT"], &rows);

    let pending = entries
        .iter()
        .filter(|e| matches!(e.state, StepState::Pending | StepState::Failed))
        .count();
    println!();
    println!("{} of {} steps need work", pending, entries.len());
}

#[cfg(test)]
#[path = "status_test.rs"]
mod tests;
