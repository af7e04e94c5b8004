//! List command implementation

use anyhow::Result;
use serde::Serialize;
use wm_core::{compute_checksum, split_statements, MigrationStep};

use crate::cli::{GlobalArgs, LsArgs, OutputFormat};
use crate::commands::common;

/// One parsed step, as listed
#[derive(Debug, Serialize)]
struct StepInfo {
    id: String,
    name: String,
    has_check: bool,
    statements: usize,
    checksum: String,
}

impl StepInfo {
    fn from_step(step: &MigrationStep) -> Self {
        Self {
            id: step.id.to_string(),
            name: step.name.clone(),
            has_check: step.check_sql.is_some(),
            statements: split_statements(&step.sql).len(),
            checksum: compute_checksum(&step.sql),
        }
    }
}

/// Execute the ls command
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let steps = common::read_steps(&project.source(global)).await?;
    let infos: Vec<StepInfo> = steps.iter().map(StepInfo::from_step).collect();

    match args.output {
        OutputFormat::Table => print_table(&infos),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&infos)?),
    }
    Ok(())
}

fn print_table(infos: &[StepInfo]) {
    if infos.is_empty() {
        println!("No steps found.");
        return;
    }

    let rows: Vec<Vec<String>> = infos
        .iter()
        .map(|info| {
            vec![
                info.id.clone(),
                info.name.clone(),
                if info.has_check { "yes" } else { "-" }.to_string(),
                info.statements.to_string(),
                common::short_checksum(&info.checksum),
            ]
        })
        .collect();
    common::print_table(&["ID", "NAME", "CHECK", "STATEMENTS", "CHECKSUM"], &rows);
    println!();
    println!("{} steps", infos.len());
}
