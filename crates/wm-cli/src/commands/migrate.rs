//! Migrate command implementation

use anyhow::{Context, Result};
use wm_core::{MigrationOptions, MigrationSource};
use wm_db::DatabaseCore;
use wm_migrate::{CancellationToken, MigrateError, MigrationResult, MigrationRunner, StepResult};

use crate::cli::{GlobalArgs, MigrateArgs, OutputFormat};
use crate::commands::common::{self, ExitCode};

/// Execute the migrate command
pub async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = common::load_project(global)?;
    let options = apply_overrides(project.config.migration.clone(), args);
    options.validate().context("Invalid migration options")?;

    let source = project.source(global);
    let db = common::open_database(&project).await?;

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted, stopping after the current statement...");
                token.cancel();
            }
        })
    };

    if args.output == OutputFormat::Table {
        println!("Migrating {} ({})", source.describe(), db.db_type());
    }

    let outcome = MigrationRunner::new(db.as_ref(), options)
        .with_cancellation(token)
        .run(&source)
        .await;
    ctrl_c.abort();

    let result = match outcome {
        Ok(result) => result,
        Err(MigrateError::Cancelled) => {
            eprintln!("Migration cancelled");
            return Err(ExitCode(130).into());
        }
        Err(e) => return Err(e).context("Migration run failed"),
    };

    match args.output {
        OutputFormat::Table => print_result(&result),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if !result.is_success() {
        return Err(ExitCode(1).into());
    }
    Ok(())
}

fn apply_overrides(mut options: MigrationOptions, args: &MigrateArgs) -> MigrationOptions {
    if let Some(policy) = args.drift_policy {
        options.drift_policy = policy;
    }
    if args.no_stop_on_error {
        options.stop_on_error = false;
    }
    if let Some(key) = &args.lock_key {
        options.lock_key = key.clone();
    }
    if let Some(secs) = args.statement_timeout {
        options.statement_timeout_secs = secs;
    }
    options
}

fn step_status(result: &StepResult) -> &'static str {
    match (result.success, result.skipped, result.drift_detected) {
        (false, _, _) => "failed",
        (true, true, true) => "drift-skipped",
        (true, true, false) => "skipped",
        (true, false, true) => "reapplied",
        (true, false, false) => "applied",
    }
}

fn print_result(result: &MigrationResult) {
    println!();
    for step in &result.results {
        println!(
            "  {:<14} {} {} ({}ms)",
            step_status(step),
            step.step_id,
            step.step_name,
            step.duration_ms
        );
        if let Some(message) = &step.message {
            println!("                 {}", message);
        }
    }

    println!();
    println!(
        "{} applied, {} skipped, {} failed, {} with drift in {}ms",
        result.steps_applied,
        result.steps_skipped,
        result.steps_failed,
        result.steps_with_drift,
        result.total_duration_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use std::time::Duration;
    use wm_core::{DriftPolicy, MigrationStep, StepId};

    fn args() -> MigrateArgs {
        MigrateArgs {
            drift_policy: None,
            no_stop_on_error: false,
            lock_key: None,
            statement_timeout: None,
            output: OutputFormat::Table,
        }
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let options = MigrationOptions {
            drift_policy: DriftPolicy::Fail,
            ..MigrationOptions::default()
        };
        assert_eq!(apply_overrides(options.clone(), &args()), options);
    }

    #[test]
    fn test_overrides_win() {
        let args = MigrateArgs {
            drift_policy: Some(DriftPolicy::Reapply),
            no_stop_on_error: true,
            lock_key: Some("ci".to_string()),
            statement_timeout: Some(5),
            ..args()
        };
        let options = apply_overrides(MigrationOptions::default(), &args);
        assert_eq!(options.drift_policy, DriftPolicy::Reapply);
        assert!(!options.stop_on_error);
        assert_eq!(options.lock_key, "ci");
        assert_eq!(options.statement_timeout_secs, 5);
    }

    #[test]
    fn test_step_status_labels() {
        let step = MigrationStep {
            id: StepId::try_new("001").unwrap(),
            name: "n".to_string(),
            check_sql: None,
            sql: "SELECT 1".to_string(),
        };
        let applied = StepResult::applied(&step, "c", Duration::ZERO);
        assert_eq!(step_status(&applied), "applied");
        assert_eq!(step_status(&applied.clone().with_drift()), "reapplied");
        let skipped = StepResult::skipped(&step, "c", Duration::ZERO);
        assert_eq!(step_status(&skipped.clone().with_drift()), "drift-skipped");
        assert_eq!(step_status(&skipped), "skipped");
        let failed = StepResult::failed(&step, "c", Duration::ZERO, "x");
        assert_eq!(step_status(&failed), "failed");
    }
}
