//! Console rendering

use colored::Colorize;

use crate::content::diff::{DiffOp, DiffResult};
use crate::deploy::orchestrator::{Completion, ReconcileOutcome};
use crate::deploy::state::RolloutState;
use crate::store::RolloutDetails;

/// Colorized unified-style diff, or a one-line note when nothing changed
pub fn format_diff(result: &DiffResult) -> String {
    if !result.has_changes {
        return format!("{} {}\n", "No changes:".green().bold(), result.source_name);
    }

    let mut out = String::new();
    out.push_str(&format!("{}\n", format!("--- remote/{}", result.source_name).bold()));
    out.push_str(&format!("{}\n", format!("+++ local/{}", result.source_name).bold()));

    for line in &result.lines {
        let text = format!("{}{}", line.op.prefix(), line.text);
        let rendered = match line.op {
            DiffOp::Insert => text.green().to_string(),
            DiffOp::Delete => text.red().to_string(),
            DiffOp::Context => text,
        };
        out.push_str(&rendered);
        out.push('\n');
    }

    let (insertions, deletions) = result.stats();
    out.push_str(&format!(
        "{} {}, {} {}\n",
        insertions,
        "insertion(s)".green(),
        deletions,
        "deletion(s)".red()
    ));
    out
}

pub fn format_state(state: RolloutState) -> String {
    let name = state.to_string();
    match state {
        RolloutState::Complete => name.green().to_string(),
        RolloutState::RolledBack => name.red().bold().to_string(),
        RolloutState::Baking => name.cyan().to_string(),
        RolloutState::Deploying => name.yellow().to_string(),
    }
}

pub fn format_outcome(outcome: &ReconcileOutcome) -> String {
    let marker = match outcome.completion() {
        Completion::Completed => "✓".green(),
        Completion::PartiallyCompleted => "→".cyan(),
    };

    match outcome {
        ReconcileOutcome::SkippedNoChanges => {
            format!("{} no changes, deployment skipped", marker)
        }
        ReconcileOutcome::Awaited {
            version_id,
            rollout_number,
            state,
            percentage_complete,
        } if outcome.completion() == Completion::Completed => format!(
            "{} version {} rollout #{} reached {} ({:.0}%)",
            marker,
            version_id,
            rollout_number,
            format_state(*state),
            percentage_complete
        ),
        ReconcileOutcome::Awaited {
            version_id,
            rollout_number,
            state,
            percentage_complete,
        } => format!(
            "{} version {} rollout #{} reached {} ({:.0}%); follow it with `cfgdeploy status -d {}`",
            marker,
            version_id,
            rollout_number,
            format_state(*state),
            percentage_complete,
            rollout_number
        ),
        ReconcileOutcome::NotAwaited {
            version_id,
            rollout_number,
        } => format!(
            "{} version {} rollout #{} started; follow it with `cfgdeploy status -d {}`",
            marker,
            version_id,
            rollout_number,
            rollout_number
        ),
    }
}

pub fn format_details(details: &RolloutDetails) -> String {
    let mut lines = vec![
        format!("{:<12} #{}", "Rollout:", details.rollout_number),
        format!("{:<12} {}", "State:", format_state(details.state)),
        format!("{:<12} {:.0}%", "Progress:", details.percentage_complete),
        format!("{:<12} {}", "Version:", details.version_id),
        format!("{:<12} {}", "Strategy:", details.strategy_id),
    ];
    if let Some(description) = &details.description {
        lines.push(format!("{:<12} {}", "Description:", description));
    }
    if let Some(started) = details.started_at {
        lines.push(format!("{:<12} {}", "Started:", started.to_rfc3339()));
    }
    if let Some(completed) = details.completed_at {
        lines.push(format!("{:<12} {}", "Completed:", completed.to_rfc3339()));
    }
    lines.join("\n")
}
