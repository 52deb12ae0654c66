//! Diff display

use colored::Colorize;
use declarative::{DiffSummary, ResourceDiff, ResourceState, group_by_type};

/// Heading for a group of diffs
pub fn type_title(resource_type: &str) -> &str {
    match resource_type {
        "postgres_database" => "Databases (PostgreSQL)",
        "postgres_role" => "Roles (PostgreSQL)",
        "poudriere_jail" => "Jails (poudriere)",
        other => other,
    }
}

/// Short description of the move from current to desired state
pub fn state_change(diff: &ResourceDiff) -> String {
    match (&diff.current, &diff.desired) {
        (ResourceState::Absent, ResourceState::Present { .. }) => "(will create)".to_string(),
        (ResourceState::Present { details }, ResourceState::Absent) => match details {
            Some(details) => format!("(will remove, {details})"),
            None => "(will remove)".to_string(),
        },
        _ => String::new(),
    }
}

/// Display a list of diffs grouped by resource type
pub fn display_diff(diffs: &[ResourceDiff]) {
    if diffs.is_empty() {
        println!();
        println!("  {} No changes needed", "✓".green());
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Planned Changes".bold()
    );
    println!("│");

    for (resource_type, type_diffs) in group_by_type(diffs) {
        println!("│ {}", type_title(&resource_type).bold());
        for diff in type_diffs {
            let symbol = if diff.is_addition() {
                "+".green()
            } else if diff.is_removal() {
                "-".red()
            } else {
                "?".dimmed()
            };
            println!(
                "│   {} {:<30} {}",
                symbol,
                diff.resource_id,
                state_change(diff).dimmed()
            );
        }
        println!("│");
    }

    let summary = DiffSummary::from_diffs(diffs);
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} to create, {} to remove)",
        summary.total().to_string().bold(),
        summary.additions.to_string().green(),
        summary.removals.to_string().red()
    );
    println!("└─────────────────────────────────────────────────────┘");
}
