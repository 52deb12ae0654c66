use anyhow::Result;
use colored::Colorize;
use declarative::{ConfirmCallback, ExecuteSummary, Outcome, ReconcileResult};
use serde::Serialize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Symbol shown in front of a reconcile result
pub fn result_symbol(result: &ReconcileResult) -> colored::ColoredString {
    match result.outcome {
        Outcome::Failed => "✗".red(),
        Outcome::Pending => "~".yellow(),
        Outcome::Succeeded if result.changed => "✓".green(),
        Outcome::Succeeded => "○".dimmed(),
    }
}

/// Print one reconcile result as a single line
pub fn print_result(result: &ReconcileResult) {
    let line = format!("{} {}", result_symbol(result), result.comment);
    if result.outcome == Outcome::Failed {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the totals of an apply run
pub fn print_summary(summary: &ExecuteSummary, dry_run: bool) {
    println!();
    if !summary.is_success() {
        println!("  {} Finished with errors", "⚠".yellow().bold());
    } else if dry_run {
        println!("  {} Dry run, no changes made", "ℹ".blue());
    } else {
        println!("  {} Host converged", "✓".green().bold());
    }

    if summary.changed > 0 {
        println!("    • {} changed", summary.changed);
    }
    if summary.pending > 0 {
        println!("    • {} pending", summary.pending);
    }
    if summary.unchanged > 0 {
        println!("    • {} unchanged", summary.unchanged);
    }
    if summary.skipped > 0 {
        println!("    • {} skipped", summary.skipped);
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}

/// Ask a yes/no question on the terminal
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?;
    Ok(confirmed)
}

/// Confirmation through an interactive prompt, or none with `--yes`
pub struct Prompt {
    pub assume_yes: bool,
}

impl ConfirmCallback for Prompt {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        if self.assume_yes {
            return Ok(true);
        }
        confirm(prompt, true)
    }
}

/// Shorten text for a progress line, keeping the start
pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text.to_string()
    } else if max_len <= 3 {
        "...".to_string()
    } else {
        let kept: String = text.chars().take(max_len - 3).collect();
        format!("{kept}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(outcome: Outcome, changed: bool) -> ReconcileResult {
        ReconcileResult {
            name: "app".into(),
            resource_type: "postgres_database".into(),
            changed,
            outcome,
            comment: String::new(),
        }
    }

    #[test]
    fn test_result_symbol() {
        colored::control::set_override(false);
        assert_eq!(result_symbol(&result(Outcome::Failed, false)).to_string(), "✗");
        assert_eq!(result_symbol(&result(Outcome::Pending, false)).to_string(), "~");
        assert_eq!(result_symbol(&result(Outcome::Succeeded, true)).to_string(), "✓");
        assert_eq!(result_symbol(&result(Outcome::Succeeded, false)).to_string(), "○");
    }

    #[test]
    fn test_prompt_assume_yes() {
        let mut prompt = Prompt { assume_yes: true };
        assert!(prompt.confirm("Apply changes?").unwrap());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("database app (owner bob)", 12), "database ...");
        assert_eq!(truncate("abc", 2), "...");
    }
}
