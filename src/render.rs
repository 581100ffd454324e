use std::fmt::Write as _;
use std::path::Path;

use colored::Colorize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::analysis::RiskLevel;
use crate::pipeline::ReviewOutcome;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write report file: {0}")]
    FileWrite(#[from] std::io::Error),
}

/// Print the review to the terminal, or write it as markdown when an output
/// path is given.
#[instrument(skip(outcome), fields(findings = outcome.review.total_findings()))]
pub fn output(outcome: &ReviewOutcome, output_path: Option<&Path>) -> Result<(), RenderError> {
    match output_path {
        None => {
            debug!("writing review to terminal");
            print_terminal(outcome);
            Ok(())
        }
        Some(path) => {
            debug!(path = %path.display(), "writing review to file");
            std::fs::write(path, to_markdown(outcome))?;
            Ok(())
        }
    }
}

fn print_terminal(outcome: &ReviewOutcome) {
    let context = &outcome.context;
    println!();
    println!("PR: \"{}\"", context.title.bold());
    println!(
        "Author: {} | Files: {}/{} | Commits: {}",
        context.author,
        context.included_files.len(),
        context.total_file_count,
        context.commits.len()
    );
    println!("{}", context.html_url.dimmed());
    println!();

    for detail in &outcome.jira_details {
        if detail.fetch_failed {
            println!(
                "🎫 {} — {} ({})",
                detail.key.bold(),
                "détails non disponibles".yellow(),
                detail.failure_reason.as_deref().unwrap_or("inconnu")
            );
        } else {
            println!("🎫 {} — {} [{}]", detail.key.bold(), detail.summary, detail.status);
            if let Some(assignee) = &detail.assignee {
                println!("   Assigné à: {assignee}");
            }
        }
        println!("   {}", detail.url.dimmed());
    }
    if !outcome.jira_details.is_empty() {
        println!();
    }

    if !outcome.breaking.indicators.is_empty() {
        println!(
            "═══ Breaking changes: {} ═══",
            colorize_risk(outcome.breaking.risk_level)
        );
        for indicator in &outcome.breaking.indicators {
            println!(
                "  • [{}] {} — {}",
                indicator.kind.as_str(),
                indicator.source,
                indicator.detail
            );
        }
        println!();
    }

    for (category, findings) in outcome.review.sections() {
        if findings.is_empty() {
            println!("✅ {}", category.label().green().bold());
            println!("   {}", "Rien à signaler".green());
        } else {
            println!("⚠️  {}", category.label().red().bold());
            for finding in findings {
                println!("   • {finding}");
            }
        }
        println!();
    }
}

fn to_markdown(outcome: &ReviewOutcome) -> String {
    let context = &outcome.context;
    let mut md = String::new();

    let _ = writeln!(md, "# Code review: {}\n", context.title);
    let _ = writeln!(
        md,
        "**Author:** {} | **Files:** {}/{} | **Commits:** {}\n",
        context.author,
        context.included_files.len(),
        context.total_file_count,
        context.commits.len()
    );
    let _ = writeln!(md, "{}\n", context.html_url);

    if !outcome.jira_details.is_empty() {
        md.push_str("## Tickets Jira\n\n");
        for detail in &outcome.jira_details {
            if detail.fetch_failed {
                let _ = writeln!(
                    md,
                    "- [{}]({}) — détails non disponibles ({})",
                    detail.key,
                    detail.url,
                    detail.failure_reason.as_deref().unwrap_or("inconnu")
                );
            } else {
                let _ = writeln!(
                    md,
                    "- [{}]({}) — {} [{}]",
                    detail.key, detail.url, detail.summary, detail.status
                );
            }
        }
        md.push('\n');
    }

    if !outcome.breaking.indicators.is_empty() {
        let _ = writeln!(
            md,
            "## Breaking changes ({})\n",
            outcome.breaking.risk_level
        );
        for indicator in &outcome.breaking.indicators {
            let _ = writeln!(
                md,
                "- `{}` {} — {}",
                indicator.kind.as_str(),
                indicator.source,
                indicator.detail
            );
        }
        md.push('\n');
    }

    for (category, findings) in outcome.review.sections() {
        let _ = writeln!(md, "## {}\n", category.label());
        if findings.is_empty() {
            md.push_str("Rien à signaler\n\n");
        } else {
            for finding in findings {
                let _ = writeln!(md, "- {finding}");
            }
            md.push('\n');
        }
    }

    md
}

fn colorize_risk(level: RiskLevel) -> colored::ColoredString {
    match level {
        RiskLevel::High => "HIGH".red().bold(),
        RiskLevel::Medium => "MEDIUM".yellow().bold(),
        RiskLevel::Low => "LOW".green().bold(),
    }
}
