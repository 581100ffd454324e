mod analysis;
mod cache;
mod config;
mod github;
mod jira;
mod net;
mod pipeline;
mod render;
mod review;

use clap::Parser;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// PR Reviewer — sends a GitHub pull request (optionally enriched with Jira
/// ticket context) to a hosted model and prints the structured code review.
#[derive(Parser, Debug)]
#[command(name = "pr-reviewer", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
    pr_url: String,

    /// Optional output file path for a markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Model identifier (overrides config)
    #[arg(long)]
    model: Option<String>,

    /// Maximum number of file diffs sent for review (overrides config)
    #[arg(long)]
    max_files: Option<usize>,

    /// Skip Jira ticket-detail lookups even when configured
    #[arg(long)]
    no_jira: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("parsing PR URL");
    let pr_url = github::parse_pr_url(&cli.pr_url)?;
    debug!(owner = %pr_url.owner, repo = %pr_url.repo, pr = pr_url.number, "parsed PR URL");

    info!("loading configuration");
    let mut config = config::Config::load()?;
    if cli.model.is_some() {
        config.review.model = cli.model;
    }
    if cli.max_files.is_some() {
        config.review.max_files = cli.max_files;
    }
    if cli.no_jira {
        config.jira.enabled = Some(false);
    }

    let api_key = config.api_key()?.to_string();
    let http = net::HttpClient::new()?;
    let backend = review::ClaudeClient::new(http.clone(), api_key);
    let pipeline = pipeline::ReviewPipeline::new(config, http, backend);

    info!("running review pipeline");
    let outcome = pipeline.run(&pr_url).await?;
    info!(
        findings = outcome.review.total_findings(),
        breaking_risk = %outcome.breaking.risk_level,
        "review complete"
    );

    render::output(&outcome, cli.output.as_deref())?;

    Ok(())
}
