use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::analysis::{breaking, patterns, BreakingChangeReport, CodePatternSummary};
use crate::cache::TtlCache;
use crate::config::{Config, ConfigError};
use crate::github::{self, GitHubError, PrUrl, PullRequestContext};
use crate::jira::{self, ExtractedReferences, JiraTicketDetail};
use crate::net::rate_limit::RateLimiter;
use crate::net::HttpClient;
use crate::review::{parse_review, CompletionApi, ReviewApiError, ReviewResult};

/// Local pre-flight budgets, checked before any network call.
const GITHUB_CHANNEL: &str = "github";
const GITHUB_LIMIT: usize = 30;
const CLAUDE_CHANNEL: &str = "claude";
const CLAUDE_LIMIT: usize = 5;
const RATE_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("local rate limit reached for '{channel}': try again shortly")]
    RateLimited { channel: &'static str },

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    ReviewApi(#[from] ReviewApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("review pipeline failure: {0}")]
    Internal(String),
}

/// Everything the renderer needs: the parsed review plus the context it was
/// produced from. Cached as a unit for the freshness window.
#[derive(Debug, Clone)]
pub struct ReviewOutcome {
    pub context: PullRequestContext,
    pub jira_details: Vec<JiraTicketDetail>,
    pub breaking: BreakingChangeReport,
    pub patterns: CodePatternSummary,
    pub review: ReviewResult,
}

/// Top-level orchestrator. Owns all process-wide mutable state (rate limiter,
/// response cache) explicitly — constructed once per process, passed around,
/// never a global.
pub struct ReviewPipeline<A: CompletionApi> {
    config: Config,
    http: HttpClient,
    limiter: RateLimiter,
    cache: TtlCache<ReviewOutcome>,
    backend: A,
}

impl<A: CompletionApi> ReviewPipeline<A> {
    pub fn new(config: Config, http: HttpClient, backend: A) -> Self {
        Self {
            config,
            http,
            limiter: RateLimiter::new(),
            cache: TtlCache::default(),
            backend,
        }
    }

    /// Run one full review: fetch, enrich, prompt, call, parse.
    #[instrument(skip(self), fields(pr = %pr_url.slug()))]
    pub async fn run(&self, pr_url: &PrUrl) -> Result<ReviewOutcome, PipelineError> {
        let cache_key = pr_url.slug();
        if let Some(cached) = self.cache.get(&cache_key) {
            info!("serving review from cache");
            return Ok(cached);
        }

        if !self
            .limiter
            .try_acquire(GITHUB_CHANNEL, GITHUB_LIMIT, RATE_WINDOW)
        {
            return Err(PipelineError::RateLimited {
                channel: GITHUB_CHANNEL,
            });
        }

        info!("fetching pull request context");
        let context = github::fetch_pull_request_context(
            &self.http,
            pr_url,
            self.config.github_token(),
            self.config.max_files(),
        )
        .await?;
        debug!(
            files = context.included_files.len(),
            commits = context.commits.len(),
            "context fetched"
        );

        let references = jira::extract_references(
            &context.title,
            &context.description,
            &context.commits,
        );
        let jira_details = self.gather_jira_details(&references).await;

        let outcome = self.review_context(context, references, jira_details).await?;
        self.cache.insert(cache_key, outcome.clone());
        Ok(outcome)
    }

    /// Ticket-detail lookups degrade to an empty or failure-marked list;
    /// they never abort the review.
    async fn gather_jira_details(
        &self,
        references: &ExtractedReferences,
    ) -> Vec<JiraTicketDetail> {
        // The base URL may come from config or be inferred from the first
        // browse link seen in the description.
        let mut jira_config = self.config.jira.clone();
        if jira_config.base_url.is_none() {
            jira_config.base_url = references.inferred_base_url.clone();
        }
        if references.is_empty() || !jira_config.is_usable() {
            return Vec::new();
        }

        let details = jira::fetch_details(&self.http, &jira_config, &references.references).await;
        for detail in details.iter().filter(|d| d.fetch_failed) {
            warn!(
                key = %detail.key,
                reason = detail.failure_reason.as_deref().unwrap_or("unknown"),
                "jira detail lookup degraded"
            );
        }
        details
    }

    /// Analysis, prompt assembly, model call, and parse — everything after
    /// the network fetches. Split out so tests can exercise the pipeline
    /// with a hand-built context and a stub backend.
    async fn review_context(
        &self,
        context: PullRequestContext,
        references: ExtractedReferences,
        jira_details: Vec<JiraTicketDetail>,
    ) -> Result<ReviewOutcome, PipelineError> {
        let breaking_report = breaking::analyze(
            &context.included_files,
            &context.commits,
            &context.title,
            &context.description,
        );
        let pattern_summary = patterns::analyze(&context.included_files);
        debug!(
            indicators = breaking_report.indicators.len(),
            risk = %breaking_report.risk_level,
            "analysis complete"
        );

        let prompt = crate::review::prompt::build_prompt(
            &context,
            &references,
            &jira_details,
            &pattern_summary,
            &breaking_report,
        );

        if !self
            .limiter
            .try_acquire(CLAUDE_CHANNEL, CLAUDE_LIMIT, RATE_WINDOW)
        {
            return Err(PipelineError::RateLimited {
                channel: CLAUDE_CHANNEL,
            });
        }

        info!(model = self.config.model(), "requesting review from model");
        let review_text = self
            .backend
            .request_review(&prompt, self.config.model())
            .await?;

        if !crate::review::parser::has_recognized_sections(&review_text) {
            return Err(PipelineError::Internal(
                "model reply did not follow the expected section format".to_string(),
            ));
        }
        let review = parse_review(&review_text);
        info!(findings = review.total_findings(), "review parsed");

        Ok(ReviewOutcome {
            context,
            jira_details,
            breaking: breaking_report,
            patterns: pattern_summary,
            review,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::tests::{test_commit, test_file};
    use crate::review::Category;
    use async_trait::async_trait;

    struct StubBackend {
        reply: String,
    }

    #[async_trait]
    impl CompletionApi for StubBackend {
        async fn request_review(
            &self,
            _prompt: &str,
            _model: &str,
        ) -> Result<String, ReviewApiError> {
            Ok(self.reply.clone())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl CompletionApi for FailingBackend {
        async fn request_review(
            &self,
            _prompt: &str,
            _model: &str,
        ) -> Result<String, ReviewApiError> {
            Err(ReviewApiError::Auth)
        }
    }

    fn sample_context() -> PullRequestContext {
        PullRequestContext {
            title: "🎉 [ABC-123] Add login".to_string(),
            description: "See https://jira.example.com/browse/ABC-123".to_string(),
            source_branch: "feature/login".to_string(),
            target_branch: "main".to_string(),
            is_draft: false,
            author: "alice".to_string(),
            created_at: "2026-08-01T10:00:00Z".to_string(),
            updated_at: "2026-08-02T10:00:00Z".to_string(),
            html_url: "https://github.com/org/repo/pull/42".to_string(),
            total_file_count: 2,
            included_files: vec![test_file("src/login.ts", 12, 1, "+const x = 1;")],
            commits: vec![test_commit("fix: breaking change to auth")],
        }
    }

    fn references_for(context: &PullRequestContext) -> ExtractedReferences {
        jira::extract_references(&context.title, &context.description, &context.commits)
    }

    fn pipeline_with(reply: &str) -> ReviewPipeline<StubBackend> {
        ReviewPipeline::new(
            Config::default(),
            HttpClient::new().unwrap(),
            StubBackend {
                reply: reply.to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_review_completes_with_failed_jira_detail() {
        let pipeline = pipeline_with("Tests:\n- cas d'erreur manquant");
        let failed_detail = JiraTicketDetail {
            key: "ABC-123".to_string(),
            summary: String::new(),
            description: String::new(),
            status: String::new(),
            assignee: None,
            priority: None,
            url: "https://jira.example.com/browse/ABC-123".to_string(),
            fetch_failed: true,
            failure_reason: Some("auth_required".to_string()),
        };

        let context = sample_context();
        let references = references_for(&context);
        let outcome = pipeline
            .review_context(context, references, vec![failed_detail])
            .await
            .unwrap();

        assert_eq!(outcome.jira_details.len(), 1);
        assert!(outcome.jira_details[0].fetch_failed);
        assert_eq!(
            outcome.jira_details[0].failure_reason.as_deref(),
            Some("auth_required")
        );
        assert_eq!(outcome.review.findings_for(Category::Tests).len(), 1);
    }

    #[tokio::test]
    async fn test_breaking_commit_yields_medium_risk_outcome() {
        let pipeline = pipeline_with("Qualité:\nRien à signaler");
        let outcome = pipeline
            .review_context(sample_context(), references_for(&sample_context()), vec![])
            .await
            .unwrap();

        let kinds: Vec<_> = outcome
            .breaking
            .indicators
            .iter()
            .map(|i| i.kind.as_str())
            .collect();
        assert_eq!(kinds, vec!["commit_message"]);
        assert_eq!(outcome.breaking.risk_level, crate::analysis::RiskLevel::Medium);
    }

    #[tokio::test]
    async fn test_backend_auth_failure_is_fatal() {
        let pipeline = ReviewPipeline::new(
            Config::default(),
            HttpClient::new().unwrap(),
            FailingBackend,
        );
        let err = pipeline
            .review_context(sample_context(), references_for(&sample_context()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ReviewApi(ReviewApiError::Auth)
        ));
    }

    #[tokio::test]
    async fn test_claude_channel_rate_limit_preflight() {
        let pipeline = pipeline_with("Tests:\nRien à signaler");
        // Exhaust the claude channel budget.
        for _ in 0..CLAUDE_LIMIT {
            assert!(pipeline
                .limiter
                .try_acquire(CLAUDE_CHANNEL, CLAUDE_LIMIT, RATE_WINDOW));
        }
        let err = pipeline
            .review_context(sample_context(), references_for(&sample_context()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::RateLimited { channel: "claude" }
        ));
    }

    #[tokio::test]
    async fn test_unstructured_reply_is_an_internal_error() {
        let pipeline = pipeline_with("je ne peux pas analyser cette PR");
        let err = pipeline
            .review_context(sample_context(), references_for(&sample_context()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Internal(_)));
    }

    #[tokio::test]
    async fn test_pattern_summary_reaches_outcome() {
        let pipeline = pipeline_with("Tests:\nRien à signaler");
        let outcome = pipeline
            .review_context(sample_context(), references_for(&sample_context()), vec![])
            .await
            .unwrap();
        assert_eq!(outcome.patterns.total_changed_lines, 13);
        assert_eq!(
            outcome.patterns.largest_changed_file,
            Some(("src/login.ts".to_string(), 13))
        );
    }
}
