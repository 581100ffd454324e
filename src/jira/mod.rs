pub mod adf;

use std::time::Duration;

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::JiraConfig;
use crate::github::CommitSummary;
use crate::net::{HttpClient, NetError};
use adf::JiraDescription;

/// Latency guard: never enrich more tickets than this per review.
pub const MAX_DETAIL_FETCHES: usize = 3;
/// Each ticket lookup gets a short budget of its own, separate from the
/// general HTTP timeout.
pub const DETAIL_TIMEOUT: Duration = Duration::from_secs(3);
/// Ticket descriptions are truncated to this many characters for the prompt.
const DESCRIPTION_LIMIT: usize = 500;

static TICKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z]+-\d+)\b").expect("ticket pattern"));
static BROWSE_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"https?://([^/\s]+)/browse/([A-Z]+-\d+)").expect("browse link pattern")
});

/// Where a ticket key was first sighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSource {
    Title,
    Description,
    Commit,
    ExplicitLink,
}

impl ReferenceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceSource::Title => "title",
            ReferenceSource::Description => "description",
            ReferenceSource::Commit => "commit",
            ReferenceSource::ExplicitLink => "explicit_link",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JiraReference {
    pub key: String,
    pub source: ReferenceSource,
}

/// Extraction output: the deduplicated reference set plus the base URL
/// inferred from the first browse link, used when none is configured.
#[derive(Debug, Clone, Default)]
pub struct ExtractedReferences {
    pub references: Vec<JiraReference>,
    pub inferred_base_url: Option<String>,
}

impl ExtractedReferences {
    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// Scan PR title, description, and commit messages for ticket keys, and the
/// description for explicit browse links. Set semantics: one entry per key,
/// first sighting wins; insertion order preserved for display.
pub fn extract_references(
    title: &str,
    description: &str,
    commits: &[CommitSummary],
) -> ExtractedReferences {
    let mut out = ExtractedReferences::default();

    let mut record = |key: &str, source: ReferenceSource, out: &mut ExtractedReferences| {
        if !out.references.iter().any(|r| r.key == key) {
            out.references.push(JiraReference {
                key: key.to_string(),
                source,
            });
        }
    };

    for capture in TICKET_RE.captures_iter(title) {
        record(&capture[1], ReferenceSource::Title, &mut out);
    }
    for capture in TICKET_RE.captures_iter(description) {
        record(&capture[1], ReferenceSource::Description, &mut out);
    }
    for commit in commits {
        for capture in TICKET_RE.captures_iter(&commit.message) {
            record(&capture[1], ReferenceSource::Commit, &mut out);
        }
    }
    for capture in BROWSE_LINK_RE.captures_iter(description) {
        record(&capture[2], ReferenceSource::ExplicitLink, &mut out);
        if out.inferred_base_url.is_none() {
            out.inferred_base_url = Some(format!("https://{}", &capture[1]));
        }
    }

    debug!(
        references = out.references.len(),
        inferred_base = out.inferred_base_url.as_deref().unwrap_or("-"),
        "jira references extracted"
    );
    out
}

/// Ticket detail as presented to the prompt builder and renderer. A failed
/// lookup still yields an entry so the review can degrade to a link-only
/// presentation instead of aborting.
#[derive(Debug, Clone)]
pub struct JiraTicketDetail {
    pub key: String,
    pub summary: String,
    pub description: String,
    pub status: String,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub url: String,
    pub fetch_failed: bool,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Error)]
enum DetailError {
    #[error("auth_required")]
    Auth,

    #[error("http_{0}")]
    Http(u16),

    #[error("unreachable")]
    Net(#[from] NetError),

    #[error("decode")]
    Decode(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ApiIssue {
    key: String,
    fields: ApiIssueFields,
}

#[derive(Debug, Deserialize)]
struct ApiIssueFields {
    summary: Option<String>,
    description: Option<JiraDescription>,
    status: Option<ApiNamed>,
    priority: Option<ApiNamed>,
    assignee: Option<ApiAssignee>,
}

#[derive(Debug, Deserialize)]
struct ApiNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ApiAssignee {
    #[serde(rename = "displayName")]
    display_name: String,
}

/// Fetch details for up to [`MAX_DETAIL_FETCHES`] tickets, concurrently and
/// independently: one ticket's failure never blocks or fails the others.
#[instrument(skip(http, config, references), fields(tickets = references.len().min(MAX_DETAIL_FETCHES)))]
pub async fn fetch_details(
    http: &HttpClient,
    config: &JiraConfig,
    references: &[JiraReference],
) -> Vec<JiraTicketDetail> {
    let (Some(base_url), Some(email), Some(token)) = (
        config.base_url.as_deref(),
        config.email.as_deref(),
        config.api_token.as_deref(),
    ) else {
        return Vec::new();
    };
    let base_url = base_url.trim_end_matches('/');

    let lookups = references
        .iter()
        .take(MAX_DETAIL_FETCHES)
        .map(|reference| fetch_one(http, base_url, email, token, &reference.key));

    join_all(lookups).await
}

async fn fetch_one(
    http: &HttpClient,
    base_url: &str,
    email: &str,
    token: &str,
    key: &str,
) -> JiraTicketDetail {
    let url = format!("{base_url}/browse/{key}");
    match request_issue(http, base_url, email, token, key).await {
        Ok(issue) => {
            debug!(key = %issue.key, "jira ticket fetched");
            JiraTicketDetail {
                key: issue.key,
                summary: issue.fields.summary.unwrap_or_default(),
                description: issue
                    .fields
                    .description
                    .map(|d| truncate(&d.to_plain_text(), DESCRIPTION_LIMIT))
                    .unwrap_or_default(),
                status: issue
                    .fields
                    .status
                    .map(|s| s.name)
                    .unwrap_or_else(|| "Unknown".to_string()),
                assignee: issue.fields.assignee.map(|a| a.display_name),
                priority: issue.fields.priority.map(|p| p.name),
                url,
                fetch_failed: false,
                failure_reason: None,
            }
        }
        Err(err) => {
            warn!(key, reason = %err, "jira ticket fetch failed, degrading to reference only");
            JiraTicketDetail {
                key: key.to_string(),
                summary: String::new(),
                description: String::new(),
                status: String::new(),
                assignee: None,
                priority: None,
                url,
                fetch_failed: true,
                failure_reason: Some(err.to_string()),
            }
        }
    }
}

async fn request_issue(
    http: &HttpClient,
    base_url: &str,
    email: &str,
    token: &str,
    key: &str,
) -> Result<ApiIssue, DetailError> {
    let url = format!(
        "{base_url}/rest/api/3/issue/{key}?fields=summary,description,status,priority,assignee,created,updated"
    );
    let request = http
        .get(&url)
        .timeout(DETAIL_TIMEOUT)
        .basic_auth(email, Some(token))
        .header("Accept", "application/json");

    // Single attempt: retrying with backoff would stretch the per-ticket
    // budget well past DETAIL_TIMEOUT.
    let response = http.execute_once(request).await?;
    if let Some(err) = classify_issue_status(response.status().as_u16()) {
        return Err(err);
    }
    Ok(response.json::<ApiIssue>().await?)
}

/// Map a non-success issue-endpoint status to the failure reason stored on
/// the degraded detail. 401 and 403 both read as a credential problem.
fn classify_issue_status(status: u16) -> Option<DetailError> {
    match status {
        401 | 403 => Some(DetailError::Auth),
        s if !(200..300).contains(&s) => Some(DetailError::Http(s)),
        _ => None,
    }
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let cut: String = text.chars().take(limit).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn commit(message: &str) -> CommitSummary {
        CommitSummary {
            short_hash: "abc1234".to_string(),
            message: message.to_string(),
            author_name: "dev".to_string(),
            author_date: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_same_key_in_three_places_collapses_to_one() {
        let refs = extract_references(
            "[ABC-123] Add login",
            "Implements ABC-123",
            &[commit("ABC-123 wire up session")],
        );
        assert_eq!(refs.references.len(), 1);
        assert_eq!(refs.references[0].key, "ABC-123");
        assert_eq!(refs.references[0].source, ReferenceSource::Title);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let a = extract_references("[ABC-1] x", "ABC-2 and ABC-1", &[]);
        let b = extract_references("[ABC-1] x", "ABC-2 and ABC-1", &[]);
        assert_eq!(a.references, b.references);
        assert_eq!(a.references.len(), 2);
    }

    #[test]
    fn test_browse_link_infers_base_url() {
        let refs = extract_references(
            "Fix checkout",
            "See https://jira.example.com/browse/SHOP-77 for context",
            &[],
        );
        assert_eq!(refs.references.len(), 1);
        assert_eq!(refs.references[0].key, "SHOP-77");
        // First sighting came from the link scan, which runs after text scans
        // miss nothing here: the key only appears inside the URL.
        assert_eq!(refs.references[0].source, ReferenceSource::Description);
        assert_eq!(
            refs.inferred_base_url.as_deref(),
            Some("https://jira.example.com")
        );
    }

    #[test]
    fn test_commit_only_reference() {
        let refs = extract_references("Fix typo", "", &[commit("INTL-9 adjust locale")]);
        assert_eq!(refs.references.len(), 1);
        assert_eq!(refs.references[0].source, ReferenceSource::Commit);
    }

    #[test]
    fn test_lowercase_keys_ignored() {
        let refs = extract_references("abc-123 not a ticket", "", &[]);
        assert!(refs.is_empty());
    }

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("short", 500), "short");
        let long = "x".repeat(600);
        let cut = truncate(&long, 500);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 503);
    }

    #[test]
    fn test_forbidden_status_reads_as_auth_required() {
        let err = classify_issue_status(403).unwrap();
        assert!(matches!(err, DetailError::Auth));
        assert_eq!(err.to_string(), "auth_required");
        assert!(matches!(
            classify_issue_status(401),
            Some(DetailError::Auth)
        ));
    }

    #[test]
    fn test_other_error_statuses_carry_the_code() {
        assert_eq!(classify_issue_status(404).unwrap().to_string(), "http_404");
        assert_eq!(classify_issue_status(500).unwrap().to_string(), "http_500");
        assert!(classify_issue_status(200).is_none());
        assert!(classify_issue_status(204).is_none());
    }

    #[tokio::test]
    async fn test_unreachable_instance_degrades_to_failed_detail() {
        let http = HttpClient::new().unwrap();
        let detail = fetch_one(
            &http,
            "http://jira.invalid",
            "dev@acme.test",
            "tok",
            "ABC-9",
        )
        .await;
        assert!(detail.fetch_failed);
        assert_eq!(detail.failure_reason.as_deref(), Some("unreachable"));
        assert_eq!(detail.url, "http://jira.invalid/browse/ABC-9");
    }

    #[tokio::test]
    async fn test_fetch_details_without_credentials_is_empty() {
        let http = HttpClient::new().unwrap();
        let config = JiraConfig::default();
        let refs = vec![JiraReference {
            key: "ABC-1".to_string(),
            source: ReferenceSource::Title,
        }];
        let details = fetch_details(&http, &config, &refs).await;
        assert!(details.is_empty());
    }
}
