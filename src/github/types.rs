use serde::Deserialize;

/// Parsed components of a GitHub PR URL.
#[derive(Debug, Clone)]
pub struct PrUrl {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PrUrl {
    /// Cache/log key for one pull request.
    pub fn slug(&self) -> String {
        format!("{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// What happened to a file in the PR. GitHub's extra statuses (renamed,
/// copied, changed) are folded into `Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeStatus {
    Added,
    Modified,
    Removed,
}

impl ChangeStatus {
    pub fn from_api(status: &str) -> Self {
        match status {
            "added" => ChangeStatus::Added,
            "removed" => ChangeStatus::Removed,
            _ => ChangeStatus::Modified,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Removed => "removed",
        }
    }
}

/// One file retained for review: always carries a non-empty unified diff.
#[derive(Debug, Clone)]
pub struct FileChange {
    pub path: String,
    pub status: ChangeStatus,
    pub additions: usize,
    pub deletions: usize,
    /// Unified diff text from GitHub's `/files` endpoint.
    pub patch: String,
    /// Derived from the file extension; "text" for unknown extensions.
    pub language: &'static str,
}

#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub short_hash: String,
    pub message: String,
    pub author_name: String,
    pub author_date: String,
}

/// Immutable snapshot of a pull request, built once per review invocation.
#[derive(Debug, Clone)]
pub struct PullRequestContext {
    pub title: String,
    pub description: String,
    pub source_branch: String,
    pub target_branch: String,
    pub is_draft: bool,
    pub author: String,
    pub created_at: String,
    pub updated_at: String,
    pub html_url: String,
    /// File count before filtering and truncation.
    pub total_file_count: usize,
    /// Filtered and capped; GitHub ordering preserved.
    pub included_files: Vec<FileChange>,
    /// Empty when the commits endpoint fails (non-fatal).
    pub commits: Vec<CommitSummary>,
}

// Wire types for the GitHub REST API. Kept separate from the domain structs
// above so optional and missing fields stay explicit.

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPullRequest {
    pub title: String,
    pub body: Option<String>,
    #[serde(default)]
    pub draft: bool,
    pub user: ApiUser,
    pub head: ApiBranchRef,
    pub base: ApiBranchRef,
    pub created_at: String,
    pub updated_at: String,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiUser {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiBranchRef {
    #[serde(rename = "ref")]
    pub branch: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiFile {
    pub filename: String,
    pub status: String,
    pub additions: usize,
    pub deletions: usize,
    /// Absent for binary files and very large diffs.
    pub patch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommit {
    pub sha: String,
    pub commit: ApiCommitDetail,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommitDetail {
    pub message: String,
    pub author: Option<ApiCommitAuthor>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiCommitAuthor {
    pub name: String,
    pub date: String,
}
