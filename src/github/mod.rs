pub mod types;

pub use types::{ChangeStatus, CommitSummary, FileChange, PrUrl, PullRequestContext};

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::net::HttpClient;
use types::{ApiCommit, ApiFile, ApiPullRequest};

const API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "pr-reviewer/0.1";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("invalid PR URL: {0}")]
    InvalidUrl(String),

    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode GitHub response: {0}")]
    Decode(#[from] reqwest::Error),

    #[error(transparent)]
    Net(#[from] crate::net::NetError),
}

/// Parse a GitHub PR URL into its component parts.
/// Expected format: https://github.com/{owner}/{repo}/pull/{number}
pub fn parse_pr_url(url: &str) -> Result<PrUrl, GitHubError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|_| GitHubError::InvalidUrl(url.to_string()))?;

    if parsed.host_str() != Some("github.com") {
        return Err(GitHubError::InvalidUrl(url.to_string()));
    }

    let segments: Vec<_> = parsed
        .path_segments()
        .ok_or_else(|| GitHubError::InvalidUrl(url.to_string()))?
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() != 4 || segments[2] != "pull" {
        return Err(GitHubError::InvalidUrl(url.to_string()));
    }

    let number = segments[3]
        .parse::<u64>()
        .map_err(|_| GitHubError::InvalidUrl(url.to_string()))?;

    let valid_name =
        |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || "._-".contains(c));
    if !valid_name(segments[0]) || !valid_name(segments[1]) || number == 0 {
        return Err(GitHubError::InvalidUrl(url.to_string()));
    }

    Ok(PrUrl {
        owner: segments[0].to_string(),
        repo: segments[1].to_string(),
        number,
    })
}

/// Fetch PR metadata, the changed-file list, and the commit history, then
/// assemble the filtered snapshot the rest of the pipeline consumes.
/// A commits-endpoint failure degrades to an empty commit list.
#[instrument(skip(http, token), fields(pr = %pr_url.slug()))]
pub async fn fetch_pull_request_context(
    http: &HttpClient,
    pr_url: &PrUrl,
    token: Option<&str>,
    max_files: usize,
) -> Result<PullRequestContext, GitHubError> {
    let base = format!(
        "{API_BASE}/repos/{}/{}/pulls/{}",
        pr_url.owner, pr_url.repo, pr_url.number
    );

    debug!("fetching PR metadata");
    let metadata: ApiPullRequest = get_json(http, &base, token).await?;

    debug!("fetching PR file list");
    let files: Vec<ApiFile> = get_json(http, &format!("{base}/files"), token).await?;
    let total_file_count = files.len();

    debug!("fetching PR commits");
    let commits = match get_json::<Vec<ApiCommit>>(http, &format!("{base}/commits"), token).await {
        Ok(commits) => commits
            .into_iter()
            .map(|c| CommitSummary {
                short_hash: c.sha.chars().take(7).collect(),
                message: c.commit.message,
                author_name: c
                    .commit
                    .author
                    .as_ref()
                    .map(|a| a.name.clone())
                    .unwrap_or_default(),
                author_date: c.commit.author.map(|a| a.date).unwrap_or_default(),
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, "commit fetch failed, continuing without commit history");
            Vec::new()
        }
    };

    let included_files = select_files(files, max_files);

    debug!(
        total = total_file_count,
        included = included_files.len(),
        commits = commits.len(),
        "PR context assembled"
    );

    Ok(PullRequestContext {
        title: metadata.title,
        description: metadata.body.unwrap_or_default(),
        source_branch: metadata.head.branch,
        target_branch: metadata.base.branch,
        is_draft: metadata.draft,
        author: metadata.user.login,
        created_at: metadata.created_at,
        updated_at: metadata.updated_at,
        html_url: metadata.html_url,
        total_file_count,
        included_files,
        commits,
    })
}

/// Reduce the raw file list to reviewable diffs: removed files, entries
/// without a patch, and ignored paths are dropped, then the count is capped.
/// GitHub ordering is preserved.
fn select_files(files: Vec<ApiFile>, max_files: usize) -> Vec<FileChange> {
    files
        .into_iter()
        .filter_map(|file| {
            if ChangeStatus::from_api(&file.status) == ChangeStatus::Removed {
                return None;
            }
            let patch = match file.patch {
                Some(patch) if !patch.is_empty() => patch,
                _ => return None,
            };
            if is_ignored_path(&file.filename) {
                debug!(path = %file.filename, "skipping ignored file");
                return None;
            }
            Some(FileChange {
                language: detect_language(&file.filename),
                status: ChangeStatus::from_api(&file.status),
                path: file.filename,
                additions: file.additions,
                deletions: file.deletions,
                patch,
            })
        })
        .take(max_files)
        .collect()
}

async fn get_json<T: serde::de::DeserializeOwned>(
    http: &HttpClient,
    url: &str,
    token: Option<&str>,
) -> Result<T, GitHubError> {
    let mut request = http
        .get(url)
        .header("Accept", "application/vnd.github.v3+json")
        .header("User-Agent", USER_AGENT);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = http.execute(request).await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GitHubError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<T>().await?)
}

/// Files that never add review value: lockfiles, minified assets, binaries,
/// fonts, vendored and generated trees.
fn is_ignored_path(path: &str) -> bool {
    const IGNORED_FILES: &[&str] = &[
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "Cargo.lock",
        "composer.lock",
        "Gemfile.lock",
        "poetry.lock",
    ];
    const IGNORED_SUFFIXES: &[&str] = &[
        ".min.js", ".min.css", ".map", ".png", ".jpg", ".jpeg", ".gif", ".ico", ".webp", ".svg",
        ".woff", ".woff2", ".ttf", ".eot", ".otf", ".pdf", ".zip", ".gz", ".jar", ".class",
        ".exe", ".dll", ".so",
    ];
    const IGNORED_DIRS: &[&str] = &["vendor/", "node_modules/", "dist/", "build/", "target/"];

    let filename = path.rsplit('/').next().unwrap_or(path);
    if IGNORED_FILES.contains(&filename) {
        return true;
    }
    let lower = path.to_lowercase();
    if IGNORED_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        return true;
    }
    IGNORED_DIRS
        .iter()
        .any(|d| lower.starts_with(d) || lower.contains(&format!("/{d}")))
        || lower.contains(".generated.")
}

/// Map a filename to a display language for the prompt's fenced code blocks.
pub fn detect_language(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "js" | "jsx" | "mjs" => "javascript",
        "ts" | "tsx" => "typescript",
        "py" => "python",
        "java" => "java",
        "php" => "php",
        "rb" => "ruby",
        "go" => "go",
        "rs" => "rust",
        "cpp" | "cc" | "cxx" => "cpp",
        "c" | "h" => "c",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" | "sass" => "scss",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "md" => "markdown",
        "sh" | "bash" => "bash",
        "sql" => "sql",
        "twig" => "twig",
        _ => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_pr_url() {
        let url = parse_pr_url("https://github.com/org/repo/pull/42").unwrap();
        assert_eq!(url.owner, "org");
        assert_eq!(url.repo, "repo");
        assert_eq!(url.number, 42);
    }

    #[test]
    fn test_parse_invalid_pr_url() {
        assert!(parse_pr_url("https://example.com").is_err());
        assert!(parse_pr_url("not-a-url").is_err());
        assert!(parse_pr_url("https://github.com/org/repo/pulls/42").is_err());
        assert!(parse_pr_url("https://github.com/org/repo/pull/0").is_err());
        assert!(parse_pr_url("https://github.com/or g/repo/pull/1").is_err());
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("src/app.tsx"), "typescript");
        assert_eq!(detect_language("lib/mod.rs"), "rust");
        assert_eq!(detect_language("templates/page.twig"), "twig");
        assert_eq!(detect_language("Makefile"), "text");
        assert_eq!(detect_language("README.md"), "markdown");
    }

    fn api_file(filename: &str, status: &str, patch: Option<&str>) -> ApiFile {
        ApiFile {
            filename: filename.to_string(),
            status: status.to_string(),
            additions: 1,
            deletions: 0,
            patch: patch.map(str::to_string),
        }
    }

    #[test]
    fn test_select_files_drops_removed_patchless_and_ignored() {
        let files = vec![
            api_file("src/kept.rs", "modified", Some("+fn kept() {}")),
            api_file("src/gone.rs", "removed", Some("-fn gone() {}")),
            api_file("assets/logo.png", "modified", None),
            api_file("src/big_binary.rs", "modified", Some("")),
            api_file("package-lock.json", "modified", Some("+lock")),
            api_file("src/new.rs", "added", Some("+fn new() {}")),
        ];
        let included = select_files(files, 10);
        let paths: Vec<_> = included.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["src/kept.rs", "src/new.rs"]);
        assert_eq!(included[0].status, ChangeStatus::Modified);
        assert_eq!(included[1].status, ChangeStatus::Added);
        assert_eq!(included[0].language, "rust");
    }

    #[test]
    fn test_select_files_caps_count_in_order() {
        let files: Vec<_> = (0..12)
            .map(|i| api_file(&format!("src/file_{i:02}.rs"), "modified", Some("+x")))
            .collect();
        let included = select_files(files, 10);
        assert_eq!(included.len(), 10);
        assert_eq!(included[0].path, "src/file_00.rs");
        assert_eq!(included[9].path, "src/file_09.rs");
    }

    #[test]
    fn test_select_files_cap_applies_after_filtering() {
        // The cap counts kept files, not raw entries.
        let mut files = vec![
            api_file("vendor/lib.php", "modified", Some("+v")),
            api_file("old/app.js", "removed", Some("-a")),
        ];
        files.extend((0..3).map(|i| api_file(&format!("src/m{i}.rs"), "modified", Some("+m"))));
        let included = select_files(files, 3);
        assert_eq!(included.len(), 3);
        assert!(included.iter().all(|f| f.path.starts_with("src/")));
    }

    #[test]
    fn test_ignored_paths() {
        assert!(is_ignored_path("package-lock.json"));
        assert!(is_ignored_path("web/yarn.lock"));
        assert!(is_ignored_path("assets/app.min.js"));
        assert!(is_ignored_path("logo.PNG"));
        assert!(is_ignored_path("vendor/autoload.php"));
        assert!(is_ignored_path("web/node_modules/lib/index.js"));
        assert!(is_ignored_path("fonts/icons.woff2"));
        assert!(!is_ignored_path("src/main.rs"));
        assert!(!is_ignored_path("package.json"));
        assert!(!is_ignored_path("docs/build.md"));
    }
}
