use once_cell::sync::Lazy;
use regex::Regex;

use crate::github::{CommitSummary, FileChange};

// Heuristic thresholds. Tunable constants, not physical law.
const MAJOR_DELETION_RATIO: usize = 2;
const MAJOR_DELETION_FLOOR: usize = 10;
const MEDIUM_RISK_MAX_INDICATORS: usize = 2;

/// Commit-message markers that conventionally flag a breaking change.
const COMMIT_MARKERS: &[&str] = &["breaking change", "breaking", "break:", "!:"];

/// Filename substrings whose modification tends to ripple to consumers.
const CRITICAL_PATH_PATTERNS: &[&str] = &[
    "package.json",
    "composer.json",
    "requirements.txt",
    "Dockerfile",
    "docker-compose.yml",
    ".env.example",
    "schema.sql",
    "migration",
    "upgrade",
];

/// Title/description keywords hinting at compatibility impact.
const TEXT_KEYWORDS: &[&str] = &[
    "breaking change",
    "breaking",
    "incompatible",
    "migration required",
    "deprecated",
    "removed",
];

/// Diff patterns touching a public API surface: exported declarations and
/// route registrations across the stacks this tool reviews.
static API_SURFACE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        (
            "public function",
            r"(?m)^\+.*\bpublic\s+(?:static\s+)?function\s+\w+",
        ),
        ("public class", r"(?m)^\+.*\bpublic\s+(?:abstract\s+)?class\s+\w+"),
        ("exported function", r"(?m)^\+\s*export\s+(?:default\s+)?(?:async\s+)?function\b"),
        ("exported symbol", r"(?m)^\+\s*export\s+(?:const|class|interface|type|enum)\b"),
        ("interface declaration", r"(?m)^\+.*\binterface\s+\w+\s*\{"),
        ("pub item", r"(?m)^\+\s*pub\s+(?:async\s+)?(?:fn|struct|enum|trait)\s+\w+"),
        (
            "route declaration",
            r#"(?m)^\+.*(?:Route::|router\.|app\.)(?:get|post|put|patch|delete)\s*\("#,
        ),
    ]
    .into_iter()
    .map(|(label, pattern)| (label, Regex::new(pattern).expect("api surface pattern")))
    .collect()
});

/// Likelihood bucket for a PR breaking its consumers. A pure function of the
/// indicator count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "LOW"),
            RiskLevel::Medium => write!(f, "MEDIUM"),
            RiskLevel::High => write!(f, "HIGH"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorKind {
    CommitMessage,
    MajorDeletions,
    CriticalFile,
    ApiChange,
    Keyword,
}

impl IndicatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::CommitMessage => "commit_message",
            IndicatorKind::MajorDeletions => "major_deletions",
            IndicatorKind::CriticalFile => "critical_file",
            IndicatorKind::ApiChange => "api_change",
            IndicatorKind::Keyword => "keyword",
        }
    }
}

/// One triggered heuristic: what fired, where, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub kind: IndicatorKind,
    pub source: String,
    pub detail: String,
}

#[derive(Debug, Clone)]
pub struct BreakingChangeReport {
    pub indicators: Vec<Indicator>,
    pub risk_level: RiskLevel,
}

/// Score a PR for likely breaking changes. Deterministic; indicator order is
/// commit scan, then per-file scan, then title/description keyword scan.
pub fn analyze(
    files: &[FileChange],
    commits: &[CommitSummary],
    title: &str,
    description: &str,
) -> BreakingChangeReport {
    let mut indicators = Vec::new();

    for commit in commits {
        let message = commit.message.to_lowercase();
        if COMMIT_MARKERS.iter().any(|m| message.contains(m)) {
            indicators.push(Indicator {
                kind: IndicatorKind::CommitMessage,
                source: commit.short_hash.clone(),
                detail: first_line(&commit.message).to_string(),
            });
        }
    }

    for file in files {
        if file.deletions > file.additions * MAJOR_DELETION_RATIO
            && file.deletions > MAJOR_DELETION_FLOOR
        {
            indicators.push(Indicator {
                kind: IndicatorKind::MajorDeletions,
                source: file.path.clone(),
                detail: format!("+{} / -{}", file.additions, file.deletions),
            });
        }

        if let Some(pattern) = CRITICAL_PATH_PATTERNS
            .iter()
            .find(|p| file.path.contains(*p))
        {
            indicators.push(Indicator {
                kind: IndicatorKind::CriticalFile,
                source: file.path.clone(),
                detail: (*pattern).to_string(),
            });
        }

        for (label, pattern) in API_SURFACE_PATTERNS.iter() {
            if pattern.is_match(&file.patch) {
                indicators.push(Indicator {
                    kind: IndicatorKind::ApiChange,
                    source: file.path.clone(),
                    detail: (*label).to_string(),
                });
            }
        }
    }

    let text = format!("{title} {description}").to_lowercase();
    for keyword in TEXT_KEYWORDS {
        if text.contains(keyword) {
            indicators.push(Indicator {
                kind: IndicatorKind::Keyword,
                source: "title/description".to_string(),
                detail: (*keyword).to_string(),
            });
        }
    }

    let risk_level = risk_from_count(indicators.len());
    BreakingChangeReport {
        indicators,
        risk_level,
    }
}

fn risk_from_count(count: usize) -> RiskLevel {
    if count == 0 {
        RiskLevel::Low
    } else if count <= MEDIUM_RISK_MAX_INDICATORS {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}
