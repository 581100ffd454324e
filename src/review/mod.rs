pub mod client;
pub mod parser;
pub mod prompt;

pub use client::{ClaudeClient, CompletionApi, ReviewApiError};
pub use parser::parse_review;

/// Fixed review categories. The prompt instructs the model to emit one
/// labeled block per category and the parser keys on the same labels, so
/// this enumeration is the contract between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    PullRequest,
    Housekeeping,
    Typing,
    Consistency,
    TicketAlignment,
    Quality,
    Tests,
    BreakingChanges,
    Refactoring,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::PullRequest,
        Category::Housekeeping,
        Category::Typing,
        Category::Consistency,
        Category::TicketAlignment,
        Category::Quality,
        Category::Tests,
        Category::BreakingChanges,
        Category::Refactoring,
    ];

    /// Label as written in the prompt and expected back in the reply.
    pub fn label(&self) -> &'static str {
        match self {
            Category::PullRequest => "Pull Request",
            Category::Housekeeping => "Ménage",
            Category::Typing => "Typage",
            Category::Consistency => "Cohérence",
            Category::TicketAlignment => "Cohérence avec le ticket",
            Category::Quality => "Qualité",
            Category::Tests => "Tests",
            Category::BreakingChanges => "Breaking Changes",
            Category::Refactoring => "Refacto",
        }
    }

    /// Accepted spellings when parsing the model reply.
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Category::PullRequest => &["Pull Request"],
            Category::Housekeeping => &["Ménage"],
            Category::Typing => &["Typage"],
            Category::Consistency => &["Cohérence"],
            Category::TicketAlignment => &["Cohérence avec le ticket"],
            Category::Quality => &["Qualité"],
            Category::Tests => &["Tests"],
            Category::BreakingChanges => &["Breaking Changes"],
            Category::Refactoring => &["Refacto", "Refactoring"],
        }
    }

    fn index(&self) -> usize {
        Category::ALL
            .iter()
            .position(|c| c == self)
            .expect("category in ALL")
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Findings per category, in the category enumeration order. Every category
/// is always present; empty means "Rien à signaler".
#[derive(Debug, Clone)]
pub struct ReviewResult {
    findings: Vec<Vec<String>>,
}

impl ReviewResult {
    pub fn empty() -> Self {
        Self {
            findings: vec![Vec::new(); Category::ALL.len()],
        }
    }

    pub fn push(&mut self, category: Category, finding: String) {
        self.findings[category.index()].push(finding);
    }

    pub fn findings_for(&self, category: Category) -> &[String] {
        &self.findings[category.index()]
    }

    pub fn sections(&self) -> impl Iterator<Item = (Category, &[String])> {
        Category::ALL
            .iter()
            .map(move |c| (*c, self.findings_for(*c)))
    }

    pub fn total_findings(&self) -> usize {
        self.findings.iter().map(Vec::len).sum()
    }
}

impl Default for ReviewResult {
    fn default() -> Self {
        Self::empty()
    }
}
