use once_cell::sync::Lazy;

use super::{Category, ReviewResult};

/// Marker the model emits for a category with no findings.
const NOTHING_TO_REPORT: &str = "rien à signaler";

/// (lowercased alias, category), sorted longest alias first so that
/// "Cohérence avec le ticket" wins over "Cohérence" when both could match.
static LABELS: Lazy<Vec<(String, Category)>> = Lazy::new(|| {
    let mut labels: Vec<(String, Category)> = Category::ALL
        .iter()
        .flat_map(|category| {
            category
                .aliases()
                .iter()
                .map(|alias| (alias.to_lowercase(), *category))
        })
        .collect();
    labels.sort_by_key(|(alias, _)| std::cmp::Reverse(alias.len()));
    labels
});

/// Split a model reply into per-category findings.
///
/// Line-oriented cursor parse: a category label (case-insensitive, optional
/// trailing colon, optional markdown emphasis) moves the cursor and is
/// consumed; non-blank lines under an active cursor become findings unless
/// they contain the "rien à signaler" marker; anything before the first
/// recognized header is discarded. Leading bullet markers are stripped.
pub fn parse_review(review_text: &str) -> ReviewResult {
    let mut result = ReviewResult::empty();
    let mut current: Option<Category> = None;

    for line in review_text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(category) = match_header(trimmed) {
            current = Some(category);
            continue;
        }

        let Some(category) = current else {
            continue;
        };
        if trimmed.to_lowercase().contains(NOTHING_TO_REPORT) {
            continue;
        }
        result.push(category, strip_bullet(trimmed).to_string());
    }

    result
}

/// Whether the reply contains at least one recognizable category header.
/// A reply with none ignored the response format and cannot be rendered.
pub fn has_recognized_sections(review_text: &str) -> bool {
    review_text
        .lines()
        .any(|line| match_header(line.trim()).is_some())
}

fn match_header(line: &str) -> Option<Category> {
    let normalized = line
        .trim_start_matches(['#', '*', '_'])
        .trim_end_matches(['*', '_'])
        .trim()
        .to_lowercase();

    for (alias, category) in LABELS.iter() {
        if let Some(rest) = normalized.strip_prefix(alias.as_str()) {
            let rest = rest.trim();
            if rest.is_empty() || rest == ":" {
                return Some(*category);
            }
        }
    }
    None
}

fn strip_bullet(line: &str) -> &str {
    line.trim_start_matches(['-', '*']).trim_start()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNTHETIC_REVIEW: &str = "\
Voici mon analyse de la pull request.

Pull Request:
- Titre sans gitmoji

Ménage:
- console.log oublié dans app.js:12
* TODO restant dans cart.php:88

Typage:
Rien à signaler

Cohérence:
- Variable userName incohérente avec user_name

Cohérence avec le ticket:
- La pagination n'est pas mentionnée dans le ticket

Qualité:
Rien à signaler

Tests:
- Cas d'erreur 404 non testé

Breaking Changes:
Rien à signaler

Refacto:
- Méthode checkout() trop longue (45 lignes)
";

    #[test]
    fn test_round_trip_of_synthetic_review() {
        let result = parse_review(SYNTHETIC_REVIEW);

        assert_eq!(
            result.findings_for(Category::PullRequest),
            &["Titre sans gitmoji".to_string()]
        );
        assert_eq!(
            result.findings_for(Category::Housekeeping),
            &[
                "console.log oublié dans app.js:12".to_string(),
                "TODO restant dans cart.php:88".to_string(),
            ]
        );
        assert!(result.findings_for(Category::Typing).is_empty());
        assert_eq!(result.findings_for(Category::Consistency).len(), 1);
        assert_eq!(result.findings_for(Category::TicketAlignment).len(), 1);
        assert!(result.findings_for(Category::Quality).is_empty());
        assert_eq!(result.findings_for(Category::Tests).len(), 1);
        assert!(result.findings_for(Category::BreakingChanges).is_empty());
        assert_eq!(
            result.findings_for(Category::Refactoring),
            &["Méthode checkout() trop longue (45 lignes)".to_string()]
        );
    }

    #[test]
    fn test_lines_before_first_header_are_discarded() {
        let result = parse_review("préambule du modèle\nencore du texte\nTypage:\n- any utilisé");
        assert_eq!(result.total_findings(), 1);
        assert_eq!(result.findings_for(Category::Typing).len(), 1);
    }

    #[test]
    fn test_header_without_colon_and_case_insensitive() {
        let result = parse_review("MÉNAGE\n- dump() oublié");
        assert_eq!(result.findings_for(Category::Housekeeping).len(), 1);
    }

    #[test]
    fn test_markdown_emphasis_headers() {
        let result = parse_review("**Qualité:**\n- valeur magique 42");
        assert_eq!(result.findings_for(Category::Quality).len(), 1);
    }

    #[test]
    fn test_ticket_alignment_not_swallowed_by_consistency() {
        let result = parse_review("Cohérence avec le ticket:\n- hors scope du ticket");
        assert_eq!(result.findings_for(Category::TicketAlignment).len(), 1);
        assert!(result.findings_for(Category::Consistency).is_empty());
    }

    #[test]
    fn test_refactoring_alias() {
        let result = parse_review("Refactoring:\n- code dupliqué");
        assert_eq!(result.findings_for(Category::Refactoring).len(), 1);
    }

    #[test]
    fn test_nothing_to_report_any_case() {
        let result = parse_review("Tests:\nRIEN À SIGNALER\nQualité:\nrien à signaler ici");
        assert_eq!(result.total_findings(), 0);
    }

    #[test]
    fn test_all_categories_present_even_when_absent_from_reply() {
        let result = parse_review("Tests:\n- manque un test");
        assert_eq!(result.sections().count(), 9);
    }

    #[test]
    fn test_recognized_sections_probe() {
        assert!(has_recognized_sections("Tests:\n- x"));
        assert!(!has_recognized_sections("the model rambled\nwith no headers"));
    }

    #[test]
    fn test_finding_order_preserved() {
        let result = parse_review("Qualité:\n- premier\n- deuxième\n- troisième");
        assert_eq!(
            result.findings_for(Category::Quality),
            &["premier", "deuxième", "troisième"]
        );
    }
}
