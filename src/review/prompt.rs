use std::fmt::Write;

use crate::analysis::breaking::BreakingChangeReport;
use crate::analysis::patterns::CodePatternSummary;
use crate::github::PullRequestContext;
use crate::jira::{ExtractedReferences, JiraTicketDetail};

/// Assemble the review instruction sent to the model.
///
/// The checklist wording and the labeled response format are load-bearing:
/// the parser keys on the exact category labels, and the "Rien à signaler"
/// marker is how empty categories are recognized. Pure function; everything
/// variable comes in through the arguments.
pub fn build_prompt(
    context: &PullRequestContext,
    references: &ExtractedReferences,
    jira_details: &[JiraTicketDetail],
    patterns: &CodePatternSummary,
    breaking: &BreakingChangeReport,
) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str(
        "Tu es un expert en review de code. Analyse cette pull request GitHub et signale \
         UNIQUEMENT les problèmes concrets que tu identifies dans le code fourni.\n\n",
    );

    let _ = writeln!(prompt, "**Pull Request: {}**", context.title);
    if context.description.is_empty() {
        prompt.push_str("**Description:** Aucune description fournie\n");
    } else {
        let _ = writeln!(prompt, "**Description:** {}", context.description);
    }
    let _ = writeln!(
        prompt,
        "**Branche:** {} -> {}{}",
        context.source_branch,
        context.target_branch,
        if context.is_draft { " (draft)" } else { "" }
    );

    write_jira_section(&mut prompt, references, jira_details);
    write_commit_section(&mut prompt, context);
    write_pattern_section(&mut prompt, patterns);
    write_breaking_section(&mut prompt, breaking);

    let _ = writeln!(
        prompt,
        "\n**Fichiers modifiés ({}/{}):**\n",
        context.included_files.len(),
        context.total_file_count
    );
    for file in &context.included_files {
        let _ = writeln!(
            prompt,
            "### {} ({}, +{}/-{})\n```{}\n{}\n```\n",
            file.path,
            file.status.as_str(),
            file.additions,
            file.deletions,
            file.language,
            file.patch
        );
    }

    prompt.push_str(
        "**INSTRUCTIONS IMPORTANTES:**\n\
         - Analyse UNIQUEMENT le code fourni ci-dessus\n\
         - Ne signale QUE les problèmes que tu peux VOIR concrètement dans le code\n\
         - N'invente AUCUN problème, ne fais AUCUNE supposition\n\
         - Si tu ne vois pas de problème dans une catégorie, écris \"Rien à signaler\"\n\
         - Sois très précis sur les numéros de ligne et noms de fichiers\n\n",
    );

    write_checklist(&mut prompt, references, breaking);
    write_response_format(&mut prompt, references, breaking);

    prompt.push_str(
        "\n**RAPPEL:** Ne signale QUE ce que tu vois réellement dans le code fourni. \
         Pas de suppositions, pas d'inventions.",
    );

    prompt
}

fn write_jira_section(
    prompt: &mut String,
    references: &ExtractedReferences,
    details: &[JiraTicketDetail],
) {
    if references.is_empty() {
        return;
    }

    prompt.push_str("\n**Tickets Jira référencés:**\n");
    for reference in &references.references {
        let detail = details.iter().find(|d| d.key == reference.key);
        match detail {
            Some(detail) if !detail.fetch_failed => {
                let _ = writeln!(prompt, "- **{}** — {}", detail.key, detail.summary);
                let _ = writeln!(prompt, "  - Statut: {}", detail.status);
                if let Some(assignee) = &detail.assignee {
                    let _ = writeln!(prompt, "  - Assigné à: {assignee}");
                }
                if !detail.description.is_empty() {
                    let _ = writeln!(prompt, "  - Description: {}", detail.description);
                }
            }
            Some(detail) => {
                let _ = writeln!(
                    prompt,
                    "- **{}** (détails non disponibles: {})",
                    detail.key,
                    detail.failure_reason.as_deref().unwrap_or("inconnu")
                );
            }
            None => {
                let _ = writeln!(
                    prompt,
                    "- **{}** (référencé dans: {})",
                    reference.key,
                    reference.source.as_str()
                );
            }
        }
    }
}

fn write_commit_section(prompt: &mut String, context: &PullRequestContext) {
    if context.commits.is_empty() {
        return;
    }
    prompt.push_str("\n**Commits:**\n");
    for commit in &context.commits {
        let first_line = commit.message.lines().next().unwrap_or("");
        let _ = writeln!(prompt, "- {} {}", commit.short_hash, first_line);
    }
}

fn write_pattern_section(prompt: &mut String, patterns: &CodePatternSummary) {
    if patterns.total_changed_lines == 0 {
        return;
    }
    prompt.push_str("\n**Statistiques des changements:**\n");
    let _ = writeln!(
        prompt,
        "- {} lignes modifiées au total",
        patterns.total_changed_lines
    );
    for (language, stats) in &patterns.per_language {
        let _ = writeln!(
            prompt,
            "- {language}: {} fichier(s), {} ligne(s)",
            stats.file_count, stats.changed_line_count
        );
    }
    if let Some((path, lines)) = &patterns.largest_changed_file {
        let _ = writeln!(prompt, "- Fichier le plus modifié: {path} ({lines} lignes)");
    }
    if patterns.test_file_paths.is_empty() {
        prompt.push_str("- Aucun fichier de test modifié\n");
    } else {
        let _ = writeln!(
            prompt,
            "- Fichiers de test modifiés: {}",
            patterns.test_file_paths.join(", ")
        );
    }
    if !patterns.config_file_paths.is_empty() {
        let _ = writeln!(
            prompt,
            "- Fichiers de configuration modifiés: {}",
            patterns.config_file_paths.join(", ")
        );
    }
}

fn write_breaking_section(prompt: &mut String, breaking: &BreakingChangeReport) {
    if breaking.indicators.is_empty() {
        return;
    }
    let _ = writeln!(
        prompt,
        "\n**Indicateurs de breaking change (risque {}):**",
        breaking.risk_level
    );
    for indicator in &breaking.indicators {
        let _ = writeln!(
            prompt,
            "- [{}] {} — {}",
            indicator.kind.as_str(),
            indicator.source,
            indicator.detail
        );
    }
}

fn write_checklist(
    prompt: &mut String,
    references: &ExtractedReferences,
    breaking: &BreakingChangeReport,
) {
    prompt.push_str("**Checklist à vérifier:**\n\n");

    prompt.push_str(
        "**Pull Request:**\n\
         - Titre respecte le format : <gitmoji><espace>[TICKET-1234]<espace>Titre en français\n\
         - Description contient un lien Jira si applicable\n\
         - Description contient des instructions de déploiement si nécessaire\n\n",
    );
    prompt.push_str(
        "**Ménage:**\n\
         - Debug oublié : console.log, dd, dump, var_dump, print_r\n\
         - Commentaires TODO, FIXME oubliés\n\
         - Paramètres de méthodes non utilisés\n\
         - Imports/require non utilisés\n\n",
    );
    prompt.push_str(
        "**Typage:**\n\
         - Types manquants sur méthodes, paramètres, retours\n\
         - Annotations manquantes pour les collections\n\
         - Types TypeScript manquants ou 'any'\n\
         - Visibilité manquante (private/protected/public)\n\
         - Variables nullable non testées avant utilisation\n\n",
    );
    prompt.push_str(
        "**Cohérence:**\n\
         - Noms de variables incohérents\n\
         - Noms de classes/méthodes/fichiers non conformes\n\
         - Textes non traduits (strings hardcodées)\n\
         - Emplacements de fichiers inappropriés\n\n",
    );
    prompt.push_str(
        "**Qualité:**\n\
         - Indentation incorrecte\n\
         - Fautes d'orthographe dans commentaires/noms\n\
         - Valeurs magiques sans constantes\n\
         - Variables intermédiaires manquantes (calculs redondants)\n\n",
    );
    prompt.push_str(
        "**Tests:**\n\
         - Cas d'erreur non testés\n\
         - Fixtures manquantes ou incorrectes\n\
         - Tests unitaires manquants pour nouvelle logique\n\
         - Tests fonctionnels manquants\n\n",
    );
    if !breaking.indicators.is_empty() {
        prompt.push_str(
            "**Breaking Changes:**\n\
             - Les indicateurs listés plus haut sont-ils visibles dans le code ?\n\
             - Les changements d'API publique sont-ils rétrocompatibles ?\n\
             - Les migrations/configs modifiées sont-elles documentées ?\n\n",
        );
    }
    if !references.is_empty() {
        prompt.push_str(
            "**Cohérence avec le ticket:**\n\
             - Le code implémente-t-il ce qui est décrit dans le ticket ?\n\
             - Les modifications correspondent-elles aux exigences du ticket Jira ?\n\
             - Y a-t-il des fonctionnalités développées non mentionnées dans le ticket ?\n\
             - Le scope du développement reste-t-il dans les limites du ticket ?\n\n",
        );
    } else {
        prompt.push_str(
            "**Cohérence avec le ticket:**\n\
             - Vérifier si les modifications correspondent bien au titre de la PR\n\
             - S'assurer que le scope reste cohérent avec l'objectif annoncé\n\n",
        );
    }
    prompt.push_str(
        "**Refacto:**\n\
         - Code dupliqué identique\n\
         - Méthodes trop longues (>20 lignes)\n\
         - Classes avec trop de responsabilités\n\n",
    );
}

fn write_response_format(
    prompt: &mut String,
    references: &ExtractedReferences,
    breaking: &BreakingChangeReport,
) {
    prompt.push_str("**FORMAT DE RÉPONSE OBLIGATOIRE:**\n\n");
    prompt.push_str("Pull Request:\n[Problèmes du titre/description de la PR ou \"Rien à signaler\"]\n\n");
    prompt.push_str("Ménage:\n[Problèmes de debug/TODO dans fichier:ligne ou \"Rien à signaler\"]\n\n");
    prompt.push_str("Typage:\n[Problèmes de types dans fichier:ligne ou \"Rien à signaler\"]\n\n");
    prompt.push_str("Cohérence:\n[Problèmes de nommage/traduction dans fichier:ligne ou \"Rien à signaler\"]\n\n");
    if !references.is_empty() {
        prompt.push_str("Cohérence avec le ticket:\n[Problèmes d'alignement avec les exigences du ticket ou \"Rien à signaler\"]\n\n");
    }
    prompt.push_str("Qualité:\n[Problèmes de qualité dans fichier:ligne ou \"Rien à signaler\"]\n\n");
    prompt.push_str("Tests:\n[Problèmes de tests ou \"Rien à signaler\"]\n\n");
    if !breaking.indicators.is_empty() {
        prompt.push_str("Breaking Changes:\n[Changements incompatibles observés ou \"Rien à signaler\"]\n\n");
    }
    prompt.push_str("Refacto:\n[Améliorations possibles dans fichier:ligne ou \"Rien à signaler\"]\n");
}
