use std::collections::BTreeMap;

use crate::github::{ChangeStatus, FileChange};

/// Extensions that mark a file as configuration.
const CONFIG_EXTENSIONS: &[&str] = &[
    "json", "yaml", "yml", "toml", "ini", "env", "cfg", "conf", "xml", "properties",
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageStats {
    pub file_count: usize,
    pub changed_line_count: usize,
}

/// Aggregated change statistics fed to the prompt builder so the model knows
/// the shape of the PR without re-deriving it from raw diffs.
#[derive(Debug, Clone, Default)]
pub struct CodePatternSummary {
    pub per_language: BTreeMap<String, LanguageStats>,
    pub per_extension: BTreeMap<String, usize>,
    pub total_changed_lines: usize,
    /// Path and changed-line count of the biggest file; ties keep the first.
    pub largest_changed_file: Option<(String, usize)>,
    pub test_file_paths: Vec<String>,
    pub config_file_paths: Vec<String>,
    pub has_added_files: bool,
    pub has_removed_files: bool,
}

/// Single pass over the included files.
pub fn analyze(files: &[FileChange]) -> CodePatternSummary {
    let mut summary = CodePatternSummary::default();

    for file in files {
        let changed = file.additions + file.deletions;

        let lang = summary
            .per_language
            .entry(file.language.to_string())
            .or_default();
        lang.file_count += 1;
        lang.changed_line_count += changed;

        if let Some(ext) = extension_of(&file.path) {
            *summary.per_extension.entry(ext).or_insert(0) += 1;
        }

        summary.total_changed_lines += changed;

        let is_new_max = match &summary.largest_changed_file {
            Some((_, max)) => changed > *max,
            None => true,
        };
        if is_new_max {
            summary.largest_changed_file = Some((file.path.clone(), changed));
        }

        let lower = file.path.to_lowercase();
        if lower.contains("test") || lower.contains("spec") {
            summary.test_file_paths.push(file.path.clone());
        }
        if is_config_path(&file.path) {
            summary.config_file_paths.push(file.path.clone());
        }

        match file.status {
            ChangeStatus::Added => summary.has_added_files = true,
            ChangeStatus::Removed => summary.has_removed_files = true,
            ChangeStatus::Modified => {}
        }
    }

    summary
}

fn extension_of(path: &str) -> Option<String> {
    let filename = path.rsplit('/').next()?;
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() {
        // Dotfiles like .gitignore have no extension of their own.
        return None;
    }
    Some(ext.to_lowercase())
}

fn is_config_path(path: &str) -> bool {
    if let Some(ext) = extension_of(path) {
        if CONFIG_EXTENSIONS.contains(&ext.as_str()) {
            return true;
        }
    }
    let lower = path.to_lowercase();
    let filename = path.rsplit('/').next().unwrap_or(path);
    lower.contains("config") || path.starts_with('.') || filename.starts_with('.')
}
