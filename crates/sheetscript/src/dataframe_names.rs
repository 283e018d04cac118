//! Resolution of dataframe names that are valid, unique Python identifiers

use cow_utils::CowUtils;
use log::trace;
use ruff_python_stdlib::identifiers::is_identifier;

use crate::types::FxIndexSet;

/// Turn an arbitrary name into a valid Python identifier
pub fn get_valid_dataframe_name(name: &str) -> String {
    let replaced = name.trim().cow_replace(' ', "_");
    let mut candidate: String = replaced
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if candidate.is_empty() {
        candidate.push_str("df");
    }
    if candidate.starts_with(|c: char| c.is_ascii_digit()) {
        candidate.insert_str(0, "df_");
    }
    if !is_identifier(&candidate) {
        // Keywords and the odd unicode start character
        candidate.insert_str(0, "df_");
    }
    candidate
}

/// Resolve `desired` names against the names already in the state.
///
/// Each name is made a valid identifier, then suffixed with `_1`, `_2`, ...
/// until it collides neither with an existing name nor with a name resolved
/// earlier in the same call. Order is preserved.
pub fn get_valid_dataframe_names<S: AsRef<str>>(existing: &[String], desired: &[S]) -> Vec<String> {
    let mut taken: FxIndexSet<String> = existing.iter().cloned().collect();
    let mut resolved = Vec::with_capacity(desired.len());

    for name in desired {
        let base = get_valid_dataframe_name(name.as_ref());
        let unique = if taken.contains(&base) {
            (1..)
                .map(|suffix| format!("{base}_{suffix}"))
                .find(|candidate| !taken.contains(candidate))
                .unwrap_or_else(|| base.clone())
        } else {
            base
        };

        if unique != name.as_ref() {
            trace!("Resolved dataframe name '{}' to '{unique}'", name.as_ref());
        }
        taken.insert(unique.clone());
        resolved.push(unique);
    }

    resolved
}

/// `count` fresh `df{n}` names, counting from `df1` and skipping names in use
pub fn get_new_dataframe_names(existing: &[String], count: usize) -> Vec<String> {
    (1..)
        .map(|n| format!("df{n}"))
        .filter(|candidate| !existing.contains(candidate))
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_characters_are_replaced() {
        assert_eq!(get_valid_dataframe_name("sales data"), "sales_data");
        assert_eq!(get_valid_dataframe_name("q1-report"), "q1_report");
        assert_eq!(get_valid_dataframe_name("2024"), "df_2024");
        assert_eq!(get_valid_dataframe_name("class"), "df_class");
        assert_eq!(get_valid_dataframe_name(""), "df");
    }

    #[test]
    fn test_names_are_unique_against_state_and_each_other() {
        let existing = vec!["df1".to_string(), "sales".to_string()];
        let resolved = get_valid_dataframe_names(&existing, &["sales", "sales", "df1", "other"]);
        assert_eq!(resolved, vec!["sales_1", "sales_2", "df1_1", "other"]);
    }

    #[test]
    fn test_new_dataframe_names_skip_used() {
        let existing = vec!["df1".to_string(), "df3".to_string()];
        assert_eq!(get_new_dataframe_names(&existing, 2), vec!["df2", "df4"]);
        assert!(get_new_dataframe_names(&existing, 0).is_empty());
    }
}
