//! Tag-name normalisation
//!
//! Tools render the same tag as `commit_id`, `Commit Id` or `COMMIT-ID`.
//! Names are compared only after case-folding and collapsing separators.

/// Characters treated as word separators
fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '_' | '-' | '.' | ':')
}

/// Canonical form of a tag name
///
/// Lowercases, collapses each run of separators into one `_`, and drops
/// leading and trailing separators. Idempotent.
#[must_use]
pub fn normalize_tag_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_separator = false;

    for c in name.chars() {
        if is_separator(c) {
            pending_separator = !out.is_empty();
            continue;
        }
        if pending_separator {
            out.push('_');
            pending_separator = false;
        }
        out.extend(c.to_lowercase());
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tool_renderings_agree() {
        for raw in [
            "commit_id",
            "Commit Id",
            "COMMIT-ID",
            "  commit__id ",
            "Commit.Id",
            "commit - id",
        ] {
            assert_eq!(normalize_tag_name(raw), "commit_id", "{raw:?}");
        }
    }

    #[test]
    fn exiftool_style_names() {
        assert_eq!(normalize_tag_name("Git Repo Hash"), "git_repo_hash");
        assert_eq!(normalize_tag_name("Time File Was Created"), "time_file_was_created");
    }

    #[test]
    fn separators_only() {
        assert_eq!(normalize_tag_name(" _- "), "");
    }

    proptest! {
        #[test]
        fn prop_idempotent(name in "\\PC{0,40}") {
            let once = normalize_tag_name(&name);
            prop_assert_eq!(normalize_tag_name(&once), once.clone());
        }

        #[test]
        fn prop_no_edge_or_double_separators(name in "[A-Za-z _.:-]{0,40}") {
            let n = normalize_tag_name(&name);
            prop_assert!(!n.starts_with('_'));
            prop_assert!(!n.ends_with('_'));
            prop_assert!(!n.contains("__"));
        }
    }
}
