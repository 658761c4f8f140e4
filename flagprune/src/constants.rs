use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Regex matching module identities whose final component is a test module
/// (`test_*`). Used by the default ignore check of the module gate.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn get_test_module_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"(?:^|\.)test_[^.]*$").expect("Invalid test module regex pattern")
    })
}

/// Set of folders to exclude from file collection by default.
pub fn get_default_exclude_folders() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert("__pycache__");
        s.insert(".git");
        s.insert(".pytest_cache");
        s.insert(".mypy_cache");
        s.insert(".tox");
        s.insert("htmlcov");
        s.insert(".coverage");
        s.insert("build");
        s.insert("dist");
        s.insert("*.egg-info");
        s.insert("venv");
        s.insert(".venv");
        s
    })
}

// Legacy-style aliases so call sites read like constants
pub use get_default_exclude_folders as DEFAULT_EXCLUDE_FOLDERS;
pub use get_test_module_re as TEST_MODULE_RE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_re_matches_last_component() {
        let re = get_test_module_re();
        assert!(re.is_match("test_codemods"));
        assert!(re.is_match("pkg.sub.test_codemods"));
        assert!(!re.is_match("pkg.test_helpers.runner"));
        assert!(!re.is_match("pkg.latest_models"));
        assert!(!re.is_match("contest"));
    }

    #[test]
    fn default_excludes_contain_common_folders() {
        let set = get_default_exclude_folders();
        assert!(set.contains("__pycache__"));
        assert!(set.contains(".venv"));
        assert!(!set.contains("src"));
    }
}
