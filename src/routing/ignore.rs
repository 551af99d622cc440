//! Ignore rules for route discovery.
//!
//! Non-route files (tests, type declarations, hidden files) are dropped
//! before any pattern is computed. Rules are glob patterns matched against
//! a single path component name; an ignored directory drops its subtree.

use glob::{Pattern, PatternError};

/// Patterns applied when configuration does not override them.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".*",
    "*.test.*",
    "*.spec.*",
    "*_test.*",
    "*.d.ts",
];

/// Compiled set of ignore globs.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    rules: Vec<Pattern>,
}

impl IgnoreRules {
    /// Compile the given glob patterns (`*`, `?` and `[...]` classes).
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rules = patterns
            .into_iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rules })
    }

    /// The built-in rules.
    pub fn standard() -> Self {
        Self {
            rules: DEFAULT_IGNORE_PATTERNS
                .iter()
                .filter_map(|p| Pattern::new(p).ok())
                .collect(),
        }
    }

    /// Rules that ignore nothing.
    pub fn none() -> Self {
        Self { rules: Vec::new() }
    }

    /// Returns true if a path component with this name is excluded.
    pub fn is_ignored(&self, name: &str) -> bool {
        self.rules.iter().any(|p| p.matches(name))
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(Pattern::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rules() {
        let rules = IgnoreRules::standard();
        assert!(rules.is_ignored(".hidden"));
        assert!(rules.is_ignored("users.test.ts"));
        assert!(rules.is_ignored("users.spec.rs"));
        assert!(rules.is_ignored("users_test.rs"));
        assert!(rules.is_ignored("types.d.ts"));

        assert!(!rules.is_ignored("users.rs"));
        assert!(!rules.is_ignored("[id].rs"));
        assert!(!rules.is_ignored("index.ts"));
        assert_eq!(rules.patterns().count(), DEFAULT_IGNORE_PATTERNS.len());
    }

    #[test]
    fn test_custom_rules() {
        let rules = IgnoreRules::new(["draft-?.rs", "notes-[0-9].md", "[[]private]*"]).unwrap();
        assert!(rules.is_ignored("draft-1.rs"));
        assert!(!rules.is_ignored("draft-10.rs"));
        assert!(rules.is_ignored("notes-7.md"));
        assert!(!rules.is_ignored("notes-x.md"));
        assert!(rules.is_ignored("[private]notes.rs"));
        assert!(!rules.is_ignored("p.rs"));
    }

    #[test]
    fn test_invalid_glob_is_rejected() {
        assert!(IgnoreRules::new(["***"]).is_err());
    }

    #[test]
    fn test_none_ignores_nothing() {
        assert!(!IgnoreRules::none().is_ignored(".hidden"));
    }
}
