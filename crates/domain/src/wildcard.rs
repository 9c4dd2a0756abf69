//! Search-token matching shared by role, object and classification filters.
//!
//! A token containing `*` or `%` is a full glob expression anchored at both
//! ends. Any other token is a case-insensitive prefix query.

use authsim_core::{AppError, AppResult};
use regex::{Regex, RegexBuilder};

const WILDCARDS: [char; 2] = ['*', '%'];

/// Compiled case-insensitive search predicate.
#[derive(Debug, Clone)]
pub struct WildcardMatcher {
    pattern: Option<Regex>,
}

impl WildcardMatcher {
    /// Compiles a user-entered search token.
    ///
    /// Blank tokens compile to a matcher that accepts every candidate.
    pub fn compile(pattern: &str) -> AppResult<Self> {
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Ok(Self::match_all());
        }

        let expression = if pattern.contains(WILDCARDS) {
            format!("^{}$", glob_expression(pattern))
        } else {
            format!("^{}.*", regex::escape(pattern))
        };

        let compiled = RegexBuilder::new(expression.as_str())
            .case_insensitive(true)
            .build()
            .map_err(|error| {
                AppError::Validation(format!("invalid search pattern '{pattern}': {error}"))
            })?;

        Ok(Self {
            pattern: Some(compiled),
        })
    }

    /// Returns a matcher that accepts every candidate.
    #[must_use]
    pub fn match_all() -> Self {
        Self { pattern: None }
    }

    /// Returns true when the matcher accepts every candidate.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self.pattern.is_none()
    }

    /// Tests one candidate string.
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        self.pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(candidate))
    }
}

impl Default for WildcardMatcher {
    fn default() -> Self {
        Self::match_all()
    }
}

fn glob_expression(pattern: &str) -> String {
    let mut expression = String::with_capacity(pattern.len() + 8);
    let mut literal = String::new();
    let mut in_wildcard_run = false;

    for character in pattern.chars() {
        if WILDCARDS.contains(&character) {
            if !in_wildcard_run {
                expression.push_str(regex::escape(literal.as_str()).as_str());
                literal.clear();
                expression.push_str(".*");
                in_wildcard_run = true;
            }
        } else {
            literal.push(character);
            in_wildcard_run = false;
        }
    }

    expression.push_str(regex::escape(literal.as_str()).as_str());
    expression
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{WildcardMatcher, glob_expression};

    fn compile(pattern: &str) -> WildcardMatcher {
        WildcardMatcher::compile(pattern).unwrap_or_else(|_| unreachable!())
    }

    #[test]
    fn blank_pattern_accepts_everything() {
        let matcher = compile("   ");
        assert!(matcher.is_match_all());
        assert!(matcher.is_match(""));
        assert!(matcher.is_match("Z_ROLE_A"));
    }

    #[test]
    fn plain_text_is_case_insensitive_prefix() {
        let matcher = compile("z_role");
        assert!(matcher.is_match("Z_ROLE_A"));
        assert!(matcher.is_match("z_role"));
        assert!(!matcher.is_match("SAP_Z_ROLE"));
    }

    #[test]
    fn plain_text_escapes_metacharacters() {
        let matcher = compile("A.B");
        assert!(matcher.is_match("a.b_role"));
        assert!(!matcher.is_match("AXB"));

        let matcher = compile("(Z)+");
        assert!(matcher.is_match("(z)+core"));
        assert!(!matcher.is_match("zz"));
    }

    #[test]
    fn star_pattern_is_anchored_at_both_ends() {
        let matcher = compile("Z*DAP");
        assert!(matcher.is_match("ZXDAP"));
        assert!(matcher.is_match("z_role_dap"));
        assert!(matcher.is_match("ZDAP"));
        assert!(!matcher.is_match("ZDAPX"));
        assert!(!matcher.is_match("AZDAP"));
    }

    #[test]
    fn percent_works_like_star() {
        let matcher = compile("%CORE%");
        assert!(matcher.is_match("gc core use"));
        assert!(matcher.is_match("CORE"));
        assert!(!matcher.is_match("COR"));
    }

    #[test]
    fn wildcard_runs_collapse_to_one_group() {
        assert_eq!(glob_expression("A**%B"), "A.*B");
        assert_eq!(glob_expression("*"), ".*");
        assert_eq!(glob_expression("M_*.X"), "M_.*\\.X");
    }

    proptest! {
        #[test]
        fn plain_pattern_matches_exactly_its_prefix_extensions(
            pattern in "[A-Za-z0-9_.()+?]{1,8}",
            candidate in "[A-Za-z0-9_.()+?]{0,12}",
        ) {
            let matcher = compile(pattern.as_str());
            let expected = candidate.to_lowercase().starts_with(pattern.to_lowercase().as_str());
            prop_assert_eq!(matcher.is_match(candidate.as_str()), expected);
        }

        #[test]
        fn plain_pattern_accepts_any_suffix(
            pattern in "[A-Z_]{1,8}",
            suffix in "[a-z0-9]{0,8}",
        ) {
            let matcher = compile(pattern.as_str());
            let candidate = format!("{}{suffix}", pattern.to_lowercase());
            prop_assert!(matcher.is_match(candidate.as_str()));
        }
    }
}
