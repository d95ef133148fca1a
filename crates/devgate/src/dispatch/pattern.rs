//! Glob sets with `{a,b}` alternation.
//!
//! `glob::Pattern` has no brace support, so each pattern is expanded into its
//! alternatives first. Paths are matched relative to the project root with
//! `/` separators; `*` never crosses a directory boundary, `**/` spans any
//! number of directories (including none).

use glob::{MatchOptions, Pattern};
use serde::{Serialize, Serializer};
use std::path::Path;

pub(crate) const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

#[derive(Debug, thiserror::Error)]
pub enum PatternError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    Invalid {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("unbalanced braces in pattern '{0}'")]
    UnbalancedBraces(String),
}

/// Expand `{a,b}` groups, innermost alternatives included, left to right.
///
/// `src/**/*.{test,spec}.{js,ts}` yields four patterns.
pub fn expand_braces(pattern: &str) -> Result<Vec<String>, PatternError> {
    let Some(open) = pattern.find('{') else {
        if pattern.contains('}') {
            return Err(PatternError::UnbalancedBraces(pattern.to_string()));
        }
        return Ok(vec![pattern.to_string()]);
    };

    let close = matching_brace(pattern, open)
        .ok_or_else(|| PatternError::UnbalancedBraces(pattern.to_string()))?;

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];
    if prefix.contains('}') {
        return Err(PatternError::UnbalancedBraces(pattern.to_string()));
    }

    let mut expanded = Vec::new();
    for alternative in split_alternatives(&pattern[open + 1..close]) {
        let candidate = format!("{prefix}{alternative}{suffix}");
        expanded.extend(expand_braces(&candidate)?);
    }
    Ok(expanded)
}

fn matching_brace(pattern: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in pattern.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split on top-level commas only.
fn split_alternatives(group: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in group.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&group[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&group[start..]);
    parts
}

/// `dir/**` is rewritten to `dir/**/*` so it claims files at any depth below `dir`.
fn normalize(pattern: &str) -> String {
    match pattern.strip_suffix("/**") {
        Some(dir) => format!("{dir}/**/*"),
        None => pattern.to_string(),
    }
}

/// Compiled set of glob patterns; a path matches when any pattern does.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    sources: Vec<String>,
    compiled: Vec<Pattern>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sources = Vec::new();
        let mut compiled = Vec::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            for expanded in expand_braces(pattern)? {
                let normalized = normalize(&expanded);
                compiled.push(Pattern::new(&normalized).map_err(|source| {
                    PatternError::Invalid {
                        pattern: pattern.to_string(),
                        source,
                    }
                })?);
            }
            sources.push(pattern.to_string());
        }
        Ok(Self { sources, compiled })
    }

    /// Patterns as written, before expansion.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn is_match(&self, path: &Path) -> bool {
        let path = to_slash(path);
        self.compiled
            .iter()
            .any(|p| p.matches_with(&path, MATCH_OPTIONS))
    }
}

impl Serialize for PatternSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.sources)
    }
}

/// Relative path with `/` separators and no leading `./`.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_no_braces() {
        assert_eq!(expand_braces("src/**").unwrap(), vec!["src/**"]);
    }

    #[test]
    fn test_expand_two_groups() {
        let expanded = expand_braces("src/**/*.{test,spec}.{js,ts}").unwrap();
        assert_eq!(
            expanded,
            vec![
                "src/**/*.test.js",
                "src/**/*.test.ts",
                "src/**/*.spec.js",
                "src/**/*.spec.ts",
            ]
        );
    }

    #[test]
    fn test_expand_nested_group() {
        let expanded = expand_braces("a.{b,c{d,e}}").unwrap();
        assert_eq!(expanded, vec!["a.b", "a.cd", "a.ce"]);
    }

    #[test]
    fn test_expand_unbalanced() {
        assert!(matches!(
            expand_braces("src/*.{test,spec"),
            Err(PatternError::UnbalancedBraces(_))
        ));
        assert!(matches!(
            expand_braces("src/*.test}"),
            Err(PatternError::UnbalancedBraces(_))
        ));
    }

    #[test]
    fn test_invalid_glob() {
        assert!(matches!(
            PatternSet::new(["src/***/x.ts"]),
            Err(PatternError::Invalid { .. })
        ));
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let set = PatternSet::new(["src/*.test.ts"]).unwrap();
        assert!(set.is_match(Path::new("src/a.test.ts")));
        assert!(!set.is_match(Path::new("src/lib/a.test.ts")));
    }

    #[test]
    fn test_double_star_spans_zero_or_more_directories() {
        let set = PatternSet::new(["src/**/*.svelte.{test,spec}.{js,ts}"]).unwrap();
        assert!(set.is_match(Path::new("src/Button.svelte.test.ts")));
        assert!(set.is_match(Path::new("src/lib/Button.svelte.test.ts")));
        assert!(set.is_match(Path::new("src/lib/components/deep/Nav.svelte.spec.js")));
        assert!(!set.is_match(Path::new("src/lib/Button.test.ts")));
        assert!(!set.is_match(Path::new("tests/Button.svelte.test.ts")));
        assert!(!set.is_match(Path::new("src/lib/Button.svelte.test.tsx")));
    }

    #[test]
    fn test_trailing_double_star_claims_subtree() {
        let set = PatternSet::new(["src/lib/server/**"]).unwrap();
        assert!(set.is_match(Path::new("src/lib/server/db.test.ts")));
        assert!(set.is_match(Path::new("src/lib/server/api/crates.test.ts")));
        assert!(!set.is_match(Path::new("src/lib/serverless.test.ts")));
        assert!(!set.is_match(Path::new("src/lib/db.test.ts")));
    }

    #[test]
    fn test_leading_dot_slash_is_ignored() {
        let set = PatternSet::new(["src/**/*.test.ts"]).unwrap();
        assert!(set.is_match(Path::new("./src/lib/a.test.ts")));
    }

    #[test]
    fn test_sources_and_serialization() {
        let set = PatternSet::new(["src/**/*.{test,spec}.{js,ts}"]).unwrap();
        assert_eq!(set.sources(), ["src/**/*.{test,spec}.{js,ts}"]);
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!(["src/**/*.{test,spec}.{js,ts}"])
        );
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = PatternSet::default();
        assert!(set.is_empty());
        assert!(!set.is_match(Path::new("src/a.test.ts")));
    }
}
