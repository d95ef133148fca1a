//! Environment signals read once at startup.

/// Upstream origin for the API proxy.
pub const API_HOST: &str = "API_HOST";
/// Set by the end-to-end browser harness.
pub const PLAYWRIGHT: &str = "PLAYWRIGHT";
/// Set by the unit test runner.
pub const VITEST: &str = "VITEST";
/// Opt-in for the static bundle size report.
pub const BUNDLE_ANALYSIS: &str = "BUNDLE_ANALYSIS";

pub const DEFAULT_API_HOST: &str = "https://crates.io";

/// Boolean switches derived from the environment.
///
/// A variable counts as set when it is present and non-empty, so `PLAYWRIGHT=0`
/// still enables test mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvFlags {
    /// Running under a test harness; disables the proxy and sets `__TEST__`
    pub test_harness: bool,
    pub bundle_analysis: bool,
}

impl EnvFlags {
    pub fn from_lookup<F>(lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            test_harness: is_set(lookup, PLAYWRIGHT) || is_set(lookup, VITEST),
            bundle_analysis: is_set(lookup, BUNDLE_ANALYSIS),
        }
    }
}

fn is_set<F>(lookup: &F, name: &str) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).is_some_and(|v| !v.is_empty())
}

/// Lookup backed by the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_no_flags() {
        let flags = EnvFlags::from_lookup(&lookup(&[]));
        assert_eq!(flags, EnvFlags::default());
    }

    #[test]
    fn test_playwright_sets_test_harness() {
        let flags = EnvFlags::from_lookup(&lookup(&[(PLAYWRIGHT, "1")]));
        assert!(flags.test_harness);
        assert!(!flags.bundle_analysis);
    }

    #[test]
    fn test_vitest_sets_test_harness() {
        let flags = EnvFlags::from_lookup(&lookup(&[(VITEST, "true")]));
        assert!(flags.test_harness);
    }

    #[test]
    fn test_empty_value_is_unset() {
        let flags = EnvFlags::from_lookup(&lookup(&[(PLAYWRIGHT, ""), (BUNDLE_ANALYSIS, "")]));
        assert!(!flags.test_harness);
        assert!(!flags.bundle_analysis);
    }

    #[test]
    fn test_zero_still_counts_as_set() {
        let flags = EnvFlags::from_lookup(&lookup(&[(VITEST, "0")]));
        assert!(flags.test_harness);
    }

    #[test]
    fn test_bundle_analysis() {
        let flags = EnvFlags::from_lookup(&lookup(&[(BUNDLE_ANALYSIS, "1")]));
        assert!(flags.bundle_analysis);
    }
}
