use anyhow::{Context, Result};
use log::debug;
use regex::Regex;

use crate::profile::Profile;

/// Compile filter patterns into regex objects
pub fn compile_filters(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).with_context(|| format!("Invalid regex pattern: '{}'", pattern))
        })
        .collect()
}

/// Check if a selection target matches any of the compiled filters
/// Returns true if filters is empty (no filters = match all)
pub fn matches_any_filter(name: &str, filters: &[Regex]) -> bool {
    if filters.is_empty() {
        return true;
    }
    filters.iter().any(|re| re.is_match(name))
}

/// Drop all measurements of selection targets not matched by `filters`.
///
/// Sample counts and run totals are left alone, since phase correction
/// still needs them. Returns the number of removed selection targets.
pub fn filter_selections(profile: &mut Profile, filters: &[Regex]) -> usize {
    let before = profile.measurements().len();
    profile.measurements_mut().retain(|selection, _| {
        let keep = matches_any_filter(selection, filters);
        if !keep {
            debug!("Filtered out {}", selection);
        }
        keep
    });
    before - profile.measurements().len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::experiment::{measurement, Speedup};

    #[test]
    fn test_compile_valid_filters() {
        let patterns = vec!["main\\.c:.*".to_string(), "util\\.c:1\\d".to_string()];
        let result = compile_filters(&patterns);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 2);
    }

    #[test]
    fn test_compile_invalid_regex() {
        let patterns = vec!["[invalid".to_string()];
        let result = compile_filters(&patterns);
        assert!(result.is_err());
    }

    #[test]
    fn test_matches_any_filter_empty() {
        let filters = vec![];
        assert!(matches_any_filter("anything", &filters));
    }

    #[test]
    fn test_matches_any_filter_or_logic() {
        let patterns = vec!["^src/a\\.c:".to_string(), ":42$".to_string()];
        let filters = compile_filters(&patterns).unwrap();
        assert!(matches_any_filter("src/a.c:7", &filters));
        assert!(matches_any_filter("src/b.c:42", &filters));
        assert!(!matches_any_filter("src/b.c:7", &filters));
        assert!(!matches_any_filter("lib/src/a.c:7", &filters));
    }

    #[test]
    fn test_filter_selections_keeps_samples() {
        let mut p = Profile::new();
        p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 1000, 100, 0));
        p.add_measurement(measurement("b.c:2", "ops", Speedup::ZERO, 1000, 100, 0));
        p.add_samples("b.c:2", 12);

        let filters = compile_filters(&["^a\\.c".to_string()]).unwrap();
        assert_eq!(filter_selections(&mut p, &filters), 1);
        assert!(p.get("a.c:1", "ops").is_some());
        assert!(p.get("b.c:2", "ops").is_none());
        assert_eq!(p.sample_count("b.c:2"), Some(12));
    }

    #[test]
    fn test_filter_selections_without_filters() {
        let mut p = Profile::new();
        p.add_measurement(measurement("a.c:1", "ops", Speedup::ZERO, 1000, 100, 0));
        assert_eq!(filter_selections(&mut p, &[]), 0);
        assert!(!p.is_empty());
    }
}
