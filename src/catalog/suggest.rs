//! "Did you mean" lookup by edit distance.

use strsim::levenshtein;

/// Threshold for parameter-name suggestions.
pub const PARAMETER_DISTANCE: usize = 2;
/// Threshold for builder-name suggestions.
pub const BUILDER_DISTANCE: usize = 3;
pub const MAX_SUGGESTIONS: usize = 3;

/// Candidates within `max_distance` of `input`, closest first, ties broken
/// alphabetically. Comparison is case-insensitive; `input` itself and
/// duplicates are never returned.
pub fn suggest<'a, I>(input: &str, candidates: I, max_distance: usize, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let needle = input.to_lowercase();
    let mut scored: Vec<(usize, &str)> = candidates
        .into_iter()
        .filter(|candidate| *candidate != input)
        .map(|candidate| (levenshtein(&needle, &candidate.to_lowercase()), candidate))
        .filter(|(distance, _)| *distance <= max_distance)
        .collect();

    scored.sort_unstable();
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_close_builder_names() {
        let pool = ["subchunkable", "build_cv", "subchunk_apply"];
        let found = suggest("subchunkabel", pool, BUILDER_DISTANCE, MAX_SUGGESTIONS);
        assert_eq!(found.first().map(String::as_str), Some("subchunkable"));
    }

    #[test]
    fn respects_threshold_and_limit() {
        let pool = ["aa", "ab", "ac", "ad", "zzzz"];
        let found = suggest("a", pool, PARAMETER_DISTANCE, MAX_SUGGESTIONS);
        assert_eq!(found, vec!["aa", "ab", "ac"]);
    }

    #[test]
    fn ignores_case_and_duplicates() {
        let pool = ["Size", "size", "Size"];
        let found = suggest("SIZ", pool, PARAMETER_DISTANCE, MAX_SUGGESTIONS);
        assert_eq!(found, vec!["Size", "size"]);
    }

    #[test]
    fn nothing_close_enough() {
        assert!(suggest("xyz", ["completely_different"], BUILDER_DISTANCE, 3).is_empty());
    }
}
