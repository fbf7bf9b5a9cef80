//! Small text-matching helpers shared by the extractor, scanner and filter.

use crate::types::query::is_valid_year;

/// Case-insensitive whole-word containment.
///
/// `term` may contain spaces ("raccolta differenziata"); word boundaries are
/// checked only at the ends of the match.
pub fn contains_term(haystack: &str, term: &str) -> bool {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return false;
    }
    let haystack = haystack.to_lowercase();
    haystack.match_indices(&term).any(|(start, matched)| {
        let end = start + matched.len();
        let before_ok = haystack[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric());
        let after_ok = haystack[end..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_alphanumeric());
        before_ok && after_ok
    })
}

/// Case-insensitive substring containment.
pub fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Every standalone run of exactly four ASCII digits that is a plausible year.
///
/// `20133` (a Milan postal code) yields nothing; `2021-2022` yields both.
pub fn year_tokens(text: &str) -> Vec<i32> {
    let bytes = text.as_bytes();
    let mut years = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i].is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i - start == 4 {
                if let Ok(year) = text[start..i].parse::<i32>() {
                    if is_valid_year(year) {
                        years.push(year);
                    }
                }
            }
        } else {
            i += 1;
        }
    }
    years
}
