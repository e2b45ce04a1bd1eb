//! Thread-local compiled regex cache for text patches.
//!
//! Config files repeat the same search patterns across runs and validation
//! levels; compiling once per thread keeps `validate` + `apply` cheap.
//! Cache is capped at 256 entries; the whole cache is dropped when full.

use regex::{Regex, RegexBuilder};
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    static REGEX_CACHE: RefCell<HashMap<String, Regex>> = RefCell::new(HashMap::new());
}

/// Get a compiled multi-line regex from cache, or compile and cache it.
///
/// Compilation errors are not cached.
pub fn get_or_compile(pattern: &str) -> Result<Regex, regex::Error> {
    REGEX_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(re) = cache.get(pattern) {
            return Ok(re.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = RegexBuilder::new(pattern).multi_line(true).build()?;
        cache.insert(pattern.to_string(), compiled.clone());
        Ok(compiled)
    })
}

/// Heuristic used to decide whether a search string is meant as a regex.
///
/// Plain identifiers, paths and code fragments without grouping or
/// character-class syntax are treated literally.
pub fn looks_like_regex(search: &str) -> bool {
    const MARKERS: [&str; 11] = [
        ".*", ".+", "\\d", "\\w", "\\s", "\\D", "\\W", "\\S", "[\\", "(", "{",
    ];

    search.starts_with('^')
        || search.ends_with('$')
        || MARKERS.iter().any(|marker| search.contains(marker))
}

/// Clear the cache (mainly for testing).
pub fn clear_cache() {
    REGEX_CACHE.with(|cache| cache.borrow_mut().clear());
}

/// Number of cached patterns on this thread.
pub fn cache_size() -> usize {
    REGEX_CACHE.with(|cache| cache.borrow().len())
}
