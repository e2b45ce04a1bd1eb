use crate::config::{CodePatch, PatchMode, PatchType};
use crate::patcher::{PatchError, Patcher, RollbackStore};
use crate::pattern;

/// Plain-text patcher: `search` is a literal or, when it looks like one, a
/// multi-line regex.
pub struct TextPatcher {
    rollback: RollbackStore,
}

impl TextPatcher {
    pub fn new(rollback: RollbackStore) -> Self {
        Self { rollback }
    }
}

impl Patcher for TextPatcher {
    fn patch_type(&self) -> PatchType {
        PatchType::Text
    }

    fn rollback_store(&self) -> &RollbackStore {
        &self.rollback
    }

    fn transform(&self, content: &str, patch: &CodePatch) -> Result<String, PatchError> {
        substitute(content, &patch.search, &patch.replace, patch.mode)
    }

    fn target_present(&self, content: &str, patch: &CodePatch) -> bool {
        if pattern::looks_like_regex(&patch.search) {
            pattern::get_or_compile(&patch.search)
                .map(|re| re.is_match(content))
                .unwrap_or(false)
        } else {
            content.contains(patch.search.as_str())
        }
    }

    fn check_source(&self, _content: &str, patch: &CodePatch) -> Vec<String> {
        match compile_if_regex(&patch.search) {
            Err(e) => vec![e.to_string()],
            Ok(_) => Vec::new(),
        }
    }
}

fn compile_if_regex(search: &str) -> Result<Option<regex::Regex>, PatchError> {
    if !pattern::looks_like_regex(search) {
        return Ok(None);
    }
    pattern::get_or_compile(search)
        .map(Some)
        .map_err(|source| PatchError::InvalidRegex {
            pattern: search.to_string(),
            source,
        })
}

/// Mode-driven substitution, regex or literal depending on `search`.
///
/// Regex replacements may reference capture groups (`$1`, `${name}`).
pub fn substitute(
    content: &str,
    search: &str,
    replace: &str,
    mode: PatchMode,
) -> Result<String, PatchError> {
    if search.is_empty() {
        return Err(PatchError::EmptySearch);
    }

    let Some(re) = compile_if_regex(search)? else {
        return substitute_literal(content, search, replace, mode);
    };

    let result = match mode {
        PatchMode::Replace => re.replace_all(content, replace).into_owned(),
        PatchMode::InsertBefore => re
            .replace_all(content, format!("{}${{0}}", replace).as_str())
            .into_owned(),
        PatchMode::InsertAfter => re
            .replace_all(content, format!("${{0}}{}", replace).as_str())
            .into_owned(),
        PatchMode::Delete => delete_until_stable(content, |text| {
            re.replace_all(text, "").into_owned()
        }),
    };
    Ok(result)
}

/// Literal, Mode-driven substitution of every occurrence of `search`.
pub fn substitute_literal(
    content: &str,
    search: &str,
    replace: &str,
    mode: PatchMode,
) -> Result<String, PatchError> {
    if search.is_empty() {
        return Err(PatchError::EmptySearch);
    }

    let result = match mode {
        PatchMode::Replace => content.replace(search, replace),
        PatchMode::InsertBefore => content.replace(search, &format!("{}{}", replace, search)),
        PatchMode::InsertAfter => content.replace(search, &format!("{}{}", search, replace)),
        PatchMode::Delete => delete_until_stable(content, |text| text.replace(search, "")),
    };
    Ok(result)
}

/// Deleting can splice a new occurrence together (`aabb` minus `ab`), so
/// repeat until a pass removes nothing.
fn delete_until_stable(content: &str, pass: impl Fn(&str) -> String) -> String {
    let mut current = content.to_string();
    loop {
        let next = pass(&current);
        if next.len() >= current.len() {
            return next;
        }
        current = next;
    }
}
