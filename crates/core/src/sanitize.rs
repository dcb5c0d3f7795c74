use std::collections::HashMap;

use unicode_normalization::UnicodeNormalization;

pub const UNNAMED: &str = "Unnamed";
pub const GENERIC_PLACE: &str = "Place";

/// Normalizes `text` to the ASCII display set. Never returns an empty string.
pub fn sanitize(text: &str) -> String {
    let cleaned = sanitize_raw(text);
    if cleaned.is_empty() {
        UNNAMED.to_string()
    } else {
        cleaned
    }
}

/// Sanitizes a POI name, falling back to a label derived from its category.
pub fn sanitize_or_fallback(text: &str, category: &str) -> String {
    let cleaned = sanitize_raw(text);
    if !cleaned.is_empty() {
        return cleaned;
    }

    let head = category.split(['.', ',']).next().unwrap_or_default();
    let head = sanitize_raw(head);
    if head.is_empty() {
        GENERIC_PLACE.to_string()
    } else {
        format!("{head} place")
    }
}

/// Sanitization without the "Unnamed" fallback; may return an empty string.
pub fn sanitize_raw(text: &str) -> String {
    let kept = text
        .nfkd()
        .filter(|ch| !is_combining_diacritic(*ch))
        .filter(char::is_ascii)
        .filter(|ch| is_display_char(*ch))
        .collect::<String>();

    collapse_whitespace(&kept)
}

fn is_combining_diacritic(ch: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&ch)
}

fn is_display_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric()
        || ch.is_ascii_whitespace()
        || matches!(ch, '.' | ',' | '\'' | '(' | ')' | '-' | '"')
}

// Runs of two or more whitespace become one space; a lone tab is kept as-is.
fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut run = String::new();

    for ch in input.chars() {
        if ch.is_ascii_whitespace() {
            run.push(ch);
            continue;
        }
        flush_run(&mut out, &mut run);
        out.push(ch);
    }
    flush_run(&mut out, &mut run);

    out.trim().to_string()
}

fn flush_run(out: &mut String, run: &mut String) {
    match run.chars().count() {
        0 => {}
        1 => out.push_str(run),
        _ => out.push(' '),
    }
    run.clear();
}

/// Raw → sanitized label memo, owned by whoever renders a result set.
///
/// Schedule places coming back from a planner may no longer sanitize to
/// anything useful (e.g. a name written only in a non-Latin script), so the
/// label assigned when the POI list was first cleaned is looked up instead.
#[derive(Debug, Clone, Default)]
pub struct NameTable {
    labels: HashMap<String, String>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, raw: &str, label: impl Into<String>) {
        if raw.is_empty() {
            return;
        }
        self.labels.insert(raw.to_string(), label.into());
    }

    pub fn register_poi(&mut self, name: &str, category: &str) -> String {
        let label = sanitize_or_fallback(name, category);
        self.register(name, label.clone());
        label
    }

    pub fn label_for(&self, raw: &str) -> Option<&str> {
        self.labels.get(raw).map(String::as_str)
    }

    pub fn resolve(&self, place: &str) -> String {
        let cleaned = sanitize_raw(place);
        if !cleaned.is_empty() {
            return cleaned;
        }
        self.label_for(place)
            .map(ToString::to_string)
            .unwrap_or_else(|| GENERIC_PLACE.to_string())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
