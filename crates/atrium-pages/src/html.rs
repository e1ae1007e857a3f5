//! Reduce submitted markup to an embeddable fragment.

use std::sync::LazyLock;

use regex::Regex;

use crate::patterns::compile;
use crate::sanitize::sanitize_attributes;

/// Elements removed together with their content.
const REMOVED_BLOCKS: &[&str] = &["script", "noscript", "object", "applet"];

/// Void or stray elements removed tag by tag.
const REMOVED_TAGS: &[&str] = &["base", "embed"];

/// Removal passes before giving up on markup that keeps reassembling itself.
const MAX_REMOVAL_PASSES: usize = 8;

static DOCTYPE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^<!doctype[^>]*>"));

static BODY: LazyLock<Regex> = LazyLock::new(|| compile(r"(?is)<body\b[^>]*>(.*)</body\s*>"));

static BODY_TAG: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</?body\b[^>]*>"));

static DOCUMENT_TAG: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)</?(?:html|head)\b[^>]*>"));

/// Paired-element pattern and stray-tag pattern per removed block element.
static BLOCK_PATTERNS: LazyLock<Vec<(Regex, Regex)>> = LazyLock::new(|| {
    REMOVED_BLOCKS
        .iter()
        .map(|tag| {
            (
                compile(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>")),
                compile(&format!(r"(?i)</?{tag}\b[^>]*>")),
            )
        })
        .collect()
});

static REMOVED_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    compile(&format!(r"(?i)</?(?:{})\b[^>]*>", REMOVED_TAGS.join("|")))
});

static MARKUP: LazyLock<Regex> = LazyLock::new(|| compile(r"<[a-zA-Z][^>]*>"));

/// Normalize submitted html into a sanitized fragment.
///
/// Document wrappers are removed (`<!doctype>`, `<html>`, `<head>`, `<body>`),
/// executable elements are dropped with their content, then every remaining
/// start tag goes through [`sanitize_attributes`].
pub fn normalize_visual_html(input: &str) -> String {
    let mut html = input.trim();
    if let Some(doctype) = DOCTYPE.find(html) {
        html = html[doctype.end()..].trim_start();
    }

    let html = match BODY.captures(html) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()).to_string(),
        None => BODY_TAG.replace_all(html, "").into_owned(),
    };
    let html = DOCUMENT_TAG.replace_all(&html, "").into_owned();
    let html = remove_executable_elements(html);

    sanitize_attributes(&html).trim().to_string()
}

fn remove_executable_elements(mut html: String) -> String {
    for _ in 0..MAX_REMOVAL_PASSES {
        let before = html.len();
        for (paired, stray) in BLOCK_PATTERNS.iter() {
            html = paired.replace_all(&html, "").into_owned();
            html = stray.replace_all(&html, "").into_owned();
        }
        html = REMOVED_TAG_PATTERN.replace_all(&html, "").into_owned();
        if html.len() == before {
            break;
        }
    }
    html
}

/// True when `html` contains at least one element tag.
pub fn has_markup(html: &str) -> bool {
    MARKUP.is_match(html)
}
