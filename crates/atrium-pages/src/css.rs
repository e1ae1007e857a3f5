//! Stylesheet and external stylesheet URL normalization.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::patterns::compile;
use crate::templates::strip_legacy_boilerplate;

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?is)<style\b[^>]*>(.*?)</style\s*>"));

static STYLE_CLOSE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)</(style)"));

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| compile(r"\n[ \t]*(?:\n[ \t]*)+\n"));

/// Normalize a submitted stylesheet.
///
/// One or more `<style>` blocks are unwrapped and concatenated; anything else is
/// taken as bare CSS. Legacy importer boilerplate is removed and any `</style`
/// sequence is neutralised so the result can be placed inside a `<style>` element.
pub fn normalize_css(input: &str) -> String {
    let trimmed = input.trim();

    let css = if STYLE_BLOCK.is_match(trimmed) {
        STYLE_BLOCK
            .captures_iter(trimmed)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .filter(|block| !block.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        trimmed.to_string()
    };

    let css = strip_legacy_boilerplate(&css);
    let css = STYLE_CLOSE.replace_all(&css, r"<\/$1");
    let css = BLANK_LINES.replace_all(&css, "\n\n");
    css.trim().to_string()
}

/// Keep `http(s)://` and root-relative stylesheet URLs, deduplicated and sorted.
pub fn normalize_style_hrefs<I, S>(hrefs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    hrefs
        .into_iter()
        .filter_map(|href| {
            let href = href.as_ref().trim();
            is_allowed_style_href(href).then(|| href.to_string())
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn is_allowed_style_href(href: &str) -> bool {
    if href.chars().any(|c| c.is_control() || c.is_whitespace() || matches!(c, '"' | '<' | '>')) {
        return false;
    }
    let lower = href.to_ascii_lowercase();
    let absolute = ["http://", "https://"]
        .iter()
        .any(|scheme| lower.len() > scheme.len() && lower.starts_with(scheme));
    let root_relative = href.starts_with('/') && !href.starts_with("//");
    absolute || root_relative
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_blocks_are_unwrapped_and_joined() {
        let input = "<style>.a { color: red; }</style>\n<link rel=\"x\">\n<style media=\"screen\">\n.b { color: blue; }\n</style>";
        assert_eq!(
            normalize_css(input),
            ".a { color: red; }\n.b { color: blue; }"
        );
    }

    #[test]
    fn bare_css_is_kept() {
        assert_eq!(normalize_css("  .a { color: red; }\n"), ".a { color: red; }");
        assert_eq!(normalize_css(""), "");
    }

    #[test]
    fn legacy_boilerplate_is_removed() {
        let input = "*, *::before, *::after {\n  box-sizing: border-box;\n}\nimg { max-width: 100%; height: auto; }\n.a { color: red; }";
        assert_eq!(normalize_css(input), ".a { color: red; }");
    }

    #[test]
    fn closing_style_sequence_is_neutralised() {
        let out = normalize_css(".a { content: \"</style><script>x()</script>\"; }");
        assert!(!out.contains("</style"));
        assert!(out.contains(r"<\/style>"));
        let upper = normalize_css(".a { content: \"</STYLE >\"; }");
        assert!(upper.contains(r"<\/STYLE >"));
        assert_eq!(normalize_css(&out), out);
    }

    #[test]
    fn style_hrefs_are_filtered_deduped_and_sorted() {
        let hrefs = vec![
            " https://fonts.example.com/a.css ",
            "/static/site.css",
            "//cdn.example.com/x.css",
            "javascript:alert(1)",
            "relative/path.css",
            "https://fonts.example.com/a.css",
            "http://legacy.example.com/b.css",
            "https://",
            "/bad path.css",
        ];
        assert_eq!(
            normalize_style_hrefs(hrefs),
            vec![
                "/static/site.css".to_string(),
                "http://legacy.example.com/b.css".to_string(),
                "https://fonts.example.com/a.css".to_string(),
            ]
        );
    }
}
