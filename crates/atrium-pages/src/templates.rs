//! Built-in default templates and the legacy compatibility table.
//!
//! Each page key has exactly one canonical default `{html, css}` pair. Records
//! written by earlier importer versions may carry older copies of the default
//! stylesheet, or boilerplate rules the importer used to inline. Those strings
//! are listed here verbatim so old records compare equal to fresh ones. The
//! table is bounded to data that already exists; new entries are not expected.

use std::sync::LazyLock;

use atrium_core::models::VisualPageKey;
use regex::Regex;

use crate::patterns::compile;

/// Canonical fallback content for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTemplate {
    pub html: &'static str,
    pub css: &'static str,
    /// Classes only the default markup uses; custom html referencing none of
    /// them does not get the default stylesheet.
    pub marker_classes: &'static [&'static str],
}

const HOME_HTML: &str = r#"<section class="vp-home">
  <div class="vp-home__hero">
    <h1 class="vp-home__title">Welcome</h1>
    <p class="vp-home__lead">Stories, projects and people from our community.</p>
    <a class="vp-home__cta" href="/articles">Read the latest articles</a>
  </div>
</section>"#;

const HOME_CSS: &str = r#".vp-home {
  padding: 64px 24px;
  background: #f6f4ef;
}
.vp-home__hero {
  max-width: 960px;
  margin: 0 auto;
  text-align: center;
}
.vp-home__title {
  margin: 0 0 16px;
  font-size: 48px;
  line-height: 1.1;
}
.vp-home__lead {
  margin: 0 0 32px;
  font-size: 20px;
  color: #4a4a4a;
}
.vp-home__cta {
  display: inline-block;
  padding: 12px 28px;
  border-radius: 999px;
  background: #1f1f1f;
  color: #ffffff;
  text-decoration: none;
}"#;

const CONNECT_HTML: &str = r#"<section class="vp-connect">
  <h1 class="vp-connect__title">Get in touch</h1>
  <p class="vp-connect__text">Write to us or drop by, we are happy to talk.</p>
  <ul class="vp-connect__links">
    <li><a href="mailto:hello@example.org">hello@example.org</a></li>
    <li><a href="/pages/contacts">Contacts and directions</a></li>
  </ul>
</section>"#;

const CONNECT_CSS: &str = r#".vp-connect {
  max-width: 720px;
  margin: 0 auto;
  padding: 48px 24px;
}
.vp-connect__title {
  margin: 0 0 12px;
  font-size: 40px;
}
.vp-connect__text {
  margin: 0 0 24px;
  color: #4a4a4a;
}
.vp-connect__links {
  margin: 0;
  padding: 0;
  list-style: none;
}
.vp-connect__links li + li {
  margin-top: 8px;
}"#;

const HOME: DefaultTemplate = DefaultTemplate {
    html: HOME_HTML,
    css: HOME_CSS,
    marker_classes: &["vp-home", "vp-home__hero"],
};

const CONNECT: DefaultTemplate = DefaultTemplate {
    html: CONNECT_HTML,
    css: CONNECT_CSS,
    marker_classes: &["vp-connect", "vp-connect__links"],
};

/// Earlier shipped versions of the default stylesheets.
const LEGACY_DEFAULT_CSS: &[(VisualPageKey, &str)] = &[
    (
        VisualPageKey::Home,
        r#".vp-home { padding: 48px 16px; background: #f6f4ef; }
.vp-home__hero { max-width: 960px; margin: 0 auto; text-align: center; }
.vp-home__title { font-size: 44px; margin-bottom: 16px; }
.vp-home__lead { font-size: 18px; color: #555; margin-bottom: 24px; }
.vp-home__cta { display: inline-block; padding: 10px 24px; background: #1f1f1f; color: #fff; }"#,
    ),
    (
        VisualPageKey::Connect,
        r#".vp-connect { max-width: 720px; margin: 0 auto; padding: 40px 16px; }
.vp-connect__title { font-size: 36px; }
.vp-connect__links { list-style: none; padding: 0; }"#,
    ),
];

/// Boilerplate rules older importers inlined into every stylesheet.
///
/// Each pattern is the literal rule with flexible whitespace, anchored to a rule
/// boundary so a selector ending in the same word (`.card img`) is untouched.
const LEGACY_BOILERPLATE_RULES: &[&str] = &[
    // box-sizing reset
    r"(?i)(^|[};])\s*\*\s*,\s*\*::before\s*,\s*\*::after\s*\{\s*box-sizing\s*:\s*border-box\s*;?\s*\}",
    // responsive-image reset
    r"(?i)(^|[};])\s*img\s*\{\s*max-width\s*:\s*100%\s*;\s*height\s*:\s*auto\s*;?\s*\}",
    // overflow-wrap reset
    r"(?i)(^|[};])\s*(?:body|\*)\s*\{\s*overflow-wrap\s*:\s*(?:break-word|anywhere)\s*;?\s*\}",
];

static BOILERPLATE: LazyLock<Vec<Regex>> =
    LazyLock::new(|| LEGACY_BOILERPLATE_RULES.iter().map(|p| compile(p)).collect());

static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| compile(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+))"#));

pub fn default_template(key: VisualPageKey) -> &'static DefaultTemplate {
    match key {
        VisualPageKey::Home => &HOME,
        VisualPageKey::Connect => &CONNECT,
    }
}

/// Remove the legacy boilerplate rules from a stylesheet.
pub fn strip_legacy_boilerplate(css: &str) -> String {
    let mut out = css.to_string();
    for rule in BOILERPLATE.iter() {
        out = rule.replace_all(&out, "$1").into_owned();
    }
    out
}

/// Collapse whitespace, and drop it entirely around CSS punctuation.
pub fn normalize_whitespace(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut chars = collapsed.chars().peekable();
    while let Some(c) = chars.next() {
        if c == ' ' {
            let prev_tight = out.chars().last().is_some_and(is_tight);
            let next_tight = chars.peek().copied().is_some_and(is_tight);
            if prev_tight || next_tight {
                continue;
            }
        }
        out.push(c);
    }
    out
}

fn is_tight(c: char) -> bool {
    matches!(c, '{' | '}' | ';' | ':' | ',' | '>' | '<')
}

/// True when `css` is the current or a legacy default stylesheet for `key`.
pub fn is_default_css(key: VisualPageKey, css: &str) -> bool {
    let candidate = normalize_whitespace(&strip_legacy_boilerplate(css));
    if candidate == normalize_whitespace(default_template(key).css) {
        return true;
    }
    LEGACY_DEFAULT_CSS
        .iter()
        .filter(|(legacy_key, _)| *legacy_key == key)
        .any(|(_, legacy)| candidate == normalize_whitespace(legacy))
}

pub fn is_default_html(key: VisualPageKey, html: &str) -> bool {
    normalize_whitespace(html) == normalize_whitespace(default_template(key).html)
}

/// True when `html` uses any marker class of the default template for `key`.
pub fn references_marker_classes(key: VisualPageKey, html: &str) -> bool {
    let markers = default_template(key).marker_classes;
    CLASS_ATTR.captures_iter(html).any(|caps| {
        let value = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map_or("", |m| m.as_str());
        value
            .split_whitespace()
            .any(|class| markers.contains(&class))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_reference_their_own_markers() {
        for key in VisualPageKey::ALL {
            let template = default_template(key);
            assert!(references_marker_classes(key, template.html));
            assert!(is_default_css(key, template.css));
            assert!(is_default_html(key, template.html));
        }
        assert!(!references_marker_classes(
            VisualPageKey::Home,
            CONNECT_HTML
        ));
    }

    #[test]
    fn default_css_matches_regardless_of_whitespace() {
        let squashed = HOME_CSS.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(is_default_css(VisualPageKey::Home, &squashed));
        assert!(!is_default_css(VisualPageKey::Connect, &squashed));
        assert!(!is_default_css(VisualPageKey::Home, ".custom { color: red; }"));
    }

    #[test]
    fn legacy_default_css_is_recognized() {
        for (key, legacy) in LEGACY_DEFAULT_CSS {
            assert!(is_default_css(*key, legacy));
        }
        let with_boilerplate = format!(
            "*, *::before, *::after {{ box-sizing: border-box; }}\n{}",
            LEGACY_DEFAULT_CSS[0].1
        );
        assert!(is_default_css(VisualPageKey::Home, &with_boilerplate));
    }

    #[test]
    fn boilerplate_rules_are_stripped_only_at_rule_boundaries() {
        let css = "*,*::before,*::after{box-sizing:border-box}\nimg { max-width: 100%; height: auto; }\nbody { overflow-wrap: break-word; }\n.card img { max-width: 100%; height: auto; }\n.a { color: red; }";
        let stripped = strip_legacy_boilerplate(css);
        assert!(!stripped.contains("box-sizing"));
        assert!(!stripped.contains("overflow-wrap"));
        assert!(stripped.contains(".card img { max-width: 100%; height: auto; }"));
        assert!(stripped.contains(".a { color: red; }"));
    }

    #[test]
    fn marker_detection_uses_whole_class_tokens() {
        assert!(references_marker_classes(
            VisualPageKey::Home,
            r#"<div class="wrap vp-home">x</div>"#
        ));
        assert!(!references_marker_classes(
            VisualPageKey::Home,
            r#"<div class="vp-home-custom">x</div>"#
        ));
        assert!(!references_marker_classes(
            VisualPageKey::Home,
            "<p>vp-home</p>"
        ));
    }

    #[test]
    fn whitespace_normalization_is_tight_around_punctuation() {
        assert_eq!(
            normalize_whitespace(".a , .b {\n  color : red ;\n}"),
            ".a,.b{color:red;}"
        );
    }
}
