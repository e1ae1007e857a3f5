//! Attribute-level sanitizer for stored markup.
//!
//! Markup is scanned the way a browser tokenizes it: quoted attribute values may
//! contain `>`, unquoted values and attribute names may contain quote characters,
//! and comments and text-only elements (`<title>`, `<textarea>`, `<style>`, …)
//! end where the browser ends them. Every start tag is re-emitted with its
//! dangerous attributes removed: event handlers (`on*`), `srcdoc`,
//! script-capable URLs and style attributes that can execute code.
//! `<meta http-equiv="refresh">` is removed whole, end tags lose their
//! attributes and a tag left open at the end of input is escaped as text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::patterns::compile;

/// Attributes whose value is loaded or navigated to as a URL.
const URL_ATTRIBUTES: &[&str] = &["href", "src", "xlink:href", "formaction", "action", "poster"];

/// Schemes that run code when navigated to, compared after control and whitespace removal.
const DANGEROUS_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:text/html"];

/// Elements whose content the browser reads as text up to the matching end tag.
const TEXT_ELEMENTS: &[&str] = &[
    "script", "style", "title", "textarea", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

static EVENT_HANDLER: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^on\w+$"));

static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| compile(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});"));

static STYLE_EXPRESSION: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)expression\s*\("));

static STYLE_JAVASCRIPT_URL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)url\s*\([^)]*javascript\s*:"));

struct Attribute<'a> {
    raw: &'a str,
    name: &'a str,
    value: Option<&'a str>,
}

struct Tag<'a> {
    name: &'a str,
    attributes: Vec<Attribute<'a>>,
    self_closing: bool,
    /// Bytes from `<` through the closing `>`.
    len: usize,
}

/// What starts at a `<`.
enum Markup<'a> {
    /// A literal `<` in text.
    Text,
    /// Comment or bogus comment, copied as written.
    Verbatim(usize),
    StartTag(Tag<'a>),
    EndTag(Tag<'a>),
    /// A tag the input ends inside of.
    Unterminated,
}

/// Strip dangerous attributes from every start tag in `html`.
pub fn sanitize_attributes(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..lt]);
        let markup = &rest[lt..];
        match scan_markup(markup) {
            Markup::Text => {
                out.push('<');
                rest = &markup[1..];
            }
            Markup::Verbatim(len) => {
                out.push_str(&markup[..len]);
                rest = &markup[len..];
            }
            Markup::Unterminated => {
                tracing::debug!("Escaped unterminated tag");
                out.push_str("&lt;");
                rest = &markup[1..];
            }
            Markup::EndTag(tag) => {
                out.push_str("</");
                out.push_str(tag.name);
                out.push('>');
                rest = &markup[tag.len..];
            }
            Markup::StartTag(tag) => {
                out.push_str(&sanitize_tag(&tag));
                rest = &markup[tag.len..];

                let name = tag.name.to_ascii_lowercase();
                if TEXT_ELEMENTS.contains(&name.as_str()) {
                    let end = rest
                        .to_ascii_lowercase()
                        .find(&format!("</{}", name))
                        .unwrap_or(rest.len());
                    out.push_str(&sanitize_attributes(&rest[..end]));
                    rest = &rest[end..];
                }
            }
        }
    }

    out.push_str(rest);
    out
}

fn scan_markup(markup: &str) -> Markup<'_> {
    let bytes = markup.as_bytes();
    match bytes.get(1) {
        Some(b'!') if markup.starts_with("<!--") => {
            // Searching from the second byte also closes `<!-->` and `<!--->`.
            let end = ["-->", "--!>"]
                .iter()
                .filter_map(|close| markup[2..].find(close).map(|i| i + 2 + close.len()))
                .min();
            Markup::Verbatim(end.unwrap_or(markup.len()))
        }
        Some(b'!' | b'?') => Markup::Verbatim(bogus_comment_len(markup)),
        Some(b'/') => match bytes.get(2) {
            Some(c) if c.is_ascii_alphabetic() => match parse_tag(markup, 2) {
                Some(tag) => Markup::EndTag(tag),
                None => Markup::Unterminated,
            },
            Some(b'>') => Markup::Verbatim(3),
            Some(_) => Markup::Verbatim(bogus_comment_len(markup)),
            None => Markup::Text,
        },
        Some(c) if c.is_ascii_alphabetic() => match parse_tag(markup, 1) {
            Some(tag) => Markup::StartTag(tag),
            None => Markup::Unterminated,
        },
        _ => Markup::Text,
    }
}

fn bogus_comment_len(markup: &str) -> usize {
    markup.find('>').map_or(markup.len(), |i| i + 1)
}

fn is_tag_delimiter(c: u8) -> bool {
    c.is_ascii_whitespace() || c == b'/' || c == b'>'
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

/// Parse the tag whose name starts at `name_start`. `None` when input ends inside it.
fn parse_tag(markup: &str, name_start: usize) -> Option<Tag<'_>> {
    let bytes = markup.as_bytes();
    let mut i = name_start;
    while bytes.get(i).is_some_and(|&c| !is_tag_delimiter(c)) {
        i += 1;
    }
    let name = &markup[name_start..i];

    let mut attributes = Vec::new();
    let mut self_closing = false;
    loop {
        match *bytes.get(i)? {
            b'>' => {
                return Some(Tag {
                    name,
                    attributes,
                    self_closing,
                    len: i + 1,
                });
            }
            b'/' => {
                self_closing = true;
                i += 1;
                continue;
            }
            c if c.is_ascii_whitespace() => {
                self_closing = false;
                i += 1;
                continue;
            }
            _ => self_closing = false,
        }

        // The first character always belongs to the name, even `=` or a quote.
        let start = i;
        i += 1;
        while bytes.get(i).is_some_and(|&c| !is_tag_delimiter(c) && c != b'=') {
            i += 1;
        }
        let name_end = i;

        let after_name = skip_whitespace(bytes, i);
        if bytes.get(after_name) != Some(&b'=') {
            attributes.push(Attribute {
                raw: &markup[start..name_end],
                name: &markup[start..name_end],
                value: None,
            });
            continue;
        }

        let value_start = skip_whitespace(bytes, after_name + 1);
        let value = match *bytes.get(value_start)? {
            quote @ (b'"' | b'\'') => {
                let close = value_start + 1 + markup[value_start + 1..].find(quote as char)?;
                i = close + 1;
                &markup[value_start + 1..close]
            }
            b'>' => {
                i = value_start;
                ""
            }
            _ => {
                i = value_start;
                while bytes
                    .get(i)
                    .is_some_and(|&c| !c.is_ascii_whitespace() && c != b'>')
                {
                    i += 1;
                }
                &markup[value_start..i]
            }
        };
        attributes.push(Attribute {
            raw: &markup[start..i],
            name: &markup[start..name_end],
            value: Some(value),
        });
    }
}

fn sanitize_tag(tag: &Tag) -> String {
    if tag.name.eq_ignore_ascii_case("meta") && is_refresh(&tag.attributes) {
        tracing::debug!("Removed meta refresh tag");
        return String::new();
    }

    let mut out = String::with_capacity(tag.len);
    out.push('<');
    out.push_str(tag.name);
    for attribute in &tag.attributes {
        if let Some(kept) = sanitize_attribute(attribute) {
            out.push(' ');
            out.push_str(&kept);
        }
    }
    if tag.self_closing {
        out.push_str(" /");
    }
    out.push('>');
    out
}

fn is_refresh(attributes: &[Attribute]) -> bool {
    attributes.iter().any(|a| {
        a.name.eq_ignore_ascii_case("http-equiv")
            && a.value
                .is_some_and(|v| decode_entities(v).trim().eq_ignore_ascii_case("refresh"))
    })
}

fn sanitize_attribute(attribute: &Attribute) -> Option<String> {
    let name = attribute.name.to_ascii_lowercase();

    if EVENT_HANDLER.is_match(&name) || name == "srcdoc" {
        return None;
    }

    if URL_ATTRIBUTES.contains(&name.as_str()) {
        let Some(value) = attribute.value else {
            return Some(attribute.raw.to_string());
        };
        let decoded = decode_entities(value);
        if is_dangerous_url(&decoded) {
            return None;
        }
        return Some(format!("{}=\"{}\"", attribute.name, escape_attribute(&decoded)));
    }

    if name == "style" {
        let Some(value) = attribute.value else {
            return Some(attribute.raw.to_string());
        };
        let decoded = decode_entities(value);
        if STYLE_EXPRESSION.is_match(&decoded) || STYLE_JAVASCRIPT_URL.is_match(&decoded) {
            return None;
        }
        return Some(format!("{}=\"{}\"", attribute.name, escape_attribute(&decoded)));
    }

    Some(attribute.raw.to_string())
}

fn is_dangerous_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect::<String>()
        .to_ascii_lowercase();
    DANGEROUS_SCHEMES
        .iter()
        .any(|scheme| compact.starts_with(scheme))
}

/// Decode character references in one pass. Unknown names are left as written.
fn decode_entities(value: &str) -> String {
    ENTITY
        .replace_all(value, |caps: &Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(entity)
            };
            match decoded {
                Some(c) => c.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name.to_ascii_lowercase().as_str() {
        "amp" => '&',
        "quot" => '"',
        "apos" => '\'',
        "lt" => '<',
        "gt" => '>',
        "colon" => ':',
        "lpar" => '(',
        "rpar" => ')',
        "tab" => '\t',
        "newline" => '\n',
        "nbsp" => '\u{a0}',
        _ => return None,
    };
    Some(c)
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removes_event_handlers_in_every_quoting_style() {
        assert_eq!(
            sanitize_attributes(r#"<p onclick="x()" ONLOAD='y()' onmouseover=z class="a">hi</p>"#),
            r#"<p class="a">hi</p>"#
        );
    }

    #[test]
    fn removes_srcdoc() {
        assert_eq!(
            sanitize_attributes(r#"<iframe srcdoc="<script>x</script>" title="t"></iframe>"#),
            r#"<iframe title="t"></iframe>"#
        );
    }

    #[test]
    fn drops_script_urls_and_keeps_the_tag() {
        assert_eq!(
            sanitize_attributes(r#"<a href="javascript:alert(1)" class="btn">go</a>"#),
            r#"<a class="btn">go</a>"#
        );
        assert_eq!(
            sanitize_attributes("<a href=\" java\tscript:alert(1)\">x</a>"),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize_attributes(r#"<a href="javascript&#58;alert(1)">x</a>"#),
            "<a>x</a>"
        );
        assert_eq!(
            sanitize_attributes(r#"<img src="VBScript:msgbox" alt="">"#),
            r#"<img alt="">"#
        );
        assert_eq!(
            sanitize_attributes(r#"<object data="x"><embed src="data:text/html;base64,AAAA"></object>"#),
            r#"<object data="x"><embed></object>"#
        );
        assert_eq!(
            sanitize_attributes(r#"<button formaction="javascript:x()">b</button>"#),
            "<button>b</button>"
        );
    }

    #[test]
    fn safe_urls_are_escaped() {
        assert_eq!(
            sanitize_attributes(r#"<a href='/search?a=1&b="2"'>s</a>"#),
            r#"<a href="/search?a=1&amp;b=&quot;2&quot;">s</a>"#
        );
        assert_eq!(
            sanitize_attributes(r#"<img src=/img/a.png>"#),
            r#"<img src="/img/a.png">"#
        );
        assert_eq!(
            sanitize_attributes(r#"<img src="data:image/png;base64,AA" />"#),
            r#"<img src="data:image/png;base64,AA" />"#
        );
    }

    #[test]
    fn dangerous_styles_are_removed() {
        assert_eq!(
            sanitize_attributes(r#"<div style="width: expression(alert(1))">x</div>"#),
            "<div>x</div>"
        );
        assert_eq!(
            sanitize_attributes(r#"<div style="background: url('javascript:alert(1)')">x</div>"#),
            "<div>x</div>"
        );
        assert_eq!(
            sanitize_attributes(r#"<div style="color: red; background: url(/bg.png)">x</div>"#),
            r#"<div style="color: red; background: url(/bg.png)">x</div>"#
        );
    }

    #[test]
    fn meta_refresh_is_removed_whole() {
        assert_eq!(
            sanitize_attributes(r#"<meta http-equiv="Refresh" content="0;url=https://evil.test"><p>x</p>"#),
            "<p>x</p>"
        );
        assert_eq!(
            sanitize_attributes(r#"<meta charset="utf-8">"#),
            r#"<meta charset="utf-8">"#
        );
    }

    #[test]
    fn closing_tags_and_text_pass_through() {
        let html = "<section>\n  <h1>Title</h1> a &lt; b\n</section>";
        assert_eq!(sanitize_attributes(html), html);
    }

    #[test]
    fn stray_quotes_do_not_hide_attributes() {
        assert_eq!(
            sanitize_attributes(r#"<p>hi</p><img src=x onerror=alert(1) title=a"b>"#),
            r#"<p>hi</p><img src="x" title=a"b>"#
        );
        assert_eq!(
            sanitize_attributes(r#"<a href="javascript:alert(1)" title='it's'>x</a>"#),
            r#"<a title='it' s'>x</a>"#
        );
        assert_eq!(
            sanitize_attributes(r#"<img src=x title="a" "onerror=alert(1) onload=y()>"#),
            r#"<img src="x" title="a" "onerror=alert(1)>"#
        );
    }

    #[test]
    fn quoted_values_may_contain_angle_brackets() {
        assert_eq!(
            sanitize_attributes(r#"<a title="1 > 0" onclick="x()" href="/a">a</a>"#),
            r#"<a title="1 > 0" href="/a">a</a>"#
        );
        assert_eq!(
            sanitize_attributes(r#"<img alt="<b onclick=x()>" onerror=y()>"#),
            r#"<img alt="<b onclick=x()>">"#
        );
    }

    #[test]
    fn unterminated_tag_is_escaped() {
        assert_eq!(
            sanitize_attributes(r#"<p>a</p><img src=x onerror="alert(1)"#),
            r#"<p>a</p>&lt;img src=x onerror="alert(1)"#
        );
        assert_eq!(sanitize_attributes("<img src=x"), "&lt;img src=x");
    }

    #[test]
    fn end_tags_lose_attributes() {
        assert_eq!(
            sanitize_attributes(r#"<p>a</p title="><img src=x onerror=alert(1)>">b"#),
            "<p>a</p>b"
        );
    }

    #[test]
    fn comments_end_where_the_browser_ends_them() {
        assert_eq!(
            sanitize_attributes(r#"<!--<a title="--><img src=x onerror=alert(1)>">"#),
            r#"<!--<a title="--><img src="x">">"#
        );
        assert_eq!(
            sanitize_attributes("<!--><img src=x onerror=y()>"),
            r#"<!--><img src="x">"#
        );
        assert_eq!(
            sanitize_attributes("<!-- note --><p>x</p>"),
            "<!-- note --><p>x</p>"
        );
    }

    #[test]
    fn text_elements_end_at_their_end_tag() {
        assert_eq!(
            sanitize_attributes(r#"<title><img title="</title><img src=x onerror=alert(1)>"></title>"#),
            r#"<title>&lt;img title="</title><img src="x">"></title>"#
        );
        assert_eq!(
            sanitize_attributes("<textarea><b>bold</b></TEXTAREA>"),
            "<textarea><b>bold</b></TEXTAREA>"
        );
    }

    #[test]
    fn malformed_markup_is_stable_after_one_pass() {
        for html in [
            r#"<img src=x onerror=alert(1) title=a"b>"#,
            r#"<a href="javascript:alert(1)" title='it's'>x</a>"#,
            r#"<img src=x onerror="alert(1)"#,
            r#"<title><img title="</title><img src=x onerror=alert(1)>"></title>"#,
            r#"<!--<a title="--><img src=x onerror=alert(1)>">"#,
            "<br / ><p =x ==y>a < b</p>",
        ] {
            let once = sanitize_attributes(html);
            assert!(!once.contains("onerror=alert"), "{once}");
            assert_eq!(sanitize_attributes(&once), once, "{html}");
        }
    }

    #[test]
    fn sanitizing_twice_changes_nothing() {
        let html = r#"<a href="/x?a=1&b=2" title="T" onclick="y()">l</a><img src='a b.png' style="color:red">"#;
        let once = sanitize_attributes(html);
        assert_eq!(sanitize_attributes(&once), once);
    }
}
