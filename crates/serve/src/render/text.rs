// crates/serve/src/render/text.rs

use domain::status::Status;
use regex::Regex;
use std::sync::LazyLock;

static RE_TAGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

/// Words kept by a generated excerpt.
pub const EXCERPT_WORDS: usize = 55;
pub const EXCERPT_MORE: &str = " [&hellip;]";

fn markdown_options() -> comrak::Options<'static> {
    let mut opt = comrak::Options::default();
    opt.extension.strikethrough = true;
    opt.extension.table = true;
    opt.extension.autolink = true;
    opt.extension.tasklist = true;
    opt.extension.footnotes = true;
    opt.render.hardbreaks = true;
    opt.render.r#unsafe = true;
    opt
}

/// Rendered form of a raw body: paragraphs, markdown, raw HTML kept.
pub fn render_content(raw: &str) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }
    comrak::markdown_to_html(raw, &markdown_options())
}

/// Rendered excerpt. Falls back to the first words of the content when the
/// excerpt itself is empty.
pub fn render_excerpt(excerpt: &str, content: &str) -> String {
    if !excerpt.trim().is_empty() {
        return render_content(excerpt);
    }
    let rendered = render_content(content);
    if rendered.is_empty() {
        return String::new();
    }

    let plain = RE_TAGS.replace_all(&rendered, " ");
    let words: Vec<&str> = plain.split_whitespace().collect();
    if words.is_empty() {
        return String::new();
    }
    let mut text = words
        .iter()
        .take(EXCERPT_WORDS)
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
    if words.len() > EXCERPT_WORDS {
        text.push_str(EXCERPT_MORE);
    }
    format!("<p>{text}</p>\n")
}

/// How a title is decorated for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TitleStyle {
    /// Prefix protected titles with `Protected: `.
    #[default]
    Decorated,
    /// Protection is conveyed elsewhere; protected titles render plain.
    PlainProtected,
}

pub fn render_title(raw: &str, status: &Status, has_password: bool, style: TitleStyle) -> String {
    if has_password {
        match style {
            TitleStyle::Decorated => format!("Protected: {raw}"),
            TitleStyle::PlainProtected => raw.to_string(),
        }
    } else if *status == Status::Private {
        format!("Private: {raw}")
    } else {
        raw.to_string()
    }
}

pub fn render_guid(guid: &str) -> String {
    html_escape::encode_double_quoted_attribute(guid).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_renders_paragraphs_and_keeps_html() {
        assert_eq!(render_content(""), "");
        assert_eq!(render_content("Hello *world*"), "<p>Hello <em>world</em></p>\n");
        let html = render_content("<div class=\"x\">raw</div>");
        assert!(html.contains("<div class=\"x\">raw</div>"), "{html}");
    }

    #[test]
    fn explicit_excerpt_wins() {
        assert_eq!(render_excerpt("Short", "ignored"), "<p>Short</p>\n");
    }

    #[test]
    fn generated_excerpt_is_trimmed_to_word_limit() {
        let content = (1..=60).map(|n| format!("w{n}")).collect::<Vec<_>>().join(" ");
        let out = render_excerpt("", &content);
        assert!(out.starts_with("<p>w1 w2 "));
        assert!(out.contains("w55 [&hellip;]</p>"), "{out}");
        assert!(!out.contains("w56"));
    }

    #[test]
    fn short_content_excerpt_has_no_more_marker() {
        assert_eq!(render_excerpt("", "A **tiny** body"), "<p>A tiny body</p>\n");
        assert_eq!(render_excerpt("", ""), "");
    }

    #[test]
    fn title_prefixes() {
        let t = |s: &Status, p: bool, st: TitleStyle| render_title("Hi", s, p, st);
        assert_eq!(t(&Status::Publish, false, TitleStyle::Decorated), "Hi");
        assert_eq!(t(&Status::Private, false, TitleStyle::Decorated), "Private: Hi");
        assert_eq!(t(&Status::Publish, true, TitleStyle::Decorated), "Protected: Hi");
        assert_eq!(t(&Status::Private, true, TitleStyle::PlainProtected), "Hi");
    }

    #[test]
    fn guid_is_attribute_escaped() {
        assert_eq!(
            render_guid("https://x.org/?post_type=page&p=3"),
            "https://x.org/?post_type=page&amp;p=3"
        );
    }
}
