// crates/serve/src/render/sanitize.rs

use super::RenderError;
use lol_html::{element, html_content::Element, rewrite_str, Settings};

/// Elements dropped together with their content.
const BLOCKED: &str = "script, style, iframe, object, embed, form";

/// Attributes whose value is a URL.
const URL_ATTRS: [&str; 5] = ["href", "src", "action", "formaction", "xlink:href"];

fn is_unsafe_attr(name: &str, value: &str) -> bool {
    let name = name.to_ascii_lowercase();
    if name.starts_with("on") {
        return true;
    }
    if URL_ATTRS.contains(&name.as_str()) {
        let compact: String = value
            .chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .collect::<String>()
            .to_ascii_lowercase();
        return compact.starts_with("javascript:") || compact.starts_with("vbscript:");
    }
    false
}

/// Filter author-supplied markup: script-class elements, inline event
/// handlers and script URLs are removed, everything else passes through.
pub fn sanitize_html(input: &str) -> Result<String, RenderError> {
    if !input.contains('<') {
        return Ok(input.to_string());
    }

    let settings = Settings {
        element_content_handlers: vec![
            element!(BLOCKED, |el: &mut Element| {
                el.remove();
                Ok(())
            }),
            element!("*", |el: &mut Element| {
                let drop: Vec<String> = el
                    .attributes()
                    .iter()
                    .filter(|a| is_unsafe_attr(&a.name(), &a.value()))
                    .map(|a| a.name())
                    .collect();
                for name in drop {
                    el.remove_attribute(&name);
                }
                Ok(())
            }),
        ],
        ..Settings::default()
    };

    rewrite_str(input, settings).map_err(|e| RenderError::LolHtml(e.to_string()))
}
