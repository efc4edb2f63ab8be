//! Best-effort HTML-to-text extraction
//!
//! Strips `<script>`/`<style>` blocks, removes tags, decodes the common
//! entities, and collapses whitespace. Good enough for evidence content;
//! fidelity beyond that is not the point.

/// Extract readable text from an HTML document.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = strip_element(html, "script");
    let without_styles = strip_element(&without_scripts, "style");
    let stripped = strip_tags(&without_styles);
    collapse_whitespace(&decode_entities(&stripped))
}

/// Remove `<name ...>...</name>` blocks, case-insensitively.
fn strip_element(html: &str, name: &str) -> String {
    let open = format!("<{name}");
    let close = format!("</{name}>");
    let lower = html.to_lowercase();
    let mut output = String::with_capacity(html.len());
    let mut cursor = 0;

    while let Some(start) = lower[cursor..].find(&open) {
        let start = cursor + start;
        output.push_str(&html[cursor..start]);
        match lower[start..].find(&close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                cursor = html.len();
                break;
            }
        }
    }
    output.push_str(&html[cursor..]);
    output
}

fn strip_tags(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                // Tag boundaries separate words
                output.push(' ');
            }
            _ if !in_tag => output.push(ch),
            _ => {}
        }
    }
    output
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
