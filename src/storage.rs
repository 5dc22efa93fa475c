//! Markup to Confluence storage format.
//!
//! A fixed sequence of regex rewrites. Fenced code is lifted out into
//! placeholders as soon as it is converted so that none of the later rules
//! (inline code, emphasis, lists, paragraphs) can reach into a code body.

use regex::{Captures, Regex};
use std::sync::LazyLock;

macro_rules! pattern {
    ($name:ident, $re:expr) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($re).expect($re));
    };
}

pattern!(H3, r"(?m)^### (.*)$");
pattern!(H2, r"(?m)^## (.*)$");
pattern!(H1, r"(?m)^# (.*)$");
pattern!(FENCE, r"(?s)```(\w+)?\n(.*?)```");
pattern!(INLINE_CODE, r"`([^`]+)`");
pattern!(BOLD, r"\*\*(.+?)\*\*");
pattern!(ITALIC, r"\*(.+?)\*");
pattern!(BULLET_ITEM, r"(?m)^- (.+)$");
pattern!(LIST_RUN, r"(?:<li>.*</li>\n?)+");
pattern!(NUMBERED_ITEM, r"(?m)^\d+\. (.+)$");
pattern!(PLACEHOLDER, r"\x1A(\d+)\x1A");

const PLACEHOLDER_MARK: char = '\u{1A}';

/// Converts lightweight markup into a storage-format string.
pub fn to_storage(markup: &str) -> String {
    // U+001A is not a legal XML character, so dropping it loses nothing and
    // keeps input from posing as a placeholder.
    let markup = markup.replace(PLACEHOLDER_MARK, "");
    let text = H3.replace_all(&markup, "<h3>${1}</h3>");
    let text = H2.replace_all(&text, "<h2>${1}</h2>");
    let text = H1.replace_all(&text, "<h1>${1}</h1>");

    let mut macros: Vec<String> = Vec::new();
    let text = FENCE.replace_all(&text, |caps: &Captures| {
        let language = caps.get(1).map_or("none", |m| m.as_str());
        macros.push(code_macro(language, caps[2].trim()));
        format!("{PLACEHOLDER_MARK}{}{PLACEHOLDER_MARK}", macros.len() - 1)
    });

    let text = INLINE_CODE.replace_all(&text, "<code>${1}</code>");
    let text = BOLD.replace_all(&text, "<strong>${1}</strong>");
    let text = ITALIC.replace_all(&text, "<em>${1}</em>");

    let text = BULLET_ITEM.replace_all(&text, "<li>${1}</li>");
    let text = LIST_RUN.replace_all(&text, "<ul>${0}</ul>");
    // Numbered items stay loose: no <ol> wrapper.
    let text = NUMBERED_ITEM.replace_all(&text, "<li>${1}</li>");

    let wrapped = text
        .split("\n\n")
        .map(|segment| {
            if starts_with_tag(segment) {
                segment.to_string()
            } else {
                format!("<p>{segment}</p>")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    PLACEHOLDER
        .replace_all(&wrapped, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| macros.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

fn starts_with_tag(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some('<') => chars.next().is_some_and(|c| c.is_ascii_lowercase()),
        Some(PLACEHOLDER_MARK) => true,
        _ => false,
    }
}

fn code_macro(language: &str, body: &str) -> String {
    format!(
        "<ac:structured-macro ac:name=\"code\">\
         <ac:parameter ac:name=\"language\">{language}</ac:parameter>\
         <ac:plain-text-body><![CDATA[{}]]></ac:plain-text-body>\
         </ac:structured-macro>",
        escape_cdata(body)
    )
}

/// A CDATA section cannot contain `]]>`; split it across two sections.
fn escape_cdata(body: &str) -> String {
    body.replace("]]>", "]]]]><![CDATA[>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_are_converted_per_line() {
        assert_eq!(
            to_storage("# One\n## Two\n### Three"),
            "<h1>One</h1>\n<h2>Two</h2>\n<h3>Three</h3>"
        );
    }

    #[test]
    fn fenced_body_is_not_touched_by_inline_rules() {
        let out = to_storage("```js\nlet s = `x` + **y** * *z*;\n```");
        assert_eq!(
            out,
            "<ac:structured-macro ac:name=\"code\">\
             <ac:parameter ac:name=\"language\">js</ac:parameter>\
             <ac:plain-text-body><![CDATA[let s = `x` + **y** * *z*;]]></ac:plain-text-body>\
             </ac:structured-macro>"
        );
    }

    #[test]
    fn fence_without_language_uses_none() {
        let out = to_storage("```\ncode\n```");
        assert!(out.contains("<ac:parameter ac:name=\"language\">none</ac:parameter>"));
        assert!(out.contains("<![CDATA[code]]>"));
    }

    #[test]
    fn blank_lines_inside_fence_do_not_split_paragraphs() {
        let out = to_storage("Intro\n\n```python\na = 1\n\nb = 2\n```");
        assert_eq!(out.matches("<p>").count(), 1);
        assert!(out.contains("<![CDATA[a = 1\n\nb = 2]]>"));
    }

    #[test]
    fn cdata_terminator_in_body_is_split() {
        let out = to_storage("```\nx = a[b[0]]>1\n```");
        assert!(out.contains("<![CDATA[x = a[b[0]]]]><![CDATA[>1]]>"));
    }

    #[test]
    fn inline_code_bold_and_italic() {
        assert_eq!(
            to_storage("Use `cargo` **now** and *soon*"),
            "<p>Use <code>cargo</code> <strong>now</strong> and <em>soon</em></p>"
        );
    }

    #[test]
    fn bullets_are_wrapped_in_a_list() {
        assert_eq!(
            to_storage("- a\n- b"),
            "<ul><li>a</li>\n<li>b</li></ul>"
        );
    }

    #[test]
    fn numbered_items_are_left_without_ordered_list() {
        let out = to_storage("1. first\n2. second");
        assert_eq!(out, "<li>first</li>\n<li>second</li>");
        assert!(!out.contains("<ol>"));
    }

    #[test]
    fn paragraphs_split_on_blank_lines() {
        assert_eq!(
            to_storage("first para\nstill first\n\nsecond"),
            "<p>first para\nstill first</p>\n<p>second</p>"
        );
    }

    #[test]
    fn extracted_document_converts_end_to_end() {
        let markup = "Hello\nWorld\n\n---\n## Full Code\n```\n/** Hello\n * World\n */\nfunction f(){}\n```";
        let out = to_storage(markup);
        assert!(out.starts_with("<p>Hello\nWorld</p>\n<p>---\n<h2>Full Code</h2>\n"));
        assert!(out.contains("<![CDATA[/** Hello\n * World\n */\nfunction f(){}]]>"));
    }

    #[test]
    fn marker_characters_in_input_are_not_placeholders() {
        let out = to_storage("```py\nx = 1\n```\n\nkeep \u{1A}0\u{1A} this");
        assert_eq!(out.matches("ac:structured-macro ac:name").count(), 1);
        assert!(out.contains("<p>keep 0 this</p>"));
        assert!(!out.contains('\u{1A}'));
    }
}
