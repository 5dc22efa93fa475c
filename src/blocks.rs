//! Markup to Notion blocks.
//!
//! A single-pass line scan with one piece of state: whether we are inside a
//! fence. Each non-blank line outside a fence becomes its own block.

use serde_json::{json, Value};

/// Longest `text.content` Notion accepts in one rich-text object.
pub const MAX_TEXT_CHARS: usize = 2000;

/// One block of a Notion page body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// Level is always within `1..=3`.
    Heading { level: u8, text: String },
    Paragraph { text: String },
    CodeBlock { language: String, text: String },
}

impl ContentBlock {
    pub fn heading(level: usize, text: impl Into<String>) -> Self {
        ContentBlock::Heading {
            level: level.clamp(1, 3) as u8,
            text: text.into(),
        }
    }

    /// The text carried by the block, without any markup.
    pub fn text(&self) -> &str {
        match self {
            ContentBlock::Heading { text, .. }
            | ContentBlock::Paragraph { text }
            | ContentBlock::CodeBlock { text, .. } => text,
        }
    }

    /// Notion wire shape for the block-append call.
    pub fn to_notion_json(&self) -> Value {
        match self {
            ContentBlock::Heading { level, text } => {
                let kind = format!("heading_{level}");
                let mut block = json!({ "object": "block", "type": kind });
                block[kind.as_str()] = json!({ "rich_text": rich_text(text) });
                block
            }
            ContentBlock::Paragraph { text } => json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": rich_text(text) },
            }),
            ContentBlock::CodeBlock { language, text } => json!({
                "object": "block",
                "type": "code",
                "code": {
                    "rich_text": rich_text(text),
                    "language": language,
                },
            }),
        }
    }
}

/// Rich-text array for `content`, split into segments Notion accepts.
fn rich_text(content: &str) -> Value {
    let chars: Vec<char> = content.chars().collect();
    if chars.is_empty() {
        return json!([{ "type": "text", "text": { "content": "" } }]);
    }
    let segments: Vec<Value> = chars
        .chunks(MAX_TEXT_CHARS)
        .map(|chunk| {
            let segment: String = chunk.iter().collect();
            json!({ "type": "text", "text": { "content": segment } })
        })
        .collect();
    Value::Array(segments)
}

/// Converts markup into blocks. Code blocks always take `language`; any hint
/// on the opening fence is ignored.
pub fn to_blocks(markup: &str, language: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut in_code = false;
    let mut code = String::new();

    for line in markup.split('\n') {
        let trimmed = line.trim();
        if trimmed.starts_with("```") {
            if in_code {
                flush_code(&mut blocks, &mut code, language);
            }
            in_code = !in_code;
            continue;
        }

        if in_code {
            code.push_str(line);
            code.push('\n');
        } else if trimmed.starts_with('#') {
            let level = trimmed.chars().take_while(|c| *c == '#').count();
            let text = trimmed.trim_start_matches('#').trim_start();
            blocks.push(ContentBlock::heading(level, text));
        } else if !trimmed.is_empty() {
            blocks.push(ContentBlock::Paragraph {
                text: line.to_string(),
            });
        }
    }

    // Unterminated fence.
    if in_code {
        flush_code(&mut blocks, &mut code, language);
    }

    blocks
}

fn flush_code(blocks: &mut Vec<ContentBlock>, code: &mut String, language: &str) {
    if code.is_empty() {
        return;
    }
    let text = code.strip_suffix('\n').unwrap_or(code.as_str()).to_string();
    blocks.push(ContentBlock::CodeBlock {
        language: language.to_string(),
        text,
    });
    code.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headings_paragraphs_and_code() {
        let markup = "# Title\n\nFirst line\nsecond line\n\n```js\nlet a = 1;\n\nlet b = 2;\n```\n## Sub";
        let blocks = to_blocks(markup, "javascript");
        assert_eq!(
            blocks,
            vec![
                ContentBlock::heading(1, "Title"),
                ContentBlock::Paragraph {
                    text: "First line".into()
                },
                ContentBlock::Paragraph {
                    text: "second line".into()
                },
                ContentBlock::CodeBlock {
                    language: "javascript".into(),
                    text: "let a = 1;\n\nlet b = 2;".into()
                },
                ContentBlock::heading(2, "Sub"),
            ]
        );
    }

    #[test]
    fn heading_level_is_clamped_to_three() {
        let blocks = to_blocks("##### Deep", "python");
        assert_eq!(
            blocks,
            vec![ContentBlock::Heading {
                level: 3,
                text: "Deep".into()
            }]
        );
    }

    #[test]
    fn unterminated_fence_is_flushed() {
        let blocks = to_blocks("intro\n```\nx = 1\ny = 2", "python");
        assert_eq!(
            blocks.last(),
            Some(&ContentBlock::CodeBlock {
                language: "python".into(),
                text: "x = 1\ny = 2".into()
            })
        );
    }

    #[test]
    fn empty_fence_emits_nothing() {
        assert!(to_blocks("```\n```", "c").is_empty());
    }

    #[test]
    fn paragraph_keeps_line_verbatim() {
        let blocks = to_blocks("   indented text  ", "c");
        assert_eq!(blocks[0].text(), "   indented text  ");
    }

    #[test]
    fn heading_wire_shape_uses_level_key() {
        let value = ContentBlock::heading(2, "Usage").to_notion_json();
        assert_eq!(value["type"], "heading_2");
        assert_eq!(
            value["heading_2"]["rich_text"][0]["text"]["content"],
            "Usage"
        );
    }

    #[test]
    fn code_wire_shape_carries_language() {
        let value = ContentBlock::CodeBlock {
            language: "python".into(),
            text: "pass".into(),
        }
        .to_notion_json();
        assert_eq!(value["type"], "code");
        assert_eq!(value["code"]["language"], "python");
        assert_eq!(value["code"]["rich_text"][0]["text"]["content"], "pass");
    }

    #[test]
    fn long_code_is_split_across_rich_text_segments() {
        let source = "function f() { return 1; }\n".repeat(100);
        let doc = crate::extract::parse_document(
            std::path::Path::new("big.js"),
            &format!("/** doc */\n{source}"),
            "javascript",
        );
        let blocks = to_blocks(&doc.content, "javascript");
        let code = blocks
            .iter()
            .find(|b| matches!(b, ContentBlock::CodeBlock { .. }))
            .expect("full code block");
        assert!(code.text().chars().count() > MAX_TEXT_CHARS);

        let value = code.to_notion_json();
        let segments = value["code"]["rich_text"].as_array().unwrap();
        assert!(segments.len() > 1);
        let mut rejoined = String::new();
        for segment in segments {
            let content = segment["text"]["content"].as_str().unwrap();
            assert!(content.chars().count() <= MAX_TEXT_CHARS);
            rejoined.push_str(content);
        }
        assert_eq!(rejoined, code.text());
    }

    #[test]
    fn text_outside_markup_survives() {
        let markup = "# Heading text\nplain words\n```\ncode body\n```";
        let blocks = to_blocks(markup, "c");
        let flattened: Vec<&str> = blocks.iter().map(|b| b.text()).collect();
        assert_eq!(flattened, vec!["Heading text", "plain words", "code body"]);
    }
}
