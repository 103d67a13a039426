//! Plain-text parser producing a minimal hast-like tree.
//!
//! The tree has one `root` node whose children alternate between a `span.line`
//! element per source line and a `"\n"` text node. It does no highlighting; it
//! gives the engine a tree to diff when no real grammar is available.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Value, json};

use super::SourceParser;
use crate::constants::TREE_ROOT_TYPE;

/// Parser that splits text into line elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextParser;

impl PlainTextParser {
    /// Create the parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Synchronous form of [`SourceParser::parse_source`].
    #[must_use]
    pub fn parse(source: &str) -> Value {
        let mut children = Vec::new();
        for (index, line) in source.split('\n').enumerate() {
            if index > 0 {
                children.push(json!({ "type": "text", "value": "\n" }));
            }
            children.push(json!({
                "type": "element",
                "tagName": "span",
                "properties": { "className": ["line"], "dataLn": index + 1 },
                "children": [{ "type": "text", "value": line }],
            }));
        }
        json!({ "type": TREE_ROOT_TYPE, "children": children })
    }

    /// Recover the text of a tree produced by [`PlainTextParser::parse`].
    #[must_use]
    pub fn to_text(tree: &Value) -> String {
        let mut text = String::new();
        collect_text(tree, &mut text);
        text
    }
}

fn collect_text(node: &Value, out: &mut String) {
    if node.get("type").and_then(Value::as_str) == Some("text")
        && let Some(value) = node.get("value").and_then(Value::as_str)
    {
        out.push_str(value);
    }
    if let Some(children) = node.get("children").and_then(Value::as_array) {
        for child in children {
            collect_text(child, out);
        }
    }
}

#[async_trait]
impl SourceParser for PlainTextParser {
    async fn parse_source(&self, source: &str, _file_name: &str) -> Result<Value> {
        Ok(Self::parse(source))
    }
}
