//! Input document tree.
//!
//! The upstream template parser hands this stage a fully parsed document:
//! an optional frontmatter script, an optional style subtree, and the
//! markup tree. The node grammar is closed: every kind the parser can
//! produce has a variant here, and every traversal in this crate matches
//! exhaustively, so a parser/compiler version mismatch surfaces as a type
//! error instead of a runtime failure.

use serde::{Deserialize, Serialize};

/// A parsed `.astro` document, ready for code generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ast {
    /// Frontmatter script block, if the document has one.
    pub module: Option<Script>,
    /// Style subtree (the document-level `<style>` blocks).
    pub css: Option<TemplateNode>,
    /// Markup tree.
    pub html: TemplateNode,
}

/// Raw frontmatter script source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Script {
    pub content: String,
}

/// One markup node. Tagged the way the upstream parser serializes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateNode {
    /// Transparent grouping node; children attach to the nearest enclosing
    /// call.
    Fragment(FragmentNode),
    /// Host element, structural tag (`head`, `title`, ...) or component
    /// reference; the name decides at compile time.
    Element(ElementNode),
    /// `<slot>`: renders the caller-provided children.
    Slot(SlotNode),
    /// Inline `<style>` block; drained into the CSS output.
    Style(StyleNode),
    Text(TextNode),
    /// `{...}` interpolation. `code_chunks` holds the raw source fragments
    /// around any markup children nested inside the expression; children
    /// interleave between chunks in order.
    Expression(ExpressionNode),
    /// Fenced raw block, emitted verbatim as a string literal.
    CodeFence(CodeFenceNode),
    Comment(CommentNode),
    /// Bare mustache marker left behind by the parser; contributes nothing.
    MustacheTag,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FragmentNode {
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementNode {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotNode {
    /// Attributes are ignored by this stage but preserved by the parser.
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleNode {
    pub content: String,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextNode {
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionNode {
    pub code_chunks: Vec<String>,
    #[serde(default)]
    pub children: Vec<TemplateNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeFenceNode {
    pub raw: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(default)]
    pub data: String,
}

/// One attribute on an element/component reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// Attribute payload. Booleans come from bare attributes (`disabled`) or an
/// upstream transform dropping a value; everything else is a part list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Parts(Vec<AttributePart>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AttributePart {
    Text { raw: String },
    Expression { code: String },
    /// `{name}` shorthand. The parser grammar allows it; this stage does
    /// not, and rejects it as an unknown attribute part.
    Shorthand { expression: String },
}

impl TemplateNode {
    pub fn fragment(children: Vec<TemplateNode>) -> Self {
        TemplateNode::Fragment(FragmentNode { children })
    }

    pub fn element(name: &str, attributes: Vec<Attribute>, children: Vec<TemplateNode>) -> Self {
        TemplateNode::Element(ElementNode {
            name: name.to_string(),
            attributes,
            children,
        })
    }

    pub fn text(value: &str) -> Self {
        TemplateNode::Text(TextNode {
            value: value.to_string(),
        })
    }

    pub fn expression(code_chunks: Vec<&str>, children: Vec<TemplateNode>) -> Self {
        TemplateNode::Expression(ExpressionNode {
            code_chunks: code_chunks.into_iter().map(str::to_string).collect(),
            children,
        })
    }

    pub fn style(content: &str) -> Self {
        TemplateNode::Style(StyleNode {
            content: content.to_string(),
            attributes: Vec::new(),
        })
    }
}

impl Attribute {
    pub fn boolean(name: &str, value: bool) -> Self {
        Attribute {
            name: name.to_string(),
            value: AttributeValue::Boolean(value),
        }
    }

    pub fn text(name: &str, raw: &str) -> Self {
        Attribute {
            name: name.to_string(),
            value: AttributeValue::Parts(vec![AttributePart::Text {
                raw: raw.to_string(),
            }]),
        }
    }

    pub fn expression(name: &str, code: &str) -> Self {
        Attribute {
            name: name.to_string(),
            value: AttributeValue::Parts(vec![AttributePart::Expression {
                code: code.to_string(),
            }]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_tags_round_trip_through_serde() {
        let node = TemplateNode::element(
            "p",
            vec![Attribute::text("class", "big")],
            vec![TemplateNode::text("hi")],
        );
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"type\":\"element\""));
        let back: TemplateNode = serde_json::from_str(&json).unwrap();
        match back {
            TemplateNode::Element(el) => {
                assert_eq!(el.name, "p");
                assert_eq!(el.attributes.len(), 1);
                assert_eq!(el.children.len(), 1);
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }

    #[test]
    fn boolean_attribute_deserializes_untagged() {
        let attr: Attribute = serde_json::from_str(r#"{"name":"hidden","value":true}"#).unwrap();
        assert!(matches!(attr.value, AttributeValue::Boolean(true)));
    }
}
