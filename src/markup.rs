//! Markup tree compiler.
//!
//! Depth-first, exhaustive-match traversal of the closed node enum into an
//! explicit tree of render calls, serialized once at the end as nested
//! hyperscript: `h(target, attrs_or_null,child,…)`. The inside-markdown
//! marker travels as a recursion parameter (the captured `Markdown`
//! attribute string), so components met under markdown content get an
//! extra markdown-render wrapper re-applying the outer prose styling.

use crate::ast::{ElementNode, ExpressionNode, TemplateNode};
use crate::codegen::CodegenState;
use crate::components::get_component_wrapper;
use crate::error::CodegenError;
use crate::expression::compile_expression_safe;
use crate::options::CodegenOptions;
use crate::util::{generate_attributes, get_attributes, js_string_literal};

/// Reserved markdown component name and the built-in renderer behind it.
const MARKDOWN_COMPONENT: &str = "Markdown";
const MARKDOWN_RENDERER: &str = "__astroMarkdownRender";
const MARKDOWN_RENDERER_IMPORT: &str =
    "import {__astroMarkdownRender} from 'astro/dist/frontend/render/markdown.js';";

/// Intermediate render tree; building it first keeps the emitted structure
/// testable without string matching mid-traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RenderNode {
    Call {
        target: String,
        attrs: Option<String>,
        children: Vec<RenderNode>,
    },
    /// `<slot>`: the conventional children passthrough.
    Passthrough { children: Vec<RenderNode> },
    Expr(String),
    Text(String),
}

/// Compile the markup tree into one render expression string.
pub(crate) fn compile_markup(
    root: &TemplateNode,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
) -> Result<String, CodegenError> {
    let nodes = compile_node(root, state, opts, None, false)?;
    let mut out = String::new();
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        serialize(node, &mut out);
    }
    Ok(out)
}

/// Compile one node. A node may contribute zero results (comments, styles,
/// dropped whitespace) or several (a fragment is transparent).
///
/// `markdown` carries the enclosing `Markdown` component's attribute string,
/// if any; `parent_is_markdown` is set only for its direct children, where
/// whitespace is significant.
fn compile_node(
    node: &TemplateNode,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
    markdown: Option<&str>,
    parent_is_markdown: bool,
) -> Result<Vec<RenderNode>, CodegenError> {
    match node {
        TemplateNode::Fragment(fragment) => {
            compile_children(&fragment.children, state, opts, markdown, parent_is_markdown)
        }
        TemplateNode::Comment(_) | TemplateNode::MustacheTag => Ok(vec![]),
        TemplateNode::Text(text) => {
            if text.value.trim().is_empty() && !parent_is_markdown {
                Ok(vec![])
            } else {
                Ok(vec![RenderNode::Text(text.value.clone())])
            }
        }
        TemplateNode::CodeFence(fence) => Ok(vec![RenderNode::Text(fence.raw.clone())]),
        TemplateNode::Style(style) => {
            state.css.push(style.content.clone());
            Ok(vec![])
        }
        TemplateNode::Slot(slot) => {
            let children = compile_children(&slot.children, state, opts, markdown, false)?;
            Ok(vec![RenderNode::Passthrough { children }])
        }
        TemplateNode::Expression(expression) => {
            compile_expression_node(expression, state, opts, markdown)
        }
        TemplateNode::Element(element) => compile_element(element, state, opts, markdown),
    }
}

fn compile_children(
    children: &[TemplateNode],
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
    markdown: Option<&str>,
    parent_is_markdown: bool,
) -> Result<Vec<RenderNode>, CodegenError> {
    let mut out = Vec::new();
    for child in children {
        out.extend(compile_node(child, state, opts, markdown, parent_is_markdown)?);
    }
    Ok(out)
}

/// Compile child subtrees first, interleave their serialized form back into
/// the raw code fragments in original order, then run the assembled source
/// through the expression safety compiler.
fn compile_expression_node(
    expression: &ExpressionNode,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
    markdown: Option<&str>,
) -> Result<Vec<RenderNode>, CodegenError> {
    let mut compiled_children = Vec::new();
    for child in &expression.children {
        let nodes = compile_node(child, state, opts, markdown, false)?;
        let mut serialized = String::new();
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                serialized.push(',');
            }
            serialize(node, &mut serialized);
        }
        compiled_children.push(serialized);
    }

    let mut raw = String::new();
    let mut next_child = 0;
    for chunk in &expression.code_chunks {
        raw.push_str(chunk);
        if next_child < compiled_children.len() {
            raw.push_str(&compiled_children[next_child]);
            next_child += 1;
        }
    }
    for rest in &compiled_children[next_child..] {
        raw.push_str(rest);
    }

    let code = compile_expression_safe(&raw, opts.transpiler)?;
    Ok(vec![RenderNode::Expr(code)])
}

fn compile_element(
    element: &ElementNode,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
    markdown: Option<&str>,
) -> Result<Vec<RenderNode>, CodegenError> {
    let name = element.name.as_str();
    let computed = get_attributes(&element.attributes)?;
    let attrs = generate_attributes(&computed);

    // Lowercase first letter: a literal host element (head/title included).
    if name.starts_with(|c: char| c.is_ascii_lowercase()) {
        let children = compile_children(&element.children, state, opts, markdown, false)?;
        return Ok(vec![RenderNode::Call {
            target: js_string_literal(name),
            attrs,
            children,
        }]);
    }

    if name == MARKDOWN_COMPONENT {
        state.add_import(MARKDOWN_RENDERER_IMPORT);
        let marker = attrs.clone().unwrap_or_else(|| "null".to_string());
        let children =
            compile_children(&element.children, state, opts, Some(&marker), true)?;
        return Ok(vec![RenderNode::Call {
            target: MARKDOWN_RENDERER.to_string(),
            attrs,
            children,
        }]);
    }

    // Custom component: consult the registry populated during script
    // compilation.
    let component_name = name.split(':').next().unwrap_or(name);
    let info = state
        .components
        .get(component_name)
        .cloned()
        .ok_or_else(|| CodegenError::UnknownComponent {
            name: component_name.to_string(),
            filename: opts.shortname(),
        })?;
    let wrapper = get_component_wrapper(name, &info, opts, &state.dynamic_imports)?;
    if let Some(import) = &wrapper.wrapper_import {
        state.add_import(import);
    }

    let children = compile_children(&element.children, state, opts, markdown, false)?;
    let call = RenderNode::Call {
        target: wrapper.wrapper,
        attrs,
        children,
    };

    // Inside markdown content, re-apply the outer Markdown attributes
    // around the component so its children keep the prose styling.
    if let Some(marker) = markdown {
        state.add_import(MARKDOWN_RENDERER_IMPORT);
        return Ok(vec![RenderNode::Call {
            target: MARKDOWN_RENDERER.to_string(),
            attrs: Some(marker.to_string()),
            children: vec![call],
        }]);
    }
    Ok(vec![call])
}

fn serialize(node: &RenderNode, out: &mut String) {
    match node {
        RenderNode::Call {
            target,
            attrs,
            children,
        } => {
            out.push_str("h(");
            out.push_str(target);
            out.push_str(", ");
            out.push_str(attrs.as_deref().unwrap_or("null"));
            for child in children {
                out.push(',');
                serialize(child, out);
            }
            out.push(')');
        }
        RenderNode::Passthrough { children } => {
            out.push_str("(children");
            for child in children {
                out.push(',');
                serialize(child, out);
            }
            out.push(')');
        }
        RenderNode::Expr(code) => {
            out.push('(');
            out.push_str(code);
            out.push(')');
        }
        RenderNode::Text(value) => out.push_str(&js_string_literal(value)),
    }
}
