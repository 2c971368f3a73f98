//! Style extraction: drains `<style>` blocks out of a subtree into the
//! compile state's CSS list. Nothing else in the tree is touched; the
//! markup compiler treats style nodes it meets the same way and emits
//! nothing for them.

use crate::ast::TemplateNode;
use crate::codegen::CodegenState;

/// Collect the contents of every style node under `node`, in tree order.
pub(crate) fn extract_styles(node: &TemplateNode, state: &mut CodegenState) {
    match node {
        TemplateNode::Style(style) => state.css.push(style.content.clone()),
        TemplateNode::Fragment(fragment) => {
            for child in &fragment.children {
                extract_styles(child, state);
            }
        }
        TemplateNode::Element(element) => {
            for child in &element.children {
                extract_styles(child, state);
            }
        }
        TemplateNode::Slot(slot) => {
            for child in &slot.children {
                extract_styles(child, state);
            }
        }
        TemplateNode::Expression(_)
        | TemplateNode::Text(_)
        | TemplateNode::CodeFence(_)
        | TemplateNode::Comment(_)
        | TemplateNode::MustacheTag => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_nested_style_blocks_in_order() {
        let tree = TemplateNode::fragment(vec![
            TemplateNode::style(".a { color: red; }"),
            TemplateNode::element("div", vec![], vec![TemplateNode::style(".b { color: blue; }")]),
        ]);
        let mut state = CodegenState::new();
        extract_styles(&tree, &mut state);
        assert_eq!(
            state.css,
            vec![".a { color: red; }", ".b { color: blue; }"]
        );
    }

    #[test]
    fn text_only_tree_collects_nothing() {
        let tree = TemplateNode::text("hi");
        let mut state = CodegenState::new();
        extract_styles(&tree, &mut state);
        assert!(state.css.is_empty());
    }
}
