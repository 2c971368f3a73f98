//! Expression safety compiler.
//!
//! Markup expressions arrive as raw source fragments that may contain
//! nested element literals. [`compile_expression_safe`] runs the fragment
//! through the configured [`ExpressionTranspiler`], trims it, and strips a
//! single trailing statement terminator so the result drops into the render
//! call as a plain expression.
//!
//! [`OxcExpressionTranspiler`] is the built-in transpiler: it parses the
//! fragment as TSX and rewrites every embedded JSX element or fragment into
//! the equivalent `h(...)` call by span replacement, leaving the rest of
//! the source untouched.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    JSXAttributeItem, JSXAttributeName, JSXAttributeValue, JSXChild, JSXElement, JSXElementName,
    JSXFragment, JSXMemberExpression, JSXMemberExpressionObject,
};
use oxc_ast_visit::Visit;
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::error::CodegenError;
use crate::options::ExpressionTranspiler;
use crate::util::js_string_literal;

/// Transpile one raw expression fragment into a valid expression string.
pub(crate) fn compile_expression_safe(
    raw: &str,
    transpiler: &dyn ExpressionTranspiler,
) -> Result<String, CodegenError> {
    let code = transpiler.transpile(raw)?;
    let code = code.trim();
    let code = code.strip_suffix(';').unwrap_or(code);
    Ok(code.to_string())
}

/// Default transpiler: TSX-parses the fragment and lowers embedded JSX to
/// hyperscript calls. Lowercase tags become quoted strings; capitalized
/// references stay identifiers; fragments become `h(Fragment, null, ...)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OxcExpressionTranspiler;

impl ExpressionTranspiler for OxcExpressionTranspiler {
    fn transpile(&self, code: &str) -> Result<String, CodegenError> {
        if code.trim().is_empty() {
            return Ok(String::new());
        }
        rewrite_module(code)
    }
}

fn tsx_source_type() -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true)
}

/// Rewrite every JSX literal in `source`, parsed as a TSX module. Fragments
/// are statement-tolerant at the top level, matching what a module-level
/// transpile accepts.
fn rewrite_module(source: &str) -> Result<String, CodegenError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, tsx_source_type()).parse();
    if !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|d| d.message.to_string())
            .unwrap_or_else(|| "failed to parse expression".to_string());
        return Err(CodegenError::Expression { message });
    }

    let mut rewriter = JsxRewriter {
        source,
        replacements: Vec::new(),
        error: None,
    };
    rewriter.visit_program(&ret.program);
    if let Some(err) = rewriter.error {
        return Err(err);
    }

    let mut out = source.to_string();
    rewriter.replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    for (span, code) in rewriter.replacements {
        out.replace_range(span.start as usize..span.end as usize, &code);
    }
    Ok(out)
}

/// Recursively lower an inner slice that is known to be an expression. The
/// slice is parenthesized before parsing so anonymous functions and object
/// literals keep expression meaning, and the wrapper is stripped again.
fn lower_slice(span: Span, source: &str) -> Result<String, CodegenError> {
    let slice = &source[span.start as usize..span.end as usize];
    let rewritten = rewrite_module(&format!("(\n{}\n)", slice))?;
    Ok(rewritten[2..rewritten.len() - 2].to_string())
}

struct JsxRewriter<'s> {
    source: &'s str,
    replacements: Vec<(Span, String)>,
    error: Option<CodegenError>,
}

impl<'a> Visit<'a> for JsxRewriter<'_> {
    fn visit_jsx_element(&mut self, element: &JSXElement<'a>) {
        if self.error.is_some() {
            return;
        }
        match render_element(element, self.source) {
            Ok(code) => self.replacements.push((element.span, code)),
            Err(err) => self.error = Some(err),
        }
    }

    fn visit_jsx_fragment(&mut self, fragment: &JSXFragment<'a>) {
        if self.error.is_some() {
            return;
        }
        match render_fragment(fragment, self.source) {
            Ok(code) => self.replacements.push((fragment.span, code)),
            Err(err) => self.error = Some(err),
        }
    }
}

fn render_element(element: &JSXElement<'_>, source: &str) -> Result<String, CodegenError> {
    let target = element_target(&element.opening_element.name);
    let attrs = render_attributes(&element.opening_element.attributes, source)?;
    let children = render_children(&element.children, source)?;
    Ok(render_call(&target, attrs.as_deref(), &children))
}

fn render_fragment(fragment: &JSXFragment<'_>, source: &str) -> Result<String, CodegenError> {
    let children = render_children(&fragment.children, source)?;
    Ok(render_call("Fragment", None, &children))
}

fn render_call(target: &str, attrs: Option<&str>, children: &[String]) -> String {
    let mut out = String::from("h(");
    out.push_str(target);
    out.push_str(", ");
    out.push_str(attrs.unwrap_or("null"));
    for child in children {
        out.push(',');
        out.push_str(child);
    }
    out.push(')');
    out
}

fn element_target(name: &JSXElementName<'_>) -> String {
    match name {
        JSXElementName::Identifier(id) => tag_or_reference(&id.name),
        JSXElementName::IdentifierReference(id) => tag_or_reference(&id.name),
        JSXElementName::NamespacedName(ns) => {
            js_string_literal(&format!("{}:{}", ns.namespace.name, ns.name.name))
        }
        JSXElementName::MemberExpression(me) => member_name(me),
        JSXElementName::ThisExpression(_) => "this".to_string(),
    }
}

fn tag_or_reference(name: &str) -> String {
    if name.starts_with(|c: char| c.is_ascii_lowercase()) {
        js_string_literal(name)
    } else {
        name.to_string()
    }
}

fn member_name(me: &JSXMemberExpression<'_>) -> String {
    let object = match &me.object {
        JSXMemberExpressionObject::IdentifierReference(id) => id.name.to_string(),
        JSXMemberExpressionObject::MemberExpression(inner) => member_name(inner),
        JSXMemberExpressionObject::ThisExpression(_) => "this".to_string(),
    };
    format!("{}.{}", object, me.property.name)
}

fn render_attributes(
    attributes: &[JSXAttributeItem<'_>],
    source: &str,
) -> Result<Option<String>, CodegenError> {
    let mut props: Vec<String> = Vec::new();
    for item in attributes {
        match item {
            JSXAttributeItem::Attribute(attr) => {
                let key = match &attr.name {
                    JSXAttributeName::Identifier(id) => js_string_literal(&id.name),
                    JSXAttributeName::NamespacedName(ns) => {
                        js_string_literal(&format!("{}:{}", ns.namespace.name, ns.name.name))
                    }
                };
                let value = match &attr.value {
                    None => "true".to_string(),
                    Some(JSXAttributeValue::StringLiteral(s)) => js_string_literal(&s.value),
                    Some(JSXAttributeValue::ExpressionContainer(container)) => {
                        match container.expression.as_expression() {
                            Some(expr) => lower_slice(expr.span(), source)?,
                            None => "undefined".to_string(),
                        }
                    }
                    Some(JSXAttributeValue::Element(el)) => render_element(el, source)?,
                    Some(JSXAttributeValue::Fragment(frag)) => render_fragment(frag, source)?,
                };
                props.push(format!("{}:{}", key, value));
            }
            JSXAttributeItem::SpreadAttribute(spread) => {
                let code = lower_slice(spread.argument.span(), source)?;
                props.push(format!("...({})", code));
            }
        }
    }
    if props.is_empty() {
        Ok(None)
    } else {
        Ok(Some(format!("{{{}}}", props.join(","))))
    }
}

fn render_children(children: &[JSXChild<'_>], source: &str) -> Result<Vec<String>, CodegenError> {
    let mut out = Vec::new();
    for child in children {
        match child {
            JSXChild::Text(text) => {
                let trimmed = text.value.trim();
                if !trimmed.is_empty() {
                    out.push(js_string_literal(trimmed));
                }
            }
            JSXChild::Element(el) => out.push(render_element(el, source)?),
            JSXChild::Fragment(frag) => out.push(render_fragment(frag, source)?),
            JSXChild::ExpressionContainer(container) => {
                if let Some(expr) = container.expression.as_expression() {
                    out.push(format!("({})", lower_slice(expr.span(), source)?));
                }
            }
            JSXChild::Spread(spread) => {
                out.push(format!(
                    "...({})",
                    lower_slice(spread.expression.span(), source)?
                ));
            }
        }
    }
    Ok(out)
}
