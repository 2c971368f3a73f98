//! Pure helpers: string-literal escaping, attribute computation, and path
//! normalization. No state, no I/O.

use std::path::{Component, Path, PathBuf};

use crate::ast::{Attribute, AttributePart, AttributeValue};
use crate::error::CodegenError;

/// JSON-escape a string into a JS string literal, quotes included.
pub(crate) fn js_string_literal(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Compute the serialized value for each attribute, in source order.
///
/// Boolean-true serializes to the literal `true`; boolean-false and absent
/// values are skipped outright (a malformed attribute from a buggy upstream
/// transform degrades instead of crashing). Multi-part values become a
/// parenthesized `+`-concatenation; a zero-part value collapses to the same
/// parenthesized form with nothing inside, matching the render runtime's
/// tolerance for it.
pub(crate) fn get_attributes(attrs: &[Attribute]) -> Result<Vec<(String, String)>, CodegenError> {
    let mut result = Vec::new();
    for attr in attrs {
        let parts = match &attr.value {
            AttributeValue::Boolean(true) => {
                result.push((attr.name.clone(), "true".to_string()));
                continue;
            }
            AttributeValue::Boolean(false) => continue,
            AttributeValue::Parts(parts) => parts,
        };
        match parts.as_slice() {
            [] => result.push((attr.name.clone(), "()".to_string())),
            [AttributePart::Expression { code }] => {
                result.push((attr.name.clone(), code.clone()));
            }
            [AttributePart::Text { raw }] => {
                result.push((attr.name.clone(), js_string_literal(raw)));
            }
            [AttributePart::Shorthand { .. }] => {
                return Err(CodegenError::UnknownAttributePart {
                    name: attr.name.clone(),
                });
            }
            many => {
                let mut joined = String::from("(");
                for (i, part) in many.iter().enumerate() {
                    if i > 0 {
                        joined.push('+');
                    }
                    match part {
                        AttributePart::Expression { code } => joined.push_str(code),
                        AttributePart::Text { raw } => joined.push_str(&js_string_literal(raw)),
                        AttributePart::Shorthand { .. } => {
                            return Err(CodegenError::UnknownAttributePart {
                                name: attr.name.clone(),
                            });
                        }
                    }
                }
                joined.push(')');
                result.push((attr.name.clone(), joined));
            }
        }
    }
    Ok(result)
}

/// Render computed attributes as a JS object literal, or `None` when every
/// attribute was skipped.
pub(crate) fn generate_attributes(attrs: &[(String, String)]) -> Option<String> {
    if attrs.is_empty() {
        return None;
    }
    let mut out = String::from("{");
    for (name, value) in attrs {
        out.push_str(&js_string_literal(name));
        out.push(':');
        out.push_str(value);
        out.push(',');
    }
    out.push('}');
    Some(out)
}

/// Lexical path normalization: resolves `.` and `..` without touching the
/// filesystem.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_literal_escapes() {
        assert_eq!(js_string_literal("hi"), "\"hi\"");
        assert_eq!(js_string_literal("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string_literal("line\nbreak"), "\"line\\nbreak\"");
    }

    #[test]
    fn boolean_true_serializes_to_literal() {
        let attrs = vec![Attribute::boolean("hidden", true)];
        let computed = get_attributes(&attrs).unwrap();
        assert_eq!(computed, vec![("hidden".to_string(), "true".to_string())]);
    }

    #[test]
    fn boolean_false_is_skipped() {
        let attrs = vec![
            Attribute::boolean("hidden", false),
            Attribute::text("id", "x"),
        ];
        let computed = get_attributes(&attrs).unwrap();
        assert_eq!(computed, vec![("id".to_string(), "\"x\"".to_string())]);
    }

    #[test]
    fn single_expression_part_stays_raw() {
        let attrs = vec![Attribute::expression("count", "1 + 1")];
        let computed = get_attributes(&attrs).unwrap();
        assert_eq!(computed[0].1, "1 + 1");
    }

    #[test]
    fn multi_part_concatenates_in_parens() {
        let attrs = vec![Attribute {
            name: "class".to_string(),
            value: AttributeValue::Parts(vec![
                AttributePart::Text {
                    raw: "btn ".to_string(),
                },
                AttributePart::Expression {
                    code: "variant".to_string(),
                },
            ]),
        }];
        let computed = get_attributes(&attrs).unwrap();
        assert_eq!(computed[0].1, "(\"btn \"+variant)");
    }

    #[test]
    fn empty_part_list_is_parenthesized_empty() {
        let attrs = vec![Attribute {
            name: "data-x".to_string(),
            value: AttributeValue::Parts(vec![]),
        }];
        let computed = get_attributes(&attrs).unwrap();
        assert_eq!(computed[0].1, "()");
    }

    #[test]
    fn shorthand_part_is_rejected() {
        let attrs = vec![Attribute {
            name: "value".to_string(),
            value: AttributeValue::Parts(vec![AttributePart::Shorthand {
                expression: "value".to_string(),
            }]),
        }];
        let err = get_attributes(&attrs).unwrap_err();
        assert!(matches!(err, CodegenError::UnknownAttributePart { name } if name == "value"));
    }

    #[test]
    fn attributes_object_renders_with_quoted_keys() {
        let computed = vec![
            ("class".to_string(), "\"big\"".to_string()),
            ("hidden".to_string(), "true".to_string()),
        ];
        assert_eq!(
            generate_attributes(&computed).unwrap(),
            "{\"class\":\"big\",\"hidden\":true,}"
        );
        assert!(generate_attributes(&[]).is_none());
    }

    #[test]
    fn normalize_resolves_dot_segments() {
        assert_eq!(
            normalize_path(Path::new("/a/b/../c/./d")),
            PathBuf::from("/a/c/d")
        );
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }
}
