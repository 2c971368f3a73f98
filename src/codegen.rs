//! Compile-pass orchestration.
//!
//! One [`CodegenState`] is constructed per file compile and owned by that
//! invocation alone; nothing is shared between concurrent compiles. Script
//! and markup compilation are synchronous tree walks; the only suspension
//! points are content-collection resolution and dynamic-import acquisition,
//! and the latter completes before markup compilation starts.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::ast::Ast;
use crate::components::{acquire_dynamic_imports, ComponentInfo, FrameworkRuntime};
use crate::error::CodegenError;
use crate::markup::compile_markup;
use crate::module::compile_module;
use crate::options::CodegenOptions;
use crate::style::extract_styles;

/// Mutable state threaded through every sub-pass of one compile. The
/// compiling file's identity lives in [`CodegenOptions`], passed alongside.
pub struct CodegenState {
    /// Component registry: local name → import info. Populated during
    /// script compilation, read-only afterwards.
    pub(crate) components: HashMap<String, ComponentInfo>,
    /// Accumulated CSS fragments, in discovery order.
    pub(crate) css: Vec<String>,
    /// Hoisted import/export statements, first-discovery order.
    pub(crate) import_statements: Vec<String>,
    seen_imports: HashSet<String>,
    /// Runtime URLs per framework package; complete before markup compile.
    pub(crate) dynamic_imports: BTreeMap<FrameworkRuntime, String>,
}

impl CodegenState {
    pub(crate) fn new() -> Self {
        CodegenState {
            components: HashMap::new(),
            css: Vec::new(),
            import_statements: Vec::new(),
            seen_imports: HashSet::new(),
            dynamic_imports: BTreeMap::new(),
        }
    }

    /// Record an import/export statement; duplicates collapse, first
    /// occurrence keeps its position.
    pub(crate) fn add_import(&mut self, statement: &str) {
        let statement = statement.trim();
        if self.seen_imports.insert(statement.to_string()) {
            self.import_statements.push(statement.to_string());
        }
    }
}

/// Everything the bundler needs for one compiled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResult {
    /// Rewritten frontmatter module body. Valid standalone module code once
    /// prefixed with `imports`.
    pub script: String,
    /// The render expression for the markup tree.
    pub html: String,
    /// Joined style blocks; absent when the document has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    /// Import/export statements, first-discovery order, de-duplicated.
    pub imports: Vec<String>,
    /// Extracted collection-builder source, content resolution inlined.
    #[serde(rename = "createCollection", skip_serializing_if = "Option::is_none")]
    pub create_collection: Option<String>,
}

/// Compile one parsed document into its transform result.
pub async fn codegen(
    ast: &Ast,
    opts: &CodegenOptions<'_>,
) -> Result<TransformResult, CodegenError> {
    let mut state = CodegenState::new();

    if let Some(css) = &ast.css {
        extract_styles(css, &mut state);
    }

    let module = compile_module(ast.module.as_ref(), &mut state, opts).await?;

    state.dynamic_imports =
        acquire_dynamic_imports(&module.component_plugins, opts.resolver).await?;

    let html = compile_markup(&ast.html, &mut state, opts)?;

    Ok(TransformResult {
        script: module.script,
        html,
        css: if state.css.is_empty() {
            None
        } else {
            Some(state.css.join("\n\n"))
        },
        imports: state.import_statements,
        create_collection: module.create_collection,
    })
}
