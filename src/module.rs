//! Frontmatter module compiler.
//!
//! Parses the embedded script as a TSX module (element literals, typing
//! annotations and top-level await all permitted) and partitions its
//! top-level statements in a single forward pass:
//!
//! - exported value declarations become component props,
//! - the reserved `__layout`/`__content` marker exports are kept verbatim,
//! - a `createCollection` function is captured whole for separate emission,
//! - import declarations are hoisted out and registered as components,
//! - `Astro.fetchContent("...")` declarations are recorded as pending
//!   content requests,
//! - everything else is re-emitted verbatim, in order.
//!
//! Classification is strictly synchronous; the parse arena is dropped
//! before any content request is awaited.

use std::collections::BTreeSet;

use log::warn;
use oxc_allocator::Allocator;
use oxc_ast::ast::{
    BindingPattern, Declaration, Expression, ImportDeclaration, ImportDeclarationSpecifier,
    Statement, VariableDeclaration, VariableDeclarationKind,
};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType, Span};

use crate::ast::Script;
use crate::codegen::CodegenState;
use crate::components::{plugin_for_extension, specifier_basename, specifier_extension, ComponentInfo, PluginKind};
use crate::error::CodegenError;
use crate::options::{CodegenOptions, ContentRequest};

/// Frontmatter global namespace and its content-fetch member.
const GLOBAL_NAMESPACE: &str = "Astro";
const FETCH_CONTENT: &str = "fetchContent";
/// Reserved collection-builder function name.
const COLLECTION_BUILDER: &str = "createCollection";
/// Reserved layout/content marker exports, re-emitted untouched.
const RESERVED_EXPORTS: [&str; 2] = ["__layout", "__content"];

#[derive(Debug)]
pub(crate) struct ModuleCompileResult {
    pub script: String,
    pub component_plugins: BTreeSet<PluginKind>,
    pub create_collection: Option<String>,
}

struct Prop {
    name: String,
    default: Option<String>,
}

struct PendingContent {
    namespace: String,
    specifier: String,
    declarator: &'static str,
}

struct ModulePartition {
    props: Vec<Prop>,
    content_requests: Vec<PendingContent>,
    retained: Vec<String>,
    collection_source: Option<String>,
    component_plugins: BTreeSet<PluginKind>,
}

fn module_source_type() -> SourceType {
    SourceType::default()
        .with_module(true)
        .with_typescript(true)
        .with_jsx(true)
}

fn slice(source: &str, span: Span) -> String {
    source[span.start as usize..span.end as usize].to_string()
}

pub(crate) async fn compile_module(
    module: Option<&Script>,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
) -> Result<ModuleCompileResult, CodegenError> {
    let Some(module) = module else {
        return Ok(ModuleCompileResult {
            script: String::new(),
            component_plugins: BTreeSet::new(),
            create_collection: None,
        });
    };

    let partition = classify_module(&module.content, state, opts)?;

    let mut content_code = String::new();
    for pending in &partition.content_requests {
        let request = ContentRequest::new(
            &pending.namespace,
            pending.declarator,
            &opts.filename,
            &opts.project_root,
        );
        let resolved = crate::content::resolve_content(&pending.specifier, &request, opts).await?;
        for import in resolved.imports {
            state.add_import(&import);
        }
        content_code.push_str(&resolved.code);
    }

    let mut parts: Vec<String> = Vec::new();
    if let Some(preamble) = props_statement(&partition.props) {
        parts.push(preamble);
    }
    if !content_code.is_empty() {
        parts.push(content_code);
    }
    parts.extend(partition.retained);
    let script = parts.join("\n");

    let create_collection = match partition.collection_source {
        Some(source) => Some(compile_collection(&source, opts).await?),
        None => None,
    };

    Ok(ModuleCompileResult {
        script,
        component_plugins: partition.component_plugins,
        create_collection,
    })
}

/// One forward pass over the top-level statements, bucketing each.
fn classify_module(
    content: &str,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
) -> Result<ModulePartition, CodegenError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, content, module_source_type()).parse();
    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset())
            .unwrap_or(0);
        return Err(CodegenError::script_parse(
            &opts.shortname(),
            content,
            offset,
            err.message.to_string(),
        ));
    }

    let mut partition = ModulePartition {
        props: Vec::new(),
        content_requests: Vec::new(),
        retained: Vec::new(),
        collection_source: None,
        component_plugins: BTreeSet::new(),
    };

    for stmt in &ret.program.body {
        match stmt {
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::VariableDeclaration(var)) => {
                    if is_reserved_export(var) {
                        partition.retained.push(slice(content, stmt.span()));
                    } else if let Some(props) = collect_props(var, content) {
                        partition.props.extend(props);
                    } else {
                        partition.retained.push(slice(content, stmt.span()));
                    }
                }
                Some(Declaration::FunctionDeclaration(func)) => {
                    let is_builder = func
                        .id
                        .as_ref()
                        .is_some_and(|id| id.name == COLLECTION_BUILDER);
                    if is_builder {
                        partition.collection_source = Some(slice(content, stmt.span()));
                    } else {
                        partition.retained.push(slice(content, stmt.span()));
                    }
                }
                _ => partition.retained.push(slice(content, stmt.span())),
            },
            Statement::FunctionDeclaration(func) => {
                let is_builder = func
                    .id
                    .as_ref()
                    .is_some_and(|id| id.name == COLLECTION_BUILDER);
                if is_builder {
                    partition.collection_source = Some(slice(content, stmt.span()));
                } else {
                    partition.retained.push(slice(content, stmt.span()));
                }
            }
            Statement::ImportDeclaration(import) => {
                register_import(import, content, state, opts, &mut partition.component_plugins);
            }
            Statement::VariableDeclaration(var) => {
                match match_content_call(var, &opts.shortname())? {
                    Some(call) => {
                        if call.redundant_await {
                            warn!(
                                "{}: awaiting {}.{}() is not necessary",
                                opts.shortname(),
                                GLOBAL_NAMESPACE,
                                FETCH_CONTENT
                            );
                        }
                        partition.content_requests.push(PendingContent {
                            namespace: call.namespace,
                            specifier: call.specifier,
                            declarator: call.declarator,
                        });
                    }
                    None => partition.retained.push(slice(content, stmt.span())),
                }
            }
            other => partition.retained.push(slice(content, other.span())),
        }
    }

    Ok(partition)
}

fn is_reserved_export(var: &VariableDeclaration<'_>) -> bool {
    var.declarations.iter().any(|decl| match &decl.id {
        BindingPattern::BindingIdentifier(id) => {
            RESERVED_EXPORTS.iter().any(|reserved| id.name == *reserved)
        }
        _ => false,
    })
}

/// Collect every identifier declarator as a prop. Returns `None` when any
/// binding is a destructuring pattern, in which case the whole statement is
/// retained instead.
fn collect_props(var: &VariableDeclaration<'_>, content: &str) -> Option<Vec<Prop>> {
    let mut props = Vec::new();
    for decl in &var.declarations {
        match &decl.id {
            BindingPattern::BindingIdentifier(id) => props.push(Prop {
                name: id.name.to_string(),
                default: decl.init.as_ref().map(|init| slice(content, init.span())),
            }),
            _ => return None,
        }
    }
    if props.is_empty() {
        None
    } else {
        Some(props)
    }
}

fn props_statement(props: &[Prop]) -> Option<String> {
    if props.is_empty() {
        return None;
    }
    let mut out = String::from("let {");
    for prop in props {
        out.push_str(&prop.name);
        if let Some(default) = &prop.default {
            out.push_str(" = ");
            out.push_str(default);
        }
        out.push(',');
    }
    out.push_str("} = props;");
    Some(out)
}

fn register_import(
    import: &ImportDeclaration<'_>,
    content: &str,
    state: &mut CodegenState,
    opts: &CodegenOptions<'_>,
    plugins: &mut BTreeSet<PluginKind>,
) {
    let url = import.source.value.to_string();
    let ext = specifier_extension(&url);
    let local = import
        .specifiers
        .as_ref()
        .and_then(|specifiers| specifiers.first())
        .map(|specifier| match specifier {
            ImportDeclarationSpecifier::ImportSpecifier(s) => s.local.name.to_string(),
            ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => s.local.name.to_string(),
            ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => s.local.name.to_string(),
        });
    let name = local.unwrap_or_else(|| specifier_basename(&url));
    let plugin = plugin_for_extension(&ext, &opts.extensions);
    if let Some(plugin) = plugin {
        plugins.insert(plugin);
    }
    state.components.insert(name, ComponentInfo { ext, url, plugin });
    state.add_import(&slice(content, import.span));
}

struct ContentCallMatch {
    namespace: String,
    specifier: String,
    declarator: &'static str,
    redundant_await: bool,
}

/// Match `let x = Astro.fetchContent("glob")`, with or without a redundant
/// `await`. The first matching declarator wins; a match with anything other
/// than a single string-literal argument is fatal.
fn match_content_call(
    var: &VariableDeclaration<'_>,
    shortname: &str,
) -> Result<Option<ContentCallMatch>, CodegenError> {
    for decl in &var.declarations {
        let BindingPattern::BindingIdentifier(id) = &decl.id else {
            continue;
        };
        let Some(init) = &decl.init else { continue };
        let (candidate, redundant_await) = match init {
            Expression::AwaitExpression(awaited) => (&awaited.argument, true),
            other => (other, false),
        };
        let Expression::CallExpression(call) = candidate else {
            continue;
        };
        let Expression::StaticMemberExpression(member) = &call.callee else {
            continue;
        };
        let Expression::Identifier(object) = &member.object else {
            continue;
        };
        if object.name != GLOBAL_NAMESPACE || member.property.name != FETCH_CONTENT {
            continue;
        }

        let specifier = call.arguments.first().and_then(|arg| match arg.as_expression() {
            Some(Expression::StringLiteral(literal)) => Some(literal.value.to_string()),
            _ => None,
        });
        let Some(specifier) = specifier else {
            return Err(CodegenError::NonStringContentSpecifier {
                filename: shortname.to_string(),
            });
        };

        let declarator = match var.kind {
            VariableDeclarationKind::Const => "const",
            _ => "let",
        };
        return Ok(Some(ContentCallMatch {
            namespace: id.name.to_string(),
            specifier,
            declarator,
            redundant_await,
        }));
    }
    Ok(None)
}

/// Re-process the captured collection builder: apply the same content-call
/// detection to its body, splice the loader's substitution code over each
/// match, and prefix the fragment's own import statements. The function
/// stays exported.
async fn compile_collection(
    source: &str,
    opts: &CodegenOptions<'_>,
) -> Result<String, CodegenError> {
    let exported = if source.trim_start().starts_with("export") {
        source.to_string()
    } else {
        format!("export {}", source)
    };

    let calls = extract_collection_calls(&exported, opts)?;
    if calls.is_empty() {
        return Ok(exported);
    }

    let mut imports: Vec<String> = Vec::new();
    let mut replacements: Vec<(Span, String)> = Vec::new();
    for (span, pending) in &calls {
        let request = ContentRequest::new(
            &pending.namespace,
            pending.declarator,
            &opts.filename,
            &opts.project_root,
        );
        let resolved = crate::content::resolve_content(&pending.specifier, &request, opts).await?;
        imports.extend(resolved.imports);
        replacements.push((*span, resolved.code));
    }

    let mut out = exported;
    replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    for (span, code) in replacements {
        out.replace_range(span.start as usize..span.end as usize, code.trim_end());
    }

    let mut prefix = imports.join("\n");
    if !prefix.is_empty() {
        prefix.push('\n');
    }
    Ok(format!("{}{}", prefix, out))
}

/// Find content-fetch declarations in the builder's own body. Synchronous:
/// the arena is gone before the caller awaits anything.
fn extract_collection_calls(
    source: &str,
    opts: &CodegenOptions<'_>,
) -> Result<Vec<(Span, PendingContent)>, CodegenError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, module_source_type()).parse();
    if let Some(err) = ret.errors.first() {
        let offset = err
            .labels
            .as_ref()
            .and_then(|labels| labels.first())
            .map(|label| label.offset())
            .unwrap_or(0);
        return Err(CodegenError::script_parse(
            &opts.shortname(),
            source,
            offset,
            err.message.to_string(),
        ));
    }

    let mut calls = Vec::new();
    for stmt in &ret.program.body {
        let Statement::ExportNamedDeclaration(export) = stmt else {
            continue;
        };
        let Some(Declaration::FunctionDeclaration(func)) = &export.declaration else {
            continue;
        };
        let Some(body) = &func.body else { continue };
        for inner in &body.statements {
            let Statement::VariableDeclaration(var) = inner else {
                continue;
            };
            if let Some(call) = match_content_call(var, &opts.shortname())? {
                if call.redundant_await {
                    warn!(
                        "{}: awaiting {}.{}() is not necessary",
                        opts.shortname(),
                        GLOBAL_NAMESPACE,
                        FETCH_CONTENT
                    );
                }
                calls.push((
                    inner.span(),
                    PendingContent {
                        namespace: call.namespace,
                        specifier: call.specifier,
                        declarator: call.declarator,
                    },
                ));
            }
        }
    }
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ContentLoader, ContentResult, ExpressionTranspiler, PackageResolver};
    use async_trait::async_trait;

    struct StubResolver;

    #[async_trait]
    impl PackageResolver for StubResolver {
        async fn resolve_package_url(&self, package: &str) -> Result<String, CodegenError> {
            Ok(format!("https://cdn.test/{}", package))
        }
    }

    struct StubLoader;

    #[async_trait]
    impl ContentLoader for StubLoader {
        async fn fetch_content(
            &self,
            specifier: &str,
            request: &ContentRequest,
        ) -> Result<ContentResult, CodegenError> {
            Ok(ContentResult {
                imports: vec![format!(
                    "import * as {}_0 from '{}';",
                    request.namespace, specifier
                )],
                code: format!(
                    "{} {} = [{}_0];",
                    request.declarator, request.namespace, request.namespace
                ),
            })
        }
    }

    struct StubTranspiler;

    impl ExpressionTranspiler for StubTranspiler {
        fn transpile(&self, code: &str) -> Result<String, CodegenError> {
            Ok(code.to_string())
        }
    }

    fn options<'a>() -> CodegenOptions<'a> {
        CodegenOptions::new(
            "/proj/src/pages/index.astro",
            "/proj",
            "/proj/src",
            &StubResolver,
            &StubLoader,
            &StubTranspiler,
        )
    }

    fn state() -> CodegenState {
        CodegenState::new()
    }

    async fn compile(content: &str) -> (ModuleCompileResult, CodegenState) {
        let script = Script {
            content: content.to_string(),
        };
        let mut state = state();
        let result = compile_module(Some(&script), &mut state, &options())
            .await
            .unwrap();
        (result, state)
    }

    #[tokio::test]
    async fn missing_module_compiles_to_empty_script() {
        let mut st = state();
        let result = compile_module(None, &mut st, &options()).await.unwrap();
        assert_eq!(result.script, "");
        assert!(result.create_collection.is_none());
        assert!(result.component_plugins.is_empty());
    }

    #[tokio::test]
    async fn exported_value_becomes_props_preamble() {
        let (result, _) = compile("export let title = 'welcome';").await;
        assert_eq!(result.script, "let {title = 'welcome',} = props;");
    }

    #[tokio::test]
    async fn multi_declarator_export_collects_every_prop() {
        let (result, _) = compile("export let a = 1, b;").await;
        assert_eq!(result.script, "let {a = 1,b,} = props;");
    }

    #[tokio::test]
    async fn reserved_marker_export_is_kept_verbatim() {
        let src = "export let __layout = './base.astro';";
        let (result, _) = compile(src).await;
        assert_eq!(result.script, src);
    }

    #[tokio::test]
    async fn imports_are_hoisted_and_registered() {
        let src = "import Counter from './Counter.svelte';\nlet x = 1;";
        let (result, state) = compile(src).await;
        assert_eq!(result.script, "let x = 1;");
        assert_eq!(
            state.import_statements,
            vec!["import Counter from './Counter.svelte';"]
        );
        let info = state.components.get("Counter").unwrap();
        assert_eq!(info.ext, ".svelte");
        assert_eq!(info.url, "./Counter.svelte");
        assert_eq!(info.plugin, Some(PluginKind::Svelte));
        assert!(result.component_plugins.contains(&PluginKind::Svelte));
    }

    #[tokio::test]
    async fn side_effect_import_registers_under_basename() {
        let (_, state) = compile("import './styles/global.css';").await;
        let info = state.components.get("global").unwrap();
        assert_eq!(info.plugin, None);
        assert_eq!(state.import_statements.len(), 1);
    }

    #[tokio::test]
    async fn fetch_content_is_replaced_by_loader_output() {
        let src = "let posts = Astro.fetchContent('./post/*.md');\nconsole.log(posts);";
        let (result, state) = compile(src).await;
        assert_eq!(result.script, "let posts = [posts_0];\nconsole.log(posts);");
        assert_eq!(
            state.import_statements,
            vec!["import * as posts_0 from './post/*.md';"]
        );
    }

    #[tokio::test]
    async fn redundant_await_is_unwrapped() {
        let src = "const posts = await Astro.fetchContent('./post/*.md');";
        let (result, _) = compile(src).await;
        assert_eq!(result.script, "const posts = [posts_0];");
    }

    #[tokio::test]
    async fn non_literal_specifier_is_fatal() {
        let script = Script {
            content: "let posts = Astro.fetchContent(glob);".to_string(),
        };
        let mut st = state();
        let err = compile_module(Some(&script), &mut st, &options())
            .await
            .unwrap_err();
        assert!(matches!(err, CodegenError::NonStringContentSpecifier { .. }));
    }

    #[tokio::test]
    async fn other_function_declarations_are_untouched() {
        let src = "function helper() { return 1; }";
        let (result, _) = compile(src).await;
        assert_eq!(result.script, src);
    }

    #[tokio::test]
    async fn collection_builder_is_captured_and_spliced() {
        let src = "export async function createCollection() {\n  let posts = Astro.fetchContent('./post/*.md');\n  return { paginate: true, async data() { return posts; } };\n}";
        let (result, _) = compile(src).await;
        assert_eq!(result.script, "");
        let collection = result.create_collection.unwrap();
        assert!(collection.starts_with("import * as posts_0 from './post/*.md';\n"));
        assert!(collection.contains("let posts = [posts_0];"));
        assert!(!collection.contains("fetchContent"));
        assert!(collection.contains("export async function createCollection()"));
    }

    #[tokio::test]
    async fn unexported_collection_builder_gains_export() {
        let src = "async function createCollection() { return {}; }";
        let (result, _) = compile(src).await;
        let collection = result.create_collection.unwrap();
        assert_eq!(collection, "export async function createCollection() { return {}; }");
    }

    #[tokio::test]
    async fn parse_failure_carries_location_and_frame() {
        let script = Script {
            content: "let = ;".to_string(),
        };
        let mut st = state();
        let err = compile_module(Some(&script), &mut st, &options())
            .await
            .unwrap_err();
        match err {
            CodegenError::ScriptParse { filename, frame, .. } => {
                assert_eq!(filename, "src/pages/index.astro");
                assert!(frame.contains("let = ;"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
