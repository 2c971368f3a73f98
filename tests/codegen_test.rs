//! Full-pipeline tests: parsed document in, transform result out, with
//! mock collaborators standing in for the package resolver and the content
//! loader.

use astro_codegen::ast::{Ast, Script, TemplateNode};
use astro_codegen::{
    codegen, CodegenError, CodegenOptions, ContentLoader, ContentRequest, ContentResult,
    OxcExpressionTranspiler, PackageResolver,
};
use async_trait::async_trait;

struct CdnResolver;

#[async_trait]
impl PackageResolver for CdnResolver {
    async fn resolve_package_url(&self, package: &str) -> Result<String, CodegenError> {
        Ok(format!("https://cdn.test/{}", package))
    }
}

struct GlobLoader;

#[async_trait]
impl ContentLoader for GlobLoader {
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
                "{} {} = [{}_0].map(mod => mod.__content);",
                request.declarator, request.namespace, request.namespace
            ),
        })
    }
}

fn options<'a>() -> CodegenOptions<'a> {
    CodegenOptions::new(
        "/proj/src/pages/index.astro",
        "/proj",
        "/proj/src",
        &CdnResolver,
        &GlobLoader,
        &OxcExpressionTranspiler,
    )
}

fn document(module: Option<&str>, css: Option<TemplateNode>, html: TemplateNode) -> Ast {
    Ast {
        module: module.map(|content| Script {
            content: content.to_string(),
        }),
        css,
        html,
    }
}

#[tokio::test]
async fn empty_script_and_style_compile_to_empty_artifacts() {
    let ast = document(None, None, TemplateNode::element("p", vec![], vec![]));
    let result = codegen(&ast, &options()).await.unwrap();
    assert_eq!(result.script, "");
    assert_eq!(result.css, None);
    assert_eq!(result.html, "h(\"p\", null)");
    assert!(result.imports.is_empty());
    assert!(result.create_collection.is_none());
}

#[tokio::test]
async fn single_host_element_round_trip() {
    let ast = document(
        None,
        None,
        TemplateNode::element("p", vec![], vec![TemplateNode::text("hi")]),
    );
    let result = codegen(&ast, &options()).await.unwrap();
    assert_eq!(result.html, "h(\"p\", null,\"hi\")");
}

#[tokio::test]
async fn exported_prop_with_default_leads_the_script() {
    let ast = document(
        Some("export let title = 'welcome';\nconsole.log(title);"),
        None,
        TemplateNode::element("h1", vec![], vec![]),
    );
    let result = codegen(&ast, &options()).await.unwrap();
    assert!(result
        .script
        .starts_with("let {title = 'welcome',} = props;"));
    assert!(result.script.ends_with("console.log(title);"));
}

#[tokio::test]
async fn style_subtree_joins_into_css() {
    let css_tree = TemplateNode::fragment(vec![
        TemplateNode::style("h1 { color: red; }"),
        TemplateNode::style("p { color: blue; }"),
    ]);
    let ast = document(None, Some(css_tree), TemplateNode::element("p", vec![], vec![]));
    let result = codegen(&ast, &options()).await.unwrap();
    assert_eq!(
        result.css.as_deref(),
        Some("h1 { color: red; }\n\np { color: blue; }")
    );
}

#[tokio::test]
async fn unknown_component_reference_fails_by_name() {
    let ast = document(None, None, TemplateNode::element("Missing", vec![], vec![]));
    let err = codegen(&ast, &options()).await.unwrap_err();
    match err {
        CodegenError::UnknownComponent { name, .. } => assert_eq!(name, "Missing"),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn svelte_load_hydration_scenario() {
    let module = "import Foo from './Foo.svelte';";
    let markup = TemplateNode::element(
        "Foo:load",
        vec![astro_codegen::ast::Attribute::expression("prop", "1")],
        vec![],
    );
    let ast = document(Some(module), None, markup);
    let result = codegen(&ast, &options()).await.unwrap();

    assert!(result
        .imports
        .contains(&"import Foo from './Foo.svelte';".to_string()));
    assert!(result
        .imports
        .contains(&"import {__svelte_load} from 'astro/dist/frontend/render/svelte.js';".to_string()));
    assert!(result.html.starts_with("h(__svelte_load(Foo, {"));
    assert!(result
        .html
        .contains("\"componentUrl\":\"/_astro/pages/Foo.svelte.js\""));
    assert!(result
        .html
        .contains("\"frameworkUrls\":{\"svelte\":\"https://cdn.test/svelte/internal\"}"));
    assert!(result.html.ends_with(", {\"prop\":1,})"));
}

#[tokio::test]
async fn markdown_wraps_nested_component_with_outer_attributes() {
    let module = "import Foo from './Foo.astro';";
    let markup = TemplateNode::element(
        "Markdown",
        vec![],
        vec![
            TemplateNode::text("**hi**"),
            TemplateNode::element("Foo", vec![], vec![]),
        ],
    );
    let ast = document(Some(module), None, markup);
    let result = codegen(&ast, &options()).await.unwrap();
    assert_eq!(
        result.html,
        "h(__astroMarkdownRender, null,\"**hi**\",h(__astroMarkdownRender, null,h(Foo, null)))"
    );
    assert!(result
        .imports
        .contains(&"import {__astroMarkdownRender} from 'astro/dist/frontend/render/markdown.js';".to_string()));
}

#[tokio::test]
async fn fetch_content_statement_is_replaced_and_imports_surface() {
    let module = "let posts = Astro.fetchContent('./post/*.md');";
    let ast = document(Some(module), None, TemplateNode::element("div", vec![], vec![]));
    let result = codegen(&ast, &options()).await.unwrap();
    assert!(!result.script.contains("fetchContent"));
    assert_eq!(
        result.script,
        "let posts = [posts_0].map(mod => mod.__content);"
    );
    assert!(result
        .imports
        .contains(&"import * as posts_0 from './post/*.md';".to_string()));
}

#[tokio::test]
async fn create_collection_is_emitted_separately() {
    let module = concat!(
        "export async function createCollection() {\n",
        "  let posts = Astro.fetchContent('./post/*.md');\n",
        "  return { async data() { return posts; } };\n",
        "}",
    );
    let ast = document(Some(module), None, TemplateNode::element("div", vec![], vec![]));
    let result = codegen(&ast, &options()).await.unwrap();
    assert_eq!(result.script, "");
    let collection = result.create_collection.unwrap();
    assert!(collection.starts_with("import * as posts_0 from './post/*.md';"));
    assert!(collection.contains("export async function createCollection()"));
    assert!(!collection.contains("fetchContent"));
    // The builder's own imports stay inside the fragment, not the result's
    // import list.
    assert!(result.imports.is_empty());
}

#[tokio::test]
async fn recompiling_the_same_document_is_idempotent() {
    let module = concat!(
        "import Foo from './Foo.svelte';\n",
        "import Header from './Header.astro';\n",
        "export let title = 'welcome';\n",
    );
    let markup = TemplateNode::fragment(vec![
        TemplateNode::element("Header", vec![], vec![]),
        TemplateNode::element("Foo:idle", vec![], vec![]),
        TemplateNode::element(
            "p",
            vec![astro_codegen::ast::Attribute::text("class", "lead")],
            vec![TemplateNode::text("hello")],
        ),
    ]);
    let ast = document(Some(module), None, markup);
    let first = codegen(&ast, &options()).await.unwrap();
    let second = codegen(&ast, &options()).await.unwrap();
    assert_eq!(first, second);
}
