//! Compile configuration and external collaborators.
//!
//! This stage performs no I/O of its own. Globbing content collections,
//! resolving runtime packages to deployable URLs, and transpiling inline
//! expressions are all delegated to collaborators owned by the host build
//! tool. Exactly two of them may suspend ([`ContentLoader`] and
//! [`PackageResolver`]); the expression transpiler is pure CPU.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::components::PluginKind;
use crate::error::CodegenError;

/// Per-file compile configuration.
pub struct CodegenOptions<'a> {
    /// Absolute path of the file being compiled.
    pub filename: PathBuf,
    /// Project root; warnings and content requests are keyed relative to it.
    pub project_root: PathBuf,
    /// Root of the markup sources, used to compute public `/_astro/` asset
    /// URLs for compiled components.
    pub astro_root: PathBuf,
    /// Extension→plugin overrides, merged over the built-in defaults.
    pub extensions: HashMap<String, PluginKind>,
    pub resolver: &'a dyn PackageResolver,
    pub content: &'a dyn ContentLoader,
    pub transpiler: &'a dyn ExpressionTranspiler,
}

impl<'a> CodegenOptions<'a> {
    pub fn new(
        filename: impl Into<PathBuf>,
        project_root: impl Into<PathBuf>,
        astro_root: impl Into<PathBuf>,
        resolver: &'a dyn PackageResolver,
        content: &'a dyn ContentLoader,
        transpiler: &'a dyn ExpressionTranspiler,
    ) -> Self {
        CodegenOptions {
            filename: filename.into(),
            project_root: project_root.into(),
            astro_root: astro_root.into(),
            extensions: HashMap::new(),
            resolver,
            content,
            transpiler,
        }
    }

    /// Project-relative name of the compiling file, used to key warnings.
    pub(crate) fn shortname(&self) -> String {
        self.filename
            .strip_prefix(&self.project_root)
            .unwrap_or(self.filename.as_path())
            .to_string_lossy()
            .replace('\\', "/")
    }
}

/// Resolves an npm package specifier to a URL the browser can import.
#[async_trait]
pub trait PackageResolver: Send + Sync {
    async fn resolve_package_url(&self, package: &str) -> Result<String, CodegenError>;
}

/// One `Astro.fetchContent(...)` call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentRequest {
    /// Identifier the collection is bound to.
    pub namespace: String,
    /// Binding keyword at the call site, `let` or `const`.
    pub declarator: String,
    /// File issuing the request.
    pub filename: PathBuf,
    /// Project root the specifier resolves against.
    pub project_root: PathBuf,
}

/// What the loader hands back: import statements to hoist, plus inline code
/// replacing the original declaration.
#[derive(Debug, Clone, Default)]
pub struct ContentResult {
    pub imports: Vec<String>,
    pub code: String,
}

/// Resolves a glob-like content specifier into imports + substitution code.
#[async_trait]
pub trait ContentLoader: Send + Sync {
    async fn fetch_content(
        &self,
        specifier: &str,
        request: &ContentRequest,
    ) -> Result<ContentResult, CodegenError>;
}

/// Turns one raw expression fragment (which may contain markup literals)
/// into a valid standalone expression string.
pub trait ExpressionTranspiler: Send + Sync {
    fn transpile(&self, code: &str) -> Result<String, CodegenError>;
}

impl ContentRequest {
    pub(crate) fn new(
        namespace: &str,
        declarator: &str,
        filename: &Path,
        project_root: &Path,
    ) -> Self {
        ContentRequest {
            namespace: namespace.to_string(),
            declarator: declarator.to_string(),
            filename: filename.to_path_buf(),
            project_root: project_root.to_path_buf(),
        }
    }
}
