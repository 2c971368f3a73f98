//! # Astro Codegen (native)
//!
//! Final compilation stage for `.astro` components. Takes a parsed document
//! (frontmatter script, style block, markup tree) and emits executable
//! render code plus auxiliary artifacts:
//!
//! - `script`: the rewritten frontmatter module body (props destructured
//!   from `props`, content collections inlined, imports hoisted out),
//! - `html`: one nested `h(...)` call expression for the markup tree,
//! - `css`: the joined style blocks, when any exist,
//! - `imports`: hoisted import/export statements, first-discovery order,
//! - `createCollection`: the extracted collection-builder source, when the
//!   frontmatter exports one.
//!
//! ## Compile pass
//!
//! 1. Style extraction drains the style subtree into the compile state.
//! 2. The frontmatter module is parsed (TSX, top-level await permitted) and
//!    its top-level statements are partitioned: prop exports, reserved
//!    marker exports, the `createCollection` builder, component imports,
//!    and `Astro.fetchContent(...)` requests are each pulled out; the rest
//!    is re-emitted verbatim.
//! 3. Pending content requests resolve through the [`ContentLoader`]
//!    collaborator, in source order.
//! 4. Runtime URLs for every referenced plugin kind resolve through the
//!    [`PackageResolver`] collaborator. Markup compilation will not start
//!    before this completes.
//! 5. The markup tree compiles into the render expression, consulting the
//!    component registry populated in step 2.
//!
//! All state lives in one [`codegen::CodegenState`] per invocation; nothing
//! is shared between concurrent compiles of different files.
//!
//! [`ContentLoader`]: options::ContentLoader
//! [`PackageResolver`]: options::PackageResolver

pub mod ast;
pub mod codegen;
pub mod components;
pub mod error;
pub mod options;

mod content;
mod expression;
mod markup;
mod module;
mod style;
mod util;

pub use codegen::{codegen, TransformResult};
pub use components::{FrameworkRuntime, HydrationKind, PluginKind};
pub use error::CodegenError;
pub use expression::OxcExpressionTranspiler;
pub use options::{
    CodegenOptions, ContentLoader, ContentRequest, ContentResult, ExpressionTranspiler,
    PackageResolver,
};
