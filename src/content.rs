//! Content collection resolution.
//!
//! A thin adapter over the external [`ContentLoader`]: this stage performs
//! no globbing or file I/O itself. The call site's binding keyword and the
//! requesting file travel with the request so the loader can reproduce the
//! original declaration shape in its substitution code. Requests resolve
//! sequentially, in source order, keeping the emitted import list
//! deterministic.
//!
//! [`ContentLoader`]: crate::options::ContentLoader

use crate::error::CodegenError;
use crate::options::{CodegenOptions, ContentRequest, ContentResult};

pub(crate) async fn resolve_content(
    specifier: &str,
    request: &ContentRequest,
    opts: &CodegenOptions<'_>,
) -> Result<ContentResult, CodegenError> {
    opts.content.fetch_content(specifier, request).await
}
