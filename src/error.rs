//! Error taxonomy for a compile pass.
//!
//! Two fatal classes: parse errors (malformed frontmatter or collection
//! builder, carrying a source location and a rendered code frame) and
//! semantic/policy errors (unknown component, bad hydration qualifier,
//! non-literal content specifier, ...). A compile either returns a complete
//! result or one of these; there is no partial output. Warnings are not
//! errors; they go through the `log` facade and never change the result.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodegenError {
    /// The embedded script (or collection-builder body) failed to parse.
    #[error("{filename}:{line}:{column} {message}\n{frame}")]
    ScriptParse {
        filename: String,
        line: usize,
        column: usize,
        message: String,
        frame: String,
    },

    /// Markup references a component name the frontmatter never imported.
    #[error("unknown component: <{name}> in {filename}")]
    UnknownComponent { name: String, filename: String },

    /// A hydration qualifier was placed on a component of the markup
    /// language's own kind, which only renders statically.
    #[error("<{name}:{qualifier}>: astro components are static and do not take a hydration qualifier")]
    UnsupportedHydration { name: String, qualifier: String },

    /// The imported component's extension maps to no known renderer.
    #[error("no renderer found for <{name}> (\"{url}\") in {filename}")]
    UnresolvedPlugin {
        name: String,
        url: String,
        filename: String,
    },

    /// `Astro.fetchContent(...)` was called with something other than a
    /// single string literal.
    #[error("Astro.fetchContent() only takes a string literal ({filename})")]
    NonStringContentSpecifier { filename: String },

    /// An attribute carried a part kind this stage does not compile.
    #[error("unknown attribute part on \"{name}\"")]
    UnknownAttributePart { name: String },

    /// The package resolver could not produce a runtime URL.
    #[error("failed to resolve package \"{package}\": {message}")]
    PackageResolve { package: String, message: String },

    /// The content loader failed for a collection specifier.
    #[error("failed to load content \"{specifier}\": {message}")]
    ContentLoad { specifier: String, message: String },

    /// An interpolated expression could not be transpiled.
    #[error("invalid expression: {message}")]
    Expression { message: String },

    /// A hydrated component's framework runtime URL was never acquired.
    #[error("no runtime url acquired for \"{package}\"")]
    MissingFrameworkUrl { package: String },
}

impl CodegenError {
    /// Build a [`CodegenError::ScriptParse`] from a byte offset into the
    /// failing source, rendering the surrounding lines.
    pub(crate) fn script_parse(
        filename: &str,
        source: &str,
        offset: usize,
        message: String,
    ) -> Self {
        let (line, column) = line_column(source, offset);
        CodegenError::ScriptParse {
            filename: filename.to_string(),
            line,
            column,
            message,
            frame: code_frame(source, line, column),
        }
    }
}

/// 1-indexed line/column of a byte offset.
pub(crate) fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let mut line = 1;
    let mut column = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Render a small excerpt around `line`, with a caret under `column`.
pub(crate) fn code_frame(source: &str, line: usize, column: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = line.saturating_sub(3);
    let end = (line + 2).min(lines.len());
    let width = format!("{}", end).len();

    let mut out = String::new();
    for (idx, text) in lines.iter().enumerate().take(end).skip(start) {
        let number = idx + 1;
        let marker = if number == line { ">" } else { " " };
        out.push_str(&format!("{} {:>width$} | {}\n", marker, number, text));
        if number == line {
            out.push_str(&format!(
                "  {:>width$} | {}^\n",
                "",
                " ".repeat(column.saturating_sub(1)),
            ));
        }
    }
    out
}
