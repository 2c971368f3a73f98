//! Component registry and wrapper generation.
//!
//! Script compilation registers every imported name here; markup
//! compilation consults the registry for each component reference and asks
//! for a wrapper: which render helper to call, which helper import to add,
//! and, for hydrated components, the options object carrying the public
//! asset URL and the framework runtime URLs.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::CodegenError;
use crate::options::{CodegenOptions, PackageResolver};
use crate::util::normalize_path;

/// Public URL prefix for compiled component assets.
const ASSET_PREFIX: &str = "/_astro/";
/// Module path family the render helpers are imported from.
const RENDER_MODULE_BASE: &str = "astro/dist/frontend/render";
/// Internal component path treated as the markup language's own kind when
/// the import specifier carries no extension.
const INTERNAL_COMPONENT_PATH: &str = "astro/components";

/// Which rendering library owns an imported component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginKind {
    Astro,
    Preact,
    React,
    Svelte,
    Vue,
}

impl PluginKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginKind::Astro => "astro",
            PluginKind::Preact => "preact",
            PluginKind::React => "react",
            PluginKind::Svelte => "svelte",
            PluginKind::Vue => "vue",
        }
    }

    /// Framework runtimes a hydrated component of this kind needs in the
    /// browser. The markup language's own kind never hydrates.
    fn runtimes(self) -> &'static [FrameworkRuntime] {
        match self {
            PluginKind::Astro => &[],
            PluginKind::Preact => &[FrameworkRuntime::Preact],
            PluginKind::React => &[FrameworkRuntime::React, FrameworkRuntime::ReactDom],
            PluginKind::Svelte => &[FrameworkRuntime::Svelte],
            PluginKind::Vue => &[FrameworkRuntime::Vue],
        }
    }

    /// Output extension of the compiled component asset.
    fn output_extension(self) -> &'static str {
        match self {
            PluginKind::Svelte => ".svelte.js",
            PluginKind::Vue => ".vue.js",
            _ => ".js",
        }
    }
}

/// Keys of the dynamic import map: one per framework runtime package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FrameworkRuntime {
    Preact,
    React,
    ReactDom,
    Svelte,
    Vue,
}

impl FrameworkRuntime {
    /// Key used in the emitted `frameworkUrls` object.
    pub fn as_str(self) -> &'static str {
        match self {
            FrameworkRuntime::Preact => "preact",
            FrameworkRuntime::React => "react",
            FrameworkRuntime::ReactDom => "react-dom",
            FrameworkRuntime::Svelte => "svelte",
            FrameworkRuntime::Vue => "vue",
        }
    }

    /// Package specifier handed to the resolver.
    fn package(self) -> &'static str {
        match self {
            FrameworkRuntime::Svelte => "svelte/internal",
            other => other.as_str(),
        }
    }
}

/// When (or whether) a component becomes interactive on the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrationKind {
    Load,
    Idle,
    Visible,
}

impl HydrationKind {
    pub fn parse(qualifier: &str) -> Option<Self> {
        match qualifier {
            "load" => Some(HydrationKind::Load),
            "idle" => Some(HydrationKind::Idle),
            "visible" => Some(HydrationKind::Visible),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HydrationKind::Load => "load",
            HydrationKind::Idle => "idle",
            HydrationKind::Visible => "visible",
        }
    }
}

/// One registered component import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentInfo {
    /// File extension of the import specifier, e.g. `.svelte`.
    pub ext: String,
    /// Import specifier exactly as written.
    pub url: String,
    /// Owning renderer, when the extension mapped to one.
    pub plugin: Option<PluginKind>,
}

/// Built-in extension→plugin mapping; caller overrides merge on top.
pub(crate) fn default_extensions() -> HashMap<String, PluginKind> {
    HashMap::from([
        (".astro".to_string(), PluginKind::Astro),
        (".jsx".to_string(), PluginKind::React),
        (".vue".to_string(), PluginKind::Vue),
        (".svelte".to_string(), PluginKind::Svelte),
    ])
}

/// Derive the extension of an import specifier, falling back to the
/// internal component path convention when there is none.
pub(crate) fn specifier_extension(url: &str) -> String {
    let basename = url.rsplit('/').next().unwrap_or(url);
    if let Some(dot) = basename.rfind('.') {
        if dot > 0 {
            return basename[dot..].to_string();
        }
    }
    if url.starts_with(INTERNAL_COMPONENT_PATH) {
        return ".astro".to_string();
    }
    String::new()
}

/// Look up a specifier's plugin kind: caller overrides first, then the
/// built-in defaults.
pub(crate) fn plugin_for_extension(
    ext: &str,
    overrides: &HashMap<String, PluginKind>,
) -> Option<PluginKind> {
    overrides
        .get(ext)
        .copied()
        .or_else(|| default_extensions().get(ext).copied())
}

/// Base name of an import specifier with the extension removed; registry
/// key for imports that bind no specifier.
pub(crate) fn specifier_basename(url: &str) -> String {
    let basename = url.rsplit('/').next().unwrap_or(url);
    match basename.rfind('.') {
        Some(dot) if dot > 0 => basename[..dot].to_string(),
        _ => basename.to_string(),
    }
}

/// A resolved component wrapper: the call target to emit and the helper
/// import it needs, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComponentWrapper {
    pub wrapper: String,
    pub wrapper_import: Option<String>,
}

/// Resolve the wrapper for a markup reference, `Name` or `Name:qualifier`.
pub(crate) fn get_component_wrapper(
    reference: &str,
    info: &ComponentInfo,
    opts: &CodegenOptions<'_>,
    dynamic_imports: &BTreeMap<FrameworkRuntime, String>,
) -> Result<ComponentWrapper, CodegenError> {
    let (name, qualifier) = match reference.split_once(':') {
        Some((name, qualifier)) => (name, Some(qualifier)),
        None => (reference, None),
    };

    let plugin = info.plugin.ok_or_else(|| CodegenError::UnresolvedPlugin {
        name: name.to_string(),
        url: info.url.clone(),
        filename: opts.shortname(),
    })?;

    if plugin == PluginKind::Astro {
        if let Some(qualifier) = qualifier {
            return Err(CodegenError::UnsupportedHydration {
                name: name.to_string(),
                qualifier: qualifier.to_string(),
            });
        }
        // The component function is referenced directly; no helper needed.
        return Ok(ComponentWrapper {
            wrapper: name.to_string(),
            wrapper_import: None,
        });
    }

    let hydration = qualifier.and_then(HydrationKind::parse);
    let kind = hydration.map(HydrationKind::as_str).unwrap_or("static");
    let helper = format!("__{}_{}", plugin.as_str(), kind);
    let wrapper_import = format!(
        "import {{{}}} from '{}/{}.js';",
        helper,
        RENDER_MODULE_BASE,
        plugin.as_str()
    );

    let wrapper = if hydration.is_some() {
        let component_url = component_asset_url(info, plugin, opts);
        let mut framework_urls = serde_json::Map::new();
        for runtime in plugin.runtimes() {
            let url = dynamic_imports.get(runtime).ok_or_else(|| {
                CodegenError::MissingFrameworkUrl {
                    package: runtime.package().to_string(),
                }
            })?;
            framework_urls.insert(runtime.as_str().to_string(), json!(url));
        }
        let options = json!({
            "componentUrl": component_url,
            "componentExport": "default",
            "frameworkUrls": framework_urls,
        });
        format!("{}({}, {})", helper, name, options)
    } else {
        format!("{}({})", helper, name)
    };

    Ok(ComponentWrapper {
        wrapper,
        wrapper_import: Some(wrapper_import),
    })
}

/// Public URL of the component's compiled output: the specifier resolved
/// against the compiling file, expressed relative to the markup root under
/// the asset prefix, with the source extension swapped for the plugin's
/// output extension.
fn component_asset_url(info: &ComponentInfo, plugin: PluginKind, opts: &CodegenOptions<'_>) -> String {
    let base = opts.filename.parent().unwrap_or_else(|| Path::new(""));
    let absolute = normalize_path(&base.join(&info.url));
    let relative = match absolute.strip_prefix(&opts.astro_root) {
        Ok(rel) => rel.to_path_buf(),
        Err(_) => {
            warn!(
                "{}: component \"{}\" resolves outside the markup root",
                opts.shortname(),
                info.url
            );
            absolute.clone()
        }
    };
    let mut path = relative.to_string_lossy().replace('\\', "/");
    if let Some(dot) = path.rfind('.') {
        if !path[dot..].contains('/') {
            path.truncate(dot);
        }
    }
    format!(
        "{}{}{}",
        ASSET_PREFIX,
        path.trim_start_matches('/'),
        plugin.output_extension()
    )
}

/// Resolve a deployable URL for every runtime package the referenced plugin
/// kinds need. Runs to completion before markup compilation starts.
pub(crate) async fn acquire_dynamic_imports(
    plugins: &BTreeSet<PluginKind>,
    resolver: &dyn PackageResolver,
) -> Result<BTreeMap<FrameworkRuntime, String>, CodegenError> {
    let mut map = BTreeMap::new();
    for plugin in plugins {
        for runtime in plugin.runtimes() {
            if map.contains_key(runtime) {
                continue;
            }
            let url = resolver.resolve_package_url(runtime.package()).await?;
            map.insert(*runtime, url);
        }
    }
    Ok(map)
}
