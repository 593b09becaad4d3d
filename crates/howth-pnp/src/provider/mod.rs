//! Resolution provider capability.
//!
//! The engine only talks to a provider through [`ProviderLocator`] and
//! [`PnpApi`]. [`ManifestLocator`] is the bundled implementation backed by a
//! `.pnp.data.json` manifest; integrators can supply their own.

mod api;
mod exports;
mod manifest;

pub use api::{ManifestApi, ManifestLocator, MANIFEST_FILE_NAME};
pub use exports::{resolve_exports, resolve_exports_root, resolve_exports_subpath};
pub use manifest::PnpManifest;

use crate::conditions::ConditionSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Specifier that resolves to the provider's own manifest.
pub const PNPAPI_SPECIFIER: &str = "pnpapi";

/// Default extensions tried when a specifier has no extension.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".tsx", ".ts", ".jsx", ".mjs", ".cjs", ".js", ".css", ".json",
];

/// Provider error codes.
pub mod codes {
    pub const MODULE_NOT_FOUND: &str = "MODULE_NOT_FOUND";
    pub const UNDECLARED_DEPENDENCY: &str = "UNDECLARED_DEPENDENCY";
    pub const MISSING_PEER_DEPENDENCY: &str = "MISSING_PEER_DEPENDENCY";
    pub const BUILTIN_NODE_RESOLUTION_FAILED: &str = "BUILTIN_NODE_RESOLUTION_FAILED";
    pub const QUALIFIED_PATH_RESOLUTION_FAILED: &str = "QUALIFIED_PATH_RESOLUTION_FAILED";
    pub const EXPORTS_NOT_FOUND: &str = "EXPORTS_NOT_FOUND";
    pub const INTERNAL: &str = "INTERNAL";
}

/// A failed provider resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    code: &'static str,
    message: String,
}

impl ProviderError {
    /// Create a new error with the given code and message.
    #[must_use]
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        self.code
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn module_not_found(msg: impl Into<String>) -> Self {
        Self::new(codes::MODULE_NOT_FOUND, msg)
    }

    pub fn undeclared_dependency(msg: impl Into<String>) -> Self {
        Self::new(codes::UNDECLARED_DEPENDENCY, msg)
    }

    pub fn missing_peer_dependency(msg: impl Into<String>) -> Self {
        Self::new(codes::MISSING_PEER_DEPENDENCY, msg)
    }

    pub fn builtin_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::BUILTIN_NODE_RESOLUTION_FAILED, msg)
    }

    pub fn qualified_path_failed(msg: impl Into<String>) -> Self {
        Self::new(codes::QUALIFIED_PATH_RESOLUTION_FAILED, msg)
    }

    pub fn exports_not_found(msg: impl Into<String>) -> Self {
        Self::new(codes::EXPORTS_NOT_FOUND, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(codes::INTERNAL, msg)
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ProviderError {}

/// Options for a single provider resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    pub conditions: ConditionSet,
    /// Resolve Node builtins to "no path" instead of failing.
    pub consider_builtins: bool,
    /// Extensions tried in order for extensionless specifiers.
    pub extensions: Vec<String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            conditions: ["default"].into_iter().collect(),
            consider_builtins: true,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

/// Identity of a package in the dependency tree.
///
/// Both fields are `None` for the top-level project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageLocator {
    pub name: Option<String>,
    pub reference: Option<String>,
}

impl PackageLocator {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            reference: Some(reference.into()),
        }
    }

    /// The top-level project locator.
    #[must_use]
    pub fn top_level() -> Self {
        Self {
            name: None,
            reference: None,
        }
    }

    #[must_use]
    pub fn is_top_level(&self) -> bool {
        self.name.is_none() && self.reference.is_none()
    }
}

impl std::fmt::Display for PackageLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.name, &self.reference) {
            (Some(name), Some(reference)) => write!(f, "{name}@{reference}"),
            (Some(name), None) => write!(f, "{name}"),
            _ => write!(f, "<top-level>"),
        }
    }
}

/// How a package's files are pinned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkType {
    /// Contents are owned by the install and pinned by the lock state.
    Hard,
    /// Contents live elsewhere (workspaces, `portal:`) and may change at any time.
    Soft,
}

/// Where a dependency points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyTarget {
    /// A reference of the same package name.
    Reference(String),
    /// A different package installed under this name.
    Alias { name: String, reference: String },
}

impl DependencyTarget {
    /// Locator of the target when requested as `requested_name`.
    #[must_use]
    pub fn locator(&self, requested_name: &str) -> PackageLocator {
        match self {
            Self::Reference(reference) => PackageLocator::new(requested_name, reference.clone()),
            Self::Alias { name, reference } => PackageLocator::new(name.clone(), reference.clone()),
        }
    }
}

/// Provider knowledge about one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    /// Absolute, lexically normalized package directory.
    pub package_location: PathBuf,
    /// Declared dependencies; `None` marks an unfulfilled peer dependency.
    pub package_dependencies: BTreeMap<String, Option<DependencyTarget>>,
    pub link_type: LinkType,
}

/// A resolution provider for one project.
pub trait PnpApi: Send + Sync {
    /// Resolve `specifier` from `issuer`.
    ///
    /// `issuer` ending in a separator names a directory. `Ok(None)` means the
    /// request maps to a runtime builtin and has no path.
    fn resolve_request(
        &self,
        specifier: &str,
        issuer: Option<&str>,
        options: &ResolveOptions,
    ) -> Result<Option<PathBuf>, ProviderError>;

    /// The package owning `path`, if any.
    fn find_package_locator(&self, path: &Path) -> Option<PackageLocator>;

    fn get_package_information(&self, locator: &PackageLocator) -> Option<PackageInfo>;

    /// Map a virtual path to the real path it aliases.
    fn resolve_virtual(&self, path: &Path) -> Option<PathBuf>;
}

/// Finds the provider responsible for an importing context.
pub trait ProviderLocator: Send + Sync {
    /// `None` when `issuer` is outside every managed project.
    fn find_api(&self, issuer: &str) -> Option<Arc<dyn PnpApi>>;
}
