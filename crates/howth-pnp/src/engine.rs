//! Resolution decision core.
//!
//! One call answers one request: is it external, does a provider own it,
//! and if so what did the provider say and which files should be watched.

use crate::conditions::{ConditionSet, ConditionSets};
use crate::config::BuildOptions;
use crate::error::Error;
use crate::external::Externals;
use crate::paths::dir_context;
use crate::provider::{
    LinkType, PnpApi, ProviderError, ProviderLocator, ResolveOptions, PNPAPI_SPECIFIER,
};
use crate::request::ImportRequest;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, trace};

/// What the provider said about a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The request maps to a file.
    Resolved(PathBuf),
    /// The request maps to a runtime builtin; there is no file.
    Builtin(String),
    Failed(ProviderError),
}

/// Ordered, duplicate-free list of files to watch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WatchSet(Vec<PathBuf>);

impl WatchSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is already present.
    pub fn push(&mut self, path: PathBuf) {
        if !self.0.contains(&path) {
            self.0.push(path);
        }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PathBuf] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.0.iter().map(PathBuf::as_path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<PathBuf> {
        self.0
    }
}

/// A provider resolution together with the files it depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub outcome: Outcome,
    pub watch_files: WatchSet,
}

/// The engine's answer for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// No provider owns the importing context; leave it to the host.
    Delegate,
    /// Matched the build's externals; the provider was not consulted.
    External,
    Attempted(Attempt),
}

/// Decides how import requests are resolved for one build.
pub struct ResolutionEngine {
    externals: Externals,
    conditions: ConditionSets,
    platform: String,
    extensions: Vec<String>,
    base_dir: PathBuf,
    locator: Arc<dyn ProviderLocator>,
}

impl std::fmt::Debug for ResolutionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionEngine")
            .field("externals", &self.externals)
            .field("conditions", &self.conditions)
            .field("platform", &self.platform)
            .field("extensions", &self.extensions)
            .field("base_dir", &self.base_dir)
            .finish_non_exhaustive()
    }
}

impl ResolutionEngine {
    /// Build an engine from the build configuration.
    ///
    /// Externals and condition sets are computed here, once.
    pub fn new(
        build: &BuildOptions,
        base_dir: impl Into<PathBuf>,
        extensions: Vec<String>,
        locator: Arc<dyn ProviderLocator>,
    ) -> Self {
        Self {
            externals: Externals::compile(&build.external),
            conditions: ConditionSets::build(build.conditions.iter().cloned(), &build.platform),
            platform: build.platform.clone(),
            extensions,
            base_dir: base_dir.into(),
            locator,
        }
    }

    #[must_use]
    pub fn externals(&self) -> &Externals {
        &self.externals
    }

    #[must_use]
    pub fn conditions(&self) -> &ConditionSets {
        &self.conditions
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The importing context handed to the provider.
    ///
    /// A resolve dir wins and is marked as a directory with a trailing
    /// separator; then the importer; then the base dir, also as a directory.
    #[must_use]
    pub fn effective_importer(&self, request: &ImportRequest) -> String {
        if let Some(dir) = request
            .resolve_dir
            .as_deref()
            .filter(|d| !d.as_os_str().is_empty())
        {
            return dir_context(dir);
        }
        if let Some(importer) = request
            .importer
            .as_deref()
            .filter(|i| !i.as_os_str().is_empty())
        {
            return importer.display().to_string();
        }
        dir_context(&self.base_dir)
    }

    /// The provider responsible for `issuer`, if any.
    #[must_use]
    pub fn find_api(&self, issuer: &str) -> Option<Arc<dyn PnpApi>> {
        self.locator.find_api(issuer)
    }

    /// Provider options for a request with the given conditions.
    #[must_use]
    pub fn resolve_options(&self, conditions: &ConditionSet) -> ResolveOptions {
        ResolveOptions {
            conditions: conditions.clone(),
            consider_builtins: self.platform == "node",
            extensions: self.extensions.clone(),
        }
    }

    /// Decide how `request` is resolved.
    ///
    /// # Errors
    /// Returns [`Error::ManifestUnresolvable`] if the owning provider cannot
    /// report its manifest path. Resolution failures are captured in the
    /// returned [`Outcome`] instead.
    pub fn resolve(&self, request: &ImportRequest) -> Result<Decision, Error> {
        if self.externals.matches(&request.specifier) {
            debug!(specifier = %request.specifier, "Matched externals");
            return Ok(Decision::External);
        }

        let issuer = self.effective_importer(request);
        trace!(specifier = %request.specifier, issuer = %issuer, "Effective importer");

        let Some(api) = self.locator.find_api(&issuer) else {
            debug!(issuer = %issuer, "No PnP provider for importer, delegating");
            return Ok(Decision::Delegate);
        };

        let conditions = self.conditions.for_kind(request.kind);
        trace!(kind = %request.kind, conditions = ?conditions, "Selected conditions");

        let options = self.resolve_options(conditions);
        let outcome = match api.resolve_request(&request.specifier, Some(&issuer), &options) {
            Ok(Some(path)) => {
                debug!(specifier = %request.specifier, path = %path.display(), "Resolved");
                Outcome::Resolved(path)
            }
            Ok(None) => {
                debug!(specifier = %request.specifier, "Resolved to builtin");
                Outcome::Builtin(request.specifier.clone())
            }
            Err(e) => {
                debug!(specifier = %request.specifier, code = e.code(), "Resolution failed");
                Outcome::Failed(e)
            }
        };

        let watch_files = watch_files(api.as_ref(), &outcome)?;
        Ok(Decision::Attempted(Attempt {
            outcome,
            watch_files,
        }))
    }
}

/// The manifest, plus the real location of soft-linked resolutions.
fn watch_files(api: &dyn PnpApi, outcome: &Outcome) -> Result<WatchSet, Error> {
    let manifest = api
        .resolve_request(PNPAPI_SPECIFIER, None, &ResolveOptions::default())
        .map_err(|e| Error::ManifestUnresolvable {
            message: format!("{} ({})", e.message(), e.code()),
        })?
        .ok_or_else(|| Error::ManifestUnresolvable {
            message: "provider returned no path".to_string(),
        })?;

    let mut watch = WatchSet::new();
    watch.push(manifest);

    if let Outcome::Resolved(path) = outcome {
        let soft = api
            .find_package_locator(path)
            .and_then(|locator| api.get_package_information(&locator))
            .is_some_and(|info| info.link_type == LinkType::Soft);
        if soft {
            watch.push(api.resolve_virtual(path).unwrap_or_else(|| path.clone()));
        }
    }

    Ok(watch)
}
