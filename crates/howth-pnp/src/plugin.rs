//! Resolve/load hook surface.
//!
//! A [`PluginChain`] models the host build tool's resolver chain: plugins run
//! in insertion order and the first one returning `Some` wins. [`PnpPlugin`]
//! is the PnP resolver; it returns `None` for anything it does not own so the
//! next resolver can take over.
//!
//! ## Example
//!
//! ```ignore
//! use howth_pnp::{
//!     pnp_plugin, BuildOptions, ImportKind, ImportRequest, ManifestLocator, PnpPluginOptions,
//! };
//!
//! let locator = ManifestLocator::discover(&cwd)?;
//! let plugin = pnp_plugin(
//!     PnpPluginOptions::new(&cwd),
//!     &BuildOptions::default(),
//!     Some(Arc::new(locator)),
//! );
//!
//! let request = ImportRequest::new("lodash", ImportKind::ImportStatement).with_importer(cwd.join("src/index.ts"));
//! if let Some(output) = plugin.on_resolve(&request)? {
//!     println!("{output:?}");
//! }
//! ```

use crate::classify::{ResolveOutput, ResultClassifier, PNP_NAMESPACE};
use crate::conditions::ConditionSet;
use crate::config::{BuildOptions, PnpPluginOptions};
use crate::engine::{Decision, ResolutionEngine};
use crate::fs::ArchiveFs;
use crate::provider::{PnpApi, ProviderLocator, ResolveOptions};
use crate::request::ImportRequest;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// Result type for plugin hooks.
pub type HookResult<T> = Result<T, PluginError>;

/// Replacement for the PnP resolve step.
pub type ResolveOverride = Arc<
    dyn Fn(&ImportRequest, &ResolveContext<'_>) -> HookResult<Option<ResolveOutput>> + Send + Sync,
>;

/// Replacement for the PnP load step.
pub type LoadOverride = Arc<dyn Fn(&LoadArgs) -> HookResult<Option<LoadOutput>> + Send + Sync>;

/// Error from a plugin.
#[derive(Debug)]
pub struct PluginError {
    /// Plugin name that caused the error.
    pub plugin: String,
    /// Hook that failed.
    pub hook: &'static str,
    pub message: String,
}

impl PluginError {
    pub fn new(plugin: impl Into<String>, hook: &'static str, message: impl Into<String>) -> Self {
        Self {
            plugin: plugin.into(),
            hook,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for PluginError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.plugin, self.hook, self.message)
    }
}

impl std::error::Error for PluginError {}

/// What a resolve override sees: the importing context the provider was
/// found for, the conditions picked for the request and the provider itself.
pub struct ResolveContext<'a> {
    pub issuer: &'a str,
    pub conditions: &'a ConditionSet,
    /// Options the default resolver would pass to the provider.
    pub options: ResolveOptions,
    pub api: &'a Arc<dyn PnpApi>,
}

/// Input of a load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadArgs {
    pub path: PathBuf,
    pub namespace: String,
}

impl LoadArgs {
    pub fn new(path: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            namespace: namespace.into(),
        }
    }
}

/// Result of a load hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutput {
    pub contents: Vec<u8>,
    pub loader: String,
    pub resolve_dir: Option<PathBuf>,
}

/// A resolver plugin.
///
/// Both hooks default to `Ok(None)`, which passes the request on.
pub trait Plugin: Send + Sync {
    /// Plugin name for debugging and error messages.
    fn name(&self) -> &str;

    fn on_resolve(&self, _request: &ImportRequest) -> HookResult<Option<ResolveOutput>> {
        Ok(None)
    }

    fn on_load(&self, _args: &LoadArgs) -> HookResult<Option<LoadOutput>> {
        Ok(None)
    }
}

/// Resolves imports through a PnP provider.
pub struct PnpPlugin {
    options: PnpPluginOptions,
    /// `None` when no provider is available; every hook then passes.
    engine: Option<ResolutionEngine>,
    classifier: ResultClassifier,
    fs: ArchiveFs,
}

impl PnpPlugin {
    pub const NAME: &'static str = "pnp";

    /// Create the plugin. Without a locator, every hook delegates.
    pub fn new(
        options: PnpPluginOptions,
        build: &BuildOptions,
        locator: Option<Arc<dyn ProviderLocator>>,
    ) -> Self {
        let engine = locator.map(|locator| {
            ResolutionEngine::new(
                build,
                options.base_dir.clone(),
                options.extensions.clone(),
                locator,
            )
        });
        if engine.is_none() {
            debug!("No PnP provider available, plugin will delegate every request");
        }

        Self {
            classifier: ResultClassifier::new(options.failure_policy.clone()),
            options,
            engine,
            fs: ArchiveFs::new(),
        }
    }

    #[must_use]
    pub fn engine(&self) -> Option<&ResolutionEngine> {
        self.engine.as_ref()
    }

    fn error(&self, hook: &'static str, message: impl Into<String>) -> PluginError {
        PluginError::new(Self::NAME, hook, message)
    }

    fn resolve_with_override(
        &self,
        engine: &ResolutionEngine,
        hook: &ResolveOverride,
        request: &ImportRequest,
    ) -> HookResult<Option<ResolveOutput>> {
        if engine.externals().matches(&request.specifier) {
            return Ok(self.classifier.decide(request, Decision::External));
        }

        let issuer = engine.effective_importer(request);
        let Some(api) = engine.find_api(&issuer) else {
            return Ok(None);
        };

        let conditions = engine.conditions().for_kind(request.kind);
        let context = ResolveContext {
            issuer: &issuer,
            conditions,
            options: engine.resolve_options(conditions),
            api: &api,
        };
        hook(request, &context)
    }
}

impl Plugin for PnpPlugin {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_resolve(&self, request: &ImportRequest) -> HookResult<Option<ResolveOutput>> {
        let Some(engine) = &self.engine else {
            return Ok(None);
        };
        if !self.options.accepts(&request.specifier) {
            return Ok(None);
        }

        if let Some(hook) = &self.options.on_resolve {
            return self.resolve_with_override(engine, hook, request);
        }

        let decision = engine
            .resolve(request)
            .map_err(|e| self.error("on_resolve", e.to_string()))?;
        Ok(self.classifier.decide(request, decision))
    }

    fn on_load(&self, args: &LoadArgs) -> HookResult<Option<LoadOutput>> {
        if args.namespace != PNP_NAMESPACE {
            return Ok(None);
        }

        if let Some(hook) = &self.options.on_load {
            return hook(args);
        }

        let contents = self
            .fs
            .read(&args.path)
            .map_err(|e| self.error("on_load", format!("{}: {e}", args.path.display())))?;
        Ok(Some(LoadOutput {
            contents,
            loader: "default".to_string(),
            resolve_dir: args.path.parent().map(PathBuf::from),
        }))
    }
}

/// Build a [`PnpPlugin`].
pub fn pnp_plugin(
    options: PnpPluginOptions,
    build: &BuildOptions,
    locator: Option<Arc<dyn ProviderLocator>>,
) -> PnpPlugin {
    PnpPlugin::new(options, build, locator)
}

/// Runs plugins in insertion order.
#[derive(Default)]
pub struct PluginChain {
    plugins: Vec<Box<dyn Plugin>>,
}

impl PluginChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, plugin: Box<dyn Plugin>) {
        self.plugins.push(plugin);
    }

    /// Resolve through the chain. `None` if no plugin handled the request.
    pub fn resolve(&self, request: &ImportRequest) -> HookResult<Option<ResolveOutput>> {
        for plugin in &self.plugins {
            if let Some(output) = plugin.on_resolve(request)? {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    /// Load through the chain. `None` if no plugin handled the load.
    pub fn load(&self, args: &LoadArgs) -> HookResult<Option<LoadOutput>> {
        for plugin in &self.plugins {
            if let Some(output) = plugin.on_load(args)? {
                return Ok(Some(output));
            }
        }
        Ok(None)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.plugins.len()
    }
}
