#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Plug'n'Play resolution for bundler hooks.
//!
//! [`PnpPlugin`] answers resolve requests for code inside a PnP project:
//! specifiers matching the build's externals are left alone, everything
//! else is resolved through a [`provider::PnpApi`] with the export
//! conditions of the request's import kind. Failures become errors or
//! warnings depending on the kind, and each answer lists the files whose
//! changes invalidate it.

pub mod classify;
pub mod conditions;
pub mod config;
pub mod engine;
pub mod error;
pub mod external;
pub mod fs;
pub mod paths;
pub mod plugin;
pub mod provider;
pub mod request;
pub mod version;

pub use classify::{
    FailurePolicy, Message, ResolveOutput, ResultClassifier, Severity, PNP_NAMESPACE,
};
pub use conditions::{ConditionSet, ConditionSets};
pub use config::{BuildOptions, PnpPluginOptions};
pub use engine::{Attempt, Decision, Outcome, ResolutionEngine, WatchSet};
pub use error::Error;
pub use external::{ExternalPattern, Externals};
pub use plugin::{
    pnp_plugin, HookResult, LoadArgs, LoadOutput, LoadOverride, Plugin, PluginChain, PluginError,
    PnpPlugin, ResolveContext, ResolveOverride,
};
pub use provider::{ManifestApi, ManifestLocator, PnpApi, ProviderError, ProviderLocator};
pub use request::{ImportKind, ImportRequest};
pub use version::{build_info, BuildInfo, VERSION};
