use crate::classify::FailurePolicy;
use crate::error::Error;
use crate::plugin::{LoadOverride, ResolveOverride};
use crate::provider::DEFAULT_EXTENSIONS;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Build-wide settings the resolver reads once at setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
    /// Specifiers left for the runtime; one `*` wildcard allowed per entry.
    pub external: Vec<String>,

    /// Target platform (`browser`, `node`, `neutral`, ...).
    pub platform: String,

    /// Extra export conditions.
    pub conditions: Vec<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            external: Vec::new(),
            platform: "browser".to_string(),
            conditions: Vec::new(),
        }
    }
}

impl BuildOptions {
    /// Read options from a JSON file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::OptionsRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::OptionsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    #[must_use]
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    #[must_use]
    pub fn with_external<I, S>(mut self, external: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external.extend(external.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions
            .extend(conditions.into_iter().map(Into::into));
        self
    }
}

/// Options for the PnP plugin.
#[derive(Clone)]
pub struct PnpPluginOptions {
    /// Importing context for requests with neither importer nor resolve dir.
    pub base_dir: PathBuf,

    /// Extensions the provider tries, in order.
    pub extensions: Vec<String>,

    /// Only specifiers matching this pattern are handled. `None` matches all.
    pub filter: Option<Regex>,

    pub failure_policy: FailurePolicy,

    /// Replaces provider resolution and classification.
    pub on_resolve: Option<ResolveOverride>,

    /// Replaces the default loader for the `pnp` namespace.
    pub on_load: Option<LoadOverride>,
}

impl std::fmt::Debug for PnpPluginOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PnpPluginOptions")
            .field("base_dir", &self.base_dir)
            .field("extensions", &self.extensions)
            .field("filter", &self.filter.as_ref().map(Regex::as_str))
            .field("failure_policy", &self.failure_policy)
            .field("on_resolve", &self.on_resolve.is_some())
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

impl Default for PnpPluginOptions {
    fn default() -> Self {
        Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            filter: None,
            failure_policy: FailurePolicy::default(),
            on_resolve: None,
            on_load: None,
        }
    }
}

impl PnpPluginOptions {
    /// Create options with the given base directory.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the plugin to specifiers matching `pattern`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidFilter`] if the pattern does not compile.
    pub fn with_filter(mut self, pattern: &str) -> Result<Self, Error> {
        let regex = Regex::new(pattern).map_err(|e| Error::InvalidFilter {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.filter = Some(regex);
        Ok(self)
    }

    #[must_use]
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    #[must_use]
    pub fn with_on_resolve(mut self, hook: ResolveOverride) -> Self {
        self.on_resolve = Some(hook);
        self
    }

    #[must_use]
    pub fn with_on_load(mut self, hook: LoadOverride) -> Self {
        self.on_load = Some(hook);
        self
    }

    /// Whether `specifier` passes the filter.
    #[must_use]
    pub fn accepts(&self, specifier: &str) -> bool {
        match &self.filter {
            Some(filter) => filter.is_match(specifier),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_options_defaults() {
        let options: BuildOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, BuildOptions::default());
        assert_eq!(options.platform, "browser");
    }

    #[test]
    fn test_build_options_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.json");
        std::fs::write(
            &path,
            r#"{ "external": ["left-*"], "platform": "node", "conditions": ["worker"] }"#,
        )
        .unwrap();

        let options = BuildOptions::from_file(&path).unwrap();
        assert_eq!(
            options,
            BuildOptions::default()
                .with_platform("node")
                .with_external(["left-*"])
                .with_conditions(["worker"])
        );
    }

    #[test]
    fn test_build_options_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            BuildOptions::from_file(&missing),
            Err(Error::OptionsRead { .. })
        ));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{ nope").unwrap();
        assert!(matches!(
            BuildOptions::from_file(&bad),
            Err(Error::OptionsParse { .. })
        ));
    }

    #[test]
    fn test_plugin_options_filter() {
        let options = PnpPluginOptions::new("/proj");
        assert!(options.accepts("anything"));
        assert_eq!(options.extensions.len(), DEFAULT_EXTENSIONS.len());

        let options = options.with_filter(r"^\./").unwrap();
        assert!(options.accepts("./util"));
        assert!(!options.accepts("lodash"));

        assert!(matches!(
            PnpPluginOptions::new("/proj").with_filter("("),
            Err(Error::InvalidFilter { .. })
        ));
    }
}
