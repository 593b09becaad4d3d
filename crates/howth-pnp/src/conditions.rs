//! Export conditions per import kind.
//!
//! Three sets are derived once per build from the platform and the user's
//! conditions. Requests pick one by their import kind.

use crate::request::ImportKind;
use serde::Serialize;
use std::collections::BTreeSet;

/// An immutable set of export condition names.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct ConditionSet(BTreeSet<String>);

impl ConditionSet {
    #[must_use]
    pub fn contains(&self, condition: &str) -> bool {
        self.0.contains(condition)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A copy of this set with one more condition.
    fn with(&self, condition: &str) -> Self {
        let mut set = self.0.clone();
        set.insert(condition.to_string());
        Self(set)
    }
}

impl<S: Into<String>> FromIterator<S> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Which of the three sets a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionFlavor {
    Default,
    Import,
    Require,
}

impl ConditionFlavor {
    /// ESM forms get `import`, CommonJS forms get `require`.
    #[must_use]
    pub fn for_kind(kind: ImportKind) -> Self {
        match kind {
            ImportKind::DynamicImport | ImportKind::ImportStatement => Self::Import,
            ImportKind::RequireCall | ImportKind::RequireResolve => Self::Require,
            ImportKind::EntryPoint
            | ImportKind::ImportRule
            | ImportKind::ComposesFrom
            | ImportKind::UrlToken => Self::Default,
        }
    }
}

/// The default, import and require condition sets for a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionSets {
    default: ConditionSet,
    import: ConditionSet,
    require: ConditionSet,
}

impl ConditionSets {
    /// Derive the three sets.
    ///
    /// `default` always holds `"default"`, plus the platform name when the
    /// platform is `browser` or `node`.
    pub fn build<I, S>(user_conditions: I, platform: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut base: BTreeSet<String> = user_conditions.into_iter().map(Into::into).collect();
        base.insert("default".to_string());
        if platform == "browser" || platform == "node" {
            base.insert(platform.to_string());
        }

        let default = ConditionSet(base);
        let import = default.with("import");
        let require = default.with("require");

        Self {
            default,
            import,
            require,
        }
    }

    #[must_use]
    pub fn default_set(&self) -> &ConditionSet {
        &self.default
    }

    #[must_use]
    pub fn import_set(&self) -> &ConditionSet {
        &self.import
    }

    #[must_use]
    pub fn require_set(&self) -> &ConditionSet {
        &self.require
    }

    /// The set a request of `kind` resolves with.
    #[must_use]
    pub fn for_kind(&self, kind: ImportKind) -> &ConditionSet {
        match ConditionFlavor::for_kind(kind) {
            ConditionFlavor::Default => &self.default,
            ConditionFlavor::Import => &self.import,
            ConditionFlavor::Require => &self.require,
        }
    }
}
