//! Turn engine decisions into hook results.

use crate::engine::{Attempt, Decision, Outcome};
use crate::request::{ImportKind, ImportRequest};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::warn;

/// Namespace of paths owned by the PnP provider.
pub const PNP_NAMESPACE: &str = "pnp";

/// A diagnostic attached to a resolve result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub text: String,
}

impl Message {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Result of a resolve hook.
///
/// Either a managed path (`namespace` and `path` set) or an external
/// pass-through, possibly carrying errors or warnings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub external: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub watch_files: Vec<PathBuf>,
}

impl ResolveOutput {
    /// A path owned by the provider, served from the `pnp` namespace.
    pub fn managed(path: PathBuf, watch_files: Vec<PathBuf>) -> Self {
        Self {
            namespace: Some(PNP_NAMESPACE.to_string()),
            path: Some(path),
            watch_files,
            ..Self::default()
        }
    }

    /// Leave the specifier for the runtime to resolve.
    pub fn external(watch_files: Vec<PathBuf>) -> Self {
        Self {
            external: true,
            watch_files,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, text: impl Into<String>) -> Self {
        self.errors.push(Message::new(text));
        self
    }

    #[must_use]
    pub fn with_warning(mut self, text: impl Into<String>) -> Self {
        self.warnings.push(Message::new(text));
        self
    }

    #[must_use]
    pub fn is_managed(&self) -> bool {
        self.namespace.as_deref() == Some(PNP_NAMESPACE)
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// How a failed resolution is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported as a warning; the build continues with the import external.
    Warn,
    /// Reported as an error.
    Error,
}

/// Severity of resolution failures per import kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailurePolicy {
    overrides: BTreeMap<ImportKind, Severity>,
}

impl FailurePolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Severity used when no override is set.
    ///
    /// `require()`, `require.resolve()` and `import()` are commonly wrapped in
    /// `try`/`catch`, which a bundler cannot see.
    #[must_use]
    pub fn default_severity(kind: ImportKind) -> Severity {
        match kind {
            ImportKind::RequireCall | ImportKind::RequireResolve | ImportKind::DynamicImport => {
                Severity::Warn
            }
            ImportKind::EntryPoint
            | ImportKind::ImportStatement
            | ImportKind::ImportRule
            | ImportKind::ComposesFrom
            | ImportKind::UrlToken => Severity::Error,
        }
    }

    #[must_use]
    pub fn with_severity(mut self, kind: ImportKind, severity: Severity) -> Self {
        self.overrides.insert(kind, severity);
        self
    }

    #[must_use]
    pub fn severity(&self, kind: ImportKind) -> Severity {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::default_severity(kind))
    }
}

/// Maps engine decisions to hook results.
#[derive(Debug, Clone, Default)]
pub struct ResultClassifier {
    policy: FailurePolicy,
}

impl ResultClassifier {
    #[must_use]
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &FailurePolicy {
        &self.policy
    }

    /// Classify an attempted resolution.
    #[must_use]
    pub fn classify(&self, kind: ImportKind, attempt: Attempt) -> ResolveOutput {
        let watch_files = attempt.watch_files.into_vec();
        match attempt.outcome {
            Outcome::Resolved(path) => ResolveOutput::managed(path, watch_files),
            Outcome::Builtin(_) => ResolveOutput::external(watch_files),
            Outcome::Failed(error) => {
                let output = ResolveOutput::external(watch_files);
                match self.policy.severity(kind) {
                    Severity::Warn => {
                        warn!(
                            kind = %kind,
                            code = error.code(),
                            "Resolution failed, treating as external"
                        );
                        output.with_warning(error.message())
                    }
                    Severity::Error => output.with_error(error.message()),
                }
            }
        }
    }

    /// Hook result for a full engine decision; `None` delegates.
    #[must_use]
    pub fn decide(&self, request: &ImportRequest, decision: Decision) -> Option<ResolveOutput> {
        match decision {
            Decision::Delegate => None,
            Decision::External => {
                Some(ResolveOutput::external(Vec::new()).with_path(&request.specifier))
            }
            Decision::Attempted(attempt) => Some(self.classify(request.kind, attempt)),
        }
    }
}
