//! Import requests as handed to the resolve hook.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// How an import was written at its call site.
///
/// Closed set defined by the host build tool. The older names
/// (`static-import`, `url-reference`) are accepted when parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    EntryPoint,
    #[serde(alias = "static-import")]
    ImportStatement,
    RequireCall,
    DynamicImport,
    RequireResolve,
    ImportRule,
    ComposesFrom,
    #[serde(alias = "url-reference")]
    UrlToken,
}

impl ImportKind {
    /// Every kind, in declaration order.
    pub const ALL: [ImportKind; 8] = [
        Self::EntryPoint,
        Self::ImportStatement,
        Self::RequireCall,
        Self::DynamicImport,
        Self::RequireResolve,
        Self::ImportRule,
        Self::ComposesFrom,
        Self::UrlToken,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EntryPoint => "entry-point",
            Self::ImportStatement => "import-statement",
            Self::RequireCall => "require-call",
            Self::DynamicImport => "dynamic-import",
            Self::RequireResolve => "require-resolve",
            Self::ImportRule => "import-rule",
            Self::ComposesFrom => "composes-from",
            Self::UrlToken => "url-token",
        }
    }
}

impl std::fmt::Display for ImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown import kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownImportKind(pub String);

impl std::fmt::Display for UnknownImportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown import kind: {}", self.0)
    }
}

impl std::error::Error for UnknownImportKind {}

impl FromStr for ImportKind {
    type Err = UnknownImportKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entry-point" => Ok(Self::EntryPoint),
            "import-statement" | "static-import" => Ok(Self::ImportStatement),
            "require-call" => Ok(Self::RequireCall),
            "dynamic-import" => Ok(Self::DynamicImport),
            "require-resolve" => Ok(Self::RequireResolve),
            "import-rule" => Ok(Self::ImportRule),
            "composes-from" => Ok(Self::ComposesFrom),
            "url-token" | "url-reference" => Ok(Self::UrlToken),
            other => Err(UnknownImportKind(other.to_string())),
        }
    }
}

/// A single import to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    /// Raw specifier as written in source (e.g. `./util`, `left-pad/lib`).
    pub specifier: String,
    /// File containing the import. Absent for entry points.
    pub importer: Option<PathBuf>,
    /// Directory the host tool resolves relative imports against.
    pub resolve_dir: Option<PathBuf>,
    pub kind: ImportKind,
}

impl ImportRequest {
    /// Create a request with no importer or resolve dir.
    pub fn new(specifier: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            importer: None,
            resolve_dir: None,
            kind,
        }
    }

    /// Set the importing file.
    pub fn with_importer(mut self, importer: impl Into<PathBuf>) -> Self {
        self.importer = Some(importer.into());
        self
    }

    /// Set the resolve directory.
    pub fn with_resolve_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.resolve_dir = Some(dir.into());
        self
    }
}
