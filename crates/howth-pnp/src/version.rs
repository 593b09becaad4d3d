//! Build metadata reported by `howth-pnp version`.

use crate::classify::PNP_NAMESPACE;
use crate::provider::MANIFEST_FILE_NAME;
use serde::Serialize;
use std::fmt;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What this build is and which PnP data it reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub name: &'static str,
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git_hash: Option<&'static str>,
    /// File name searched for when no manifest path is given.
    pub manifest: &'static str,
    /// Namespace of paths handed to the load hook.
    pub namespace: &'static str,
}

#[must_use]
pub fn build_info() -> BuildInfo {
    BuildInfo {
        name: "howth-pnp",
        version: VERSION,
        git_hash: option_env!("HOWTH_BUILD_GIT_HASH"),
        manifest: MANIFEST_FILE_NAME,
        namespace: PNP_NAMESPACE,
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)?;
        if let Some(hash) = self.git_hash {
            write!(f, " ({hash})")?;
        }
        write!(f, " [{} -> {}:]", self.manifest, self.namespace)
    }
}
