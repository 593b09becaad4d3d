pub mod load;
pub mod resolve;
pub mod version;

use howth_pnp::ManifestLocator;
use miette::{IntoDiagnostic, Result};
use std::path::Path;

/// Load the manifest at `manifest`, or discover one above `cwd`.
pub(crate) fn locate(cwd: &Path, manifest: Option<&Path>) -> Result<ManifestLocator> {
    match manifest {
        Some(path) => ManifestLocator::load(&cwd.join(path)).into_diagnostic(),
        None => ManifestLocator::discover(cwd).into_diagnostic(),
    }
}
