use howth_pnp::{
    pnp_plugin, BuildOptions, LoadArgs, Plugin, PnpPluginOptions, PNP_NAMESPACE,
};
use miette::{miette, IntoDiagnostic, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Run the load command: print the contents of a managed path.
///
/// With `json`, prints the loader and resolve dir alongside the contents.
pub fn run(cwd: &Path, path: &Path, manifest: Option<&Path>, json: bool) -> Result<()> {
    let locator = super::locate(cwd, manifest)?;
    let plugin = pnp_plugin(
        PnpPluginOptions::new(cwd),
        &BuildOptions::default(),
        Some(Arc::new(locator)),
    );

    let args = LoadArgs::new(cwd.join(path), PNP_NAMESPACE);
    let output = plugin
        .on_load(&args)
        .into_diagnostic()?
        .ok_or_else(|| miette!("{} was not loaded", args.path.display()))?;

    if json {
        let value = serde_json::json!({
            "path": args.path,
            "loader": output.loader,
            "resolveDir": output.resolve_dir.as_ref().map(PathBuf::as_path),
            "contents": String::from_utf8_lossy(&output.contents),
        });
        println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
    } else {
        let mut out = std::io::stdout().lock();
        out.write_all(&output.contents).into_diagnostic()?;
        out.flush().into_diagnostic()?;
    }
    Ok(())
}
