use howth_pnp::{
    pnp_plugin, BuildOptions, ImportKind, ImportRequest, Plugin, PnpPluginOptions, ResolveOutput,
};
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Exit code when the resolution carries errors.
pub const EXIT_RESOLUTION_ERROR: i32 = 1;

/// Inputs of `howth-pnp resolve`.
#[derive(Debug)]
pub struct ResolveAction {
    pub specifier: String,
    pub importer: Option<PathBuf>,
    pub resolve_dir: Option<PathBuf>,
    pub kind: ImportKind,
    pub manifest: Option<PathBuf>,
    pub external: Vec<String>,
    pub platform: Option<String>,
    pub conditions: Vec<String>,
    pub config: Option<PathBuf>,
}

impl ResolveAction {
    /// Build options from `--config`, then flags on top.
    fn build_options(&self, cwd: &Path) -> Result<BuildOptions> {
        let mut build = match &self.config {
            Some(path) => BuildOptions::from_file(&cwd.join(path)).into_diagnostic()?,
            None => BuildOptions::default(),
        };
        if let Some(platform) = &self.platform {
            build.platform.clone_from(platform);
        }
        Ok(build
            .with_external(self.external.iter().cloned())
            .with_conditions(self.conditions.iter().cloned()))
    }

    fn request(&self, cwd: &Path) -> ImportRequest {
        let mut request = ImportRequest::new(&self.specifier, self.kind);
        if let Some(importer) = &self.importer {
            request = request.with_importer(cwd.join(importer));
        }
        if let Some(dir) = &self.resolve_dir {
            request = request.with_resolve_dir(cwd.join(dir));
        }
        request
    }
}

/// Run the resolve command.
///
/// Prints the hook output; exits with [`EXIT_RESOLUTION_ERROR`] if it carries errors.
pub fn run(cwd: &Path, action: &ResolveAction, json: bool) -> Result<()> {
    let build = action.build_options(cwd)?;
    let locator = super::locate(cwd, action.manifest.as_deref())?;
    debug!(
        manifest = %locator.api().manifest().manifest_path().display(),
        platform = %build.platform,
        "Loaded PnP manifest"
    );

    let plugin = pnp_plugin(PnpPluginOptions::new(cwd), &build, Some(Arc::new(locator)));
    let output = plugin
        .on_resolve(&action.request(cwd))
        .into_diagnostic()?;

    if json {
        print_json(output.as_ref())?;
    } else {
        print_human(&action.specifier, output.as_ref());
    }

    if output.as_ref().is_some_and(ResolveOutput::has_errors) {
        std::process::exit(EXIT_RESOLUTION_ERROR);
    }
    Ok(())
}

fn print_json(output: Option<&ResolveOutput>) -> Result<()> {
    let value = match output {
        Some(output) => serde_json::to_value(output).into_diagnostic()?,
        None => serde_json::json!({ "delegated": true }),
    };
    let json = serde_json::to_string_pretty(&value).into_diagnostic()?;
    println!("{json}");
    Ok(())
}

fn print_human(specifier: &str, output: Option<&ResolveOutput>) {
    let Some(output) = output else {
        println!("{specifier}: not handled by PnP (delegated)");
        return;
    };

    match (&output.namespace, &output.path) {
        (Some(namespace), Some(path)) => println!("{specifier} -> {namespace}:{}", path.display()),
        _ if output.external => println!("{specifier}: external"),
        _ => println!("{specifier}: unresolved"),
    }

    for error in &output.errors {
        println!("  error: {}", error.text);
    }
    for warning in &output.warnings {
        println!("  warning: {}", warning.text);
    }
    for file in &output.watch_files {
        println!("  watch: {}", file.display());
    }
}
