//! Manifest-backed provider.
//!
//! Resolution order for a request:
//! 1. `pnpapi` maps to the manifest itself
//! 2. Node builtins short-circuit when builtins are considered
//! 3. Relative and absolute specifiers are probed from the issuer directory
//! 4. `#` specifiers go through the issuer package's `imports` map
//! 5. Bare specifiers go through the issuer's declared dependencies, then
//!    the top-level and fallback pool, then the dependency's `exports`/`main`

use super::exports::{resolve_exports, resolve_imports_map};
use super::manifest::PnpManifest;
use super::{
    DependencyTarget, PackageInfo, PackageLocator, PnpApi, ProviderError, ProviderLocator,
    ResolveOptions, PNPAPI_SPECIFIER,
};
use crate::error::Error;
use crate::fs::ArchiveFs;
use crate::paths::{dir_context, find_up, issuer_dir, normalize, resolve_virtual};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::trace;

/// File name looked up by [`ManifestLocator::discover`].
pub const MANIFEST_FILE_NAME: &str = ".pnp.data.json";

/// Maximum number of candidate paths listed in an error message.
const MAX_TRIED_PATHS: usize = 20;

/// Node core modules, without the `node:` prefix.
const NODE_BUILTINS: &[&str] = &[
    "assert",
    "assert/strict",
    "async_hooks",
    "buffer",
    "child_process",
    "cluster",
    "console",
    "constants",
    "crypto",
    "dgram",
    "diagnostics_channel",
    "dns",
    "dns/promises",
    "domain",
    "events",
    "fs",
    "fs/promises",
    "http",
    "http2",
    "https",
    "inspector",
    "module",
    "net",
    "os",
    "path",
    "path/posix",
    "path/win32",
    "perf_hooks",
    "process",
    "punycode",
    "querystring",
    "readline",
    "readline/promises",
    "repl",
    "stream",
    "stream/consumers",
    "stream/promises",
    "stream/web",
    "string_decoder",
    "sys",
    "timers",
    "timers/promises",
    "tls",
    "trace_events",
    "tty",
    "url",
    "util",
    "util/types",
    "v8",
    "vm",
    "wasi",
    "worker_threads",
    "zlib",
];

fn is_builtin(specifier: &str) -> bool {
    specifier.starts_with("node:") || NODE_BUILTINS.contains(&specifier)
}

fn is_path_like(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || Path::new(specifier).is_absolute()
}

/// Split a bare specifier into package name and optional subpath.
fn parse_bare_specifier(specifier: &str) -> Option<(&str, Option<&str>)> {
    let name_end = if specifier.starts_with('@') {
        let scope_end = specifier.find('/')?;
        specifier[scope_end + 1..]
            .find('/')
            .map_or(specifier.len(), |i| scope_end + 1 + i)
    } else {
        specifier.find('/').unwrap_or(specifier.len())
    };

    let name = &specifier[..name_end];
    if name.is_empty() || name.ends_with('/') {
        return None;
    }

    let subpath = specifier.get(name_end + 1..).filter(|s| !s.is_empty());
    Some((name, subpath))
}

/// Provider backed by a loaded [`PnpManifest`].
#[derive(Debug)]
pub struct ManifestApi {
    manifest: PnpManifest,
    fs: ArchiveFs,
}

impl ManifestApi {
    #[must_use]
    pub fn new(manifest: PnpManifest) -> Self {
        Self {
            manifest,
            fs: ArchiveFs::new(),
        }
    }

    #[must_use]
    pub fn manifest(&self) -> &PnpManifest {
        &self.manifest
    }

    fn read_package_json(&self, dir: &Path) -> Option<Value> {
        let content = self
            .fs
            .read_to_string_lossy(&dir.join("package.json"))
            .ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Probe a path as a file, with extensions, then as a directory.
    ///
    /// `visited` holds the directories already entered through `main`, so
    /// `main` fields pointing at each other end the walk.
    fn qualify(
        &self,
        unqualified: &Path,
        extensions: &[String],
        tried: &mut Vec<PathBuf>,
        visited: &mut HashSet<PathBuf>,
    ) -> Option<PathBuf> {
        let mut attempt = |candidate: PathBuf| -> Option<PathBuf> {
            if self.fs.is_file(&candidate) {
                return Some(candidate);
            }
            if tried.len() < MAX_TRIED_PATHS {
                tried.push(candidate);
            }
            None
        };

        if let Some(found) = attempt(unqualified.to_path_buf()) {
            return Some(found);
        }

        let display = unqualified.display().to_string();
        for ext in extensions {
            if let Some(found) = attempt(PathBuf::from(format!("{display}{ext}"))) {
                return Some(found);
            }
        }

        if !self.fs.is_dir(unqualified) || !visited.insert(normalize(unqualified)) {
            return None;
        }

        let main = self
            .read_package_json(unqualified)
            .and_then(|pkg| pkg.get("main").and_then(Value::as_str).map(str::to_string));
        if let Some(main) = main {
            let main_path = normalize(&unqualified.join(main));
            if let Some(found) = self.qualify(&main_path, extensions, tried, visited) {
                return Some(found);
            }
        }

        let index = unqualified.join("index");
        let index_display = index.display().to_string();
        extensions.iter().find_map(|ext| {
            let candidate = PathBuf::from(format!("{index_display}{ext}"));
            if self.fs.is_file(&candidate) {
                Some(candidate)
            } else {
                if tried.len() < MAX_TRIED_PATHS {
                    tried.push(candidate);
                }
                None
            }
        })
    }

    fn qualify_or_fail(
        &self,
        unqualified: &Path,
        options: &ResolveOptions,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let mut tried = Vec::new();
        let mut visited = HashSet::new();
        if let Some(found) =
            self.qualify(unqualified, &options.extensions, &mut tried, &mut visited)
        {
            return Ok(Some(found));
        }

        trace!(path = %unqualified.display(), tried = tried.len(), "Qualification failed");
        let mut message = format!(
            "Qualified path resolution failed: none of the candidate paths exist.\n\nSource path: {}",
            unqualified.display()
        );
        for path in &tried {
            let _ = write!(message, "\nNot found: {}", path.display());
        }
        Err(ProviderError::qualified_path_failed(message))
    }

    fn issuer_locator(&self, issuer: Option<&str>) -> PackageLocator {
        issuer
            .and_then(|i| self.manifest.find_locator(&issuer_dir_or_file(i)))
            .cloned()
            .unwrap_or_else(PackageLocator::top_level)
    }

    fn package_info(&self, locator: &PackageLocator) -> Result<&PackageInfo, ProviderError> {
        self.manifest.package(locator).ok_or_else(|| {
            ProviderError::internal(format!(
                "{locator} is referenced by the dependency tree but missing from the package registry"
            ))
        })
    }

    /// Find the package `name` resolves to when required by `issuer`.
    fn find_dependency(
        &self,
        name: &str,
        issuer_locator: &PackageLocator,
        issuer: Option<&str>,
    ) -> Result<PackageLocator, ProviderError> {
        let declared = self
            .manifest
            .package(issuer_locator)
            .and_then(|info| info.package_dependencies.get(name));

        let target: Option<&DependencyTarget> = match declared {
            Some(Some(target)) => Some(target),
            Some(None) => {
                return Err(ProviderError::missing_peer_dependency(format!(
                    "{issuer_locator} tried to access {name} (a peer dependency) but it isn't provided by its ancestors.\n\nRequired package: {name}\nRequired by: {}",
                    issuer.unwrap_or("<unknown>")
                )));
            }
            None => self.fallback_dependency(name, issuer_locator),
        };

        match target {
            Some(target) => Ok(target.locator(name)),
            None if is_builtin(name) => Err(ProviderError::builtin_failed(format!(
                "{name} is a Node builtin, but builtins are not considered in this resolution context and {name} is not declared as a dependency.\n\nRequired package: {name}\nRequired by: {}",
                issuer.unwrap_or("<unknown>")
            ))),
            None if issuer_locator.is_top_level() => {
                Err(ProviderError::undeclared_dependency(format!(
                    "Your application tried to access {name}, but it isn't declared in your dependencies.\n\nRequired package: {name}\nRequired by: {}",
                    issuer.unwrap_or("<unknown>")
                )))
            }
            None => Err(ProviderError::undeclared_dependency(format!(
                "{issuer_locator} tried to access {name}, but it isn't declared in its dependencies.\n\nRequired package: {name}\nRequired by: {}",
                issuer.unwrap_or("<unknown>")
            ))),
        }
    }

    fn fallback_dependency(
        &self,
        name: &str,
        issuer_locator: &PackageLocator,
    ) -> Option<&DependencyTarget> {
        if !self.manifest.top_level_fallback_enabled()
            || self.manifest.is_fallback_excluded(issuer_locator)
        {
            return None;
        }

        let top_level = self
            .manifest
            .package(&PackageLocator::top_level())
            .and_then(|info| info.package_dependencies.get(name))
            .and_then(Option::as_ref);

        top_level.or_else(|| {
            self.manifest
                .fallback_pool()
                .get(name)
                .and_then(Option::as_ref)
        })
    }

    fn resolve_in_package(
        &self,
        info: &PackageInfo,
        subpath: Option<&str>,
        options: &ResolveOptions,
        specifier: &str,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let location = &info.package_location;
        let pkg_json = self.read_package_json(location);

        if let Some(pkg) = pkg_json.as_ref().filter(|p| p.get("exports").is_some()) {
            let export_subpath = subpath.map(|s| format!("./{s}"));
            return match resolve_exports(pkg, export_subpath.as_deref(), &options.conditions) {
                Some(target) => self.qualify_or_fail(&normalize(&location.join(target)), options),
                None => Err(ProviderError::exports_not_found(format!(
                    "{} is not exported by the package at {} under the conditions [{}]",
                    export_subpath.as_deref().unwrap_or("."),
                    location.display(),
                    options.conditions.iter().collect::<Vec<_>>().join(", ")
                ))),
            };
        }

        trace!(specifier, location = %location.display(), "Resolving without exports");
        let unqualified = match subpath {
            Some(sub) => normalize(&location.join(sub)),
            None => location.clone(),
        };
        self.qualify_or_fail(&unqualified, options)
    }

    fn resolve_package_import(
        &self,
        specifier: &str,
        issuer: Option<&str>,
        options: &ResolveOptions,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let issuer_locator = self.issuer_locator(issuer);
        let info = self.package_info(&issuer_locator)?;
        let target = self
            .read_package_json(&info.package_location)
            .and_then(|pkg| resolve_imports_map(&pkg, specifier, &options.conditions))
            .ok_or_else(|| {
                ProviderError::module_not_found(format!(
                    "{specifier} is not defined in the imports field of {issuer_locator}"
                ))
            })?;

        if target.starts_with("./") {
            return self.qualify_or_fail(&normalize(&info.package_location.join(target)), options);
        }

        let context = dir_context(&info.package_location);
        self.resolve_request(&target, Some(&context), options)
    }
}

/// The path used to find an issuer's package (its directory, or the file itself).
fn issuer_dir_or_file(issuer: &str) -> PathBuf {
    normalize(Path::new(issuer))
}

impl PnpApi for ManifestApi {
    fn resolve_request(
        &self,
        specifier: &str,
        issuer: Option<&str>,
        options: &ResolveOptions,
    ) -> Result<Option<PathBuf>, ProviderError> {
        if specifier == PNPAPI_SPECIFIER {
            return Ok(Some(self.manifest.manifest_path().to_path_buf()));
        }

        if options.consider_builtins && is_builtin(specifier) {
            return Ok(None);
        }

        if is_path_like(specifier) {
            let base = issuer.map_or_else(
                || self.manifest.project_root().to_path_buf(),
                issuer_dir,
            );
            return self.qualify_or_fail(&normalize(&base.join(specifier)), options);
        }

        if specifier.starts_with('#') {
            return self.resolve_package_import(specifier, issuer, options);
        }

        let (name, subpath) = parse_bare_specifier(specifier).ok_or_else(|| {
            ProviderError::module_not_found(format!("Invalid package specifier: {specifier}"))
        })?;

        let issuer_locator = self.issuer_locator(issuer);
        let dependency = self.find_dependency(name, &issuer_locator, issuer)?;
        let info = self.package_info(&dependency)?;

        trace!(specifier, dependency = %dependency, "Dependency located");
        self.resolve_in_package(info, subpath, options, specifier)
    }

    fn find_package_locator(&self, path: &Path) -> Option<PackageLocator> {
        self.manifest.find_locator(path).cloned()
    }

    fn get_package_information(&self, locator: &PackageLocator) -> Option<PackageInfo> {
        self.manifest.package(locator).cloned()
    }

    fn resolve_virtual(&self, path: &Path) -> Option<PathBuf> {
        resolve_virtual(path)
    }
}

/// Locates the [`ManifestApi`] for issuers inside its project.
#[derive(Debug, Clone)]
pub struct ManifestLocator {
    api: Arc<ManifestApi>,
}

impl ManifestLocator {
    #[must_use]
    pub fn new(manifest: PnpManifest) -> Self {
        Self {
            api: Arc::new(ManifestApi::new(manifest)),
        }
    }

    /// Load the manifest at `path`.
    pub fn load(path: &Path) -> Result<Self, Error> {
        PnpManifest::load(path).map(Self::new)
    }

    /// Find and load the nearest `.pnp.data.json` above `start`.
    pub fn discover(start: &Path) -> Result<Self, Error> {
        let path = find_up(start, MANIFEST_FILE_NAME).ok_or_else(|| Error::ManifestNotFound {
            start: start.to_path_buf(),
        })?;
        Self::load(&path)
    }

    #[must_use]
    pub fn api(&self) -> &Arc<ManifestApi> {
        &self.api
    }
}

impl ProviderLocator for ManifestLocator {
    fn find_api(&self, issuer: &str) -> Option<Arc<dyn PnpApi>> {
        let path = normalize(Path::new(issuer));
        let manifest = self.api.manifest();
        if !path.starts_with(manifest.project_root()) || manifest.is_ignored(&path) {
            return None;
        }
        Some(Arc::clone(&self.api) as Arc<dyn PnpApi>)
    }
}
