//! End-to-end resolution through the PnP plugin against an on-disk project.

use howth_pnp::{
    BuildOptions, FailurePolicy, ImportKind, ImportRequest, LoadArgs, ManifestLocator, Plugin,
    PluginChain, PnpPlugin, PnpPluginOptions, ProviderLocator, Severity, PNP_NAMESPACE,
};
use serial_test::serial;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MANIFEST: &str = r#"{
    "dependencyTreeRoots": [{ "name": "app", "reference": "workspace:." }],
    "enableTopLevelFallback": false,
    "ignorePatternData": "^vendor/",
    "packageRegistryData": [
        [null, [[null, {
            "packageLocation": "./",
            "packageDependencies": [["app", "workspace:."]],
            "linkType": "SOFT"
        }]]],
        ["app", [["workspace:.", {
            "packageLocation": "./",
            "packageDependencies": [
                ["app", "workspace:."],
                ["pkg-a", "npm:1.0.0"],
                ["ui", "virtual:abc#portal:./packages/ui"],
                ["strip", ["strip-ansi", "npm:7.1.0"]]
            ],
            "linkType": "SOFT"
        }]]],
        ["pkg-a", [["npm:1.0.0", {
            "packageLocation": "./.yarn/cache/pkg-a-npm-1.0.0-abc.zip/node_modules/pkg-a/",
            "packageDependencies": [["pkg-a", "npm:1.0.0"], ["peer", null]],
            "linkType": "HARD"
        }]]],
        ["strip-ansi", [["npm:7.1.0", {
            "packageLocation": "./.yarn/cache/strip-ansi-npm-7.1.0-def.zip/node_modules/strip-ansi/",
            "packageDependencies": [["strip-ansi", "npm:7.1.0"]],
            "linkType": "HARD"
        }]]],
        ["ui", [["virtual:abc#portal:./packages/ui", {
            "packageLocation": "./.yarn/__virtual__/ui-virtual-abc/1/packages/ui/",
            "packageDependencies": [["ui", "virtual:abc#portal:./packages/ui"]],
            "linkType": "SOFT"
        }]]]
    ]
}"#;

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    let options = zip::write::SimpleFileOptions::default();
    for (name, contents) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
    manifest: PathBuf,
    locator: Arc<ManifestLocator>,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dunce::canonicalize(dir.path()).unwrap();

        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/index.ts"), "import './util';").unwrap();
        std::fs::write(root.join("src/util.ts"), "export const util = 1;").unwrap();
        std::fs::write(root.join("package.json"), r#"{ "name": "app" }"#).unwrap();

        std::fs::create_dir_all(root.join("vendor")).unwrap();
        std::fs::write(root.join("vendor/legacy.js"), "require('pkg-a');").unwrap();

        std::fs::create_dir_all(root.join("packages/ui/src")).unwrap();
        std::fs::write(
            root.join("packages/ui/package.json"),
            r#"{ "name": "ui", "main": "./src/button.js" }"#,
        )
        .unwrap();
        std::fs::write(root.join("packages/ui/src/button.js"), "export {};").unwrap();

        std::fs::create_dir_all(root.join(".yarn/cache")).unwrap();
        write_zip(
            &root.join(".yarn/cache/pkg-a-npm-1.0.0-abc.zip"),
            &[
                (
                    "node_modules/pkg-a/package.json",
                    r#"{ "name": "pkg-a", "exports": { ".": { "import": "./esm/index.mjs", "default": "./cjs/index.js" }, "./util": "./util.js" } }"#,
                ),
                ("node_modules/pkg-a/esm/index.mjs", "export default 1;"),
                ("node_modules/pkg-a/cjs/index.js", "module.exports = 1;"),
                ("node_modules/pkg-a/util.js", "module.exports = 'util';"),
            ],
        );
        write_zip(
            &root.join(".yarn/cache/strip-ansi-npm-7.1.0-def.zip"),
            &[
                ("node_modules/strip-ansi/package.json", r#"{ "main": "index.js" }"#),
                ("node_modules/strip-ansi/index.js", "export default s => s;"),
            ],
        );

        let manifest = root.join(".pnp.data.json");
        std::fs::write(&manifest, MANIFEST).unwrap();
        let locator = Arc::new(ManifestLocator::discover(&root.join("src")).unwrap());

        Self {
            _dir: dir,
            root,
            manifest,
            locator,
        }
    }

    fn plugin(&self, build: &BuildOptions) -> PnpPlugin {
        self.plugin_with(PnpPluginOptions::new(&self.root), build)
    }

    fn plugin_with(&self, options: PnpPluginOptions, build: &BuildOptions) -> PnpPlugin {
        let locator: Arc<dyn ProviderLocator> = self.locator.clone();
        PnpPlugin::new(options, build, Some(locator))
    }

    fn importer(&self) -> PathBuf {
        self.root.join("src/index.ts")
    }
}

#[test]
fn test_relative_import_is_managed() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let request = ImportRequest::new("./util", ImportKind::ImportStatement)
        .with_importer(project.importer())
        .with_resolve_dir(project.root.join("src"));
    let output = plugin.on_resolve(&request).unwrap().unwrap();

    assert_eq!(output.namespace.as_deref(), Some(PNP_NAMESPACE));
    assert_eq!(output.path, Some(project.root.join("src/util.ts")));
    assert!(!output.external);
    assert!(output.errors.is_empty() && output.warnings.is_empty());
    // The workspace is soft-linked, so its file is watched next to the manifest.
    assert_eq!(
        output.watch_files,
        [project.manifest.clone(), project.root.join("src/util.ts")]
    );
}

#[test]
fn test_hard_dependency_watches_manifest_only() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let request = ImportRequest::new("pkg-a/util", ImportKind::ImportStatement)
        .with_importer(project.importer());
    let output = plugin.on_resolve(&request).unwrap().unwrap();

    assert!(output.is_managed());
    let path = output.path.unwrap();
    assert!(path.ends_with("pkg-a-npm-1.0.0-abc.zip/node_modules/pkg-a/util.js"));
    assert_eq!(output.watch_files, [project.manifest.clone()]);
}

#[test]
fn test_conditions_follow_import_kind() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let esm = plugin
        .on_resolve(
            &ImportRequest::new("pkg-a", ImportKind::DynamicImport)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(esm.path.unwrap().ends_with("esm/index.mjs"));

    let cjs = plugin
        .on_resolve(
            &ImportRequest::new("pkg-a", ImportKind::RequireCall).with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(cjs.path.unwrap().ends_with("cjs/index.js"));
}

#[test]
fn test_aliased_dependency() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let output = plugin
        .on_resolve(
            &ImportRequest::new("strip", ImportKind::ImportStatement)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(output
        .path
        .unwrap()
        .ends_with("node_modules/strip-ansi/index.js"));
}

#[test]
fn test_soft_virtual_package_watches_real_path() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let output = plugin
        .on_resolve(
            &ImportRequest::new("ui", ImportKind::ImportStatement)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();

    let path = output.path.clone().unwrap();
    assert!(path.to_string_lossy().contains("__virtual__"));
    assert_eq!(
        output.watch_files,
        [
            project.manifest.clone(),
            project.root.join("packages/ui/src/button.js")
        ]
    );

    let loaded = plugin
        .on_load(&LoadArgs::new(&path, PNP_NAMESPACE))
        .unwrap()
        .unwrap();
    assert_eq!(loaded.contents, b"export {};");
    assert_eq!(loaded.loader, "default");
    assert_eq!(loaded.resolve_dir.as_deref(), path.parent());
}

#[test]
fn test_externals_never_reach_the_provider() {
    let project = Project::new();
    let build = BuildOptions::default().with_external(["left-*", "pkg-a"]);
    let plugin = project.plugin(&build);

    for specifier in ["left-pad", "pkg-a", "pkg-a/util"] {
        let output = plugin
            .on_resolve(
                &ImportRequest::new(specifier, ImportKind::ImportStatement)
                    .with_importer(project.importer()),
            )
            .unwrap()
            .unwrap();
        assert!(output.external, "{specifier}");
        assert!(output.watch_files.is_empty(), "{specifier}");
        assert!(output.errors.is_empty(), "{specifier}");
    }

    // Without the external, an undeclared package is an error.
    let output = project
        .plugin(&BuildOptions::default())
        .on_resolve(
            &ImportRequest::new("left-pad", ImportKind::ImportStatement)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(output.external);
    assert_eq!(output.errors.len(), 1);
    assert!(output.errors[0].text.contains("left-pad"));
}

#[test]
fn test_failures_downgrade_by_kind() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let guarded = plugin
        .on_resolve(
            &ImportRequest::new("missing-dep", ImportKind::DynamicImport)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(guarded.external);
    assert!(guarded.errors.is_empty());
    assert_eq!(guarded.warnings.len(), 1);
    assert_eq!(guarded.watch_files, [project.manifest.clone()]);

    let hard = plugin
        .on_resolve(
            &ImportRequest::new("missing-dep", ImportKind::ImportStatement)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(hard.external);
    assert_eq!(hard.errors.len(), 1);
    assert!(hard.warnings.is_empty());

    let strict = project.plugin_with(
        PnpPluginOptions::new(&project.root).with_failure_policy(
            FailurePolicy::new().with_severity(ImportKind::DynamicImport, Severity::Error),
        ),
        &BuildOptions::default(),
    );
    let output = strict
        .on_resolve(
            &ImportRequest::new("missing-dep", ImportKind::DynamicImport)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert_eq!(output.errors, guarded.warnings);
}

#[test]
fn test_peer_dependency_failure() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let importer = project
        .root
        .join(".yarn/cache/pkg-a-npm-1.0.0-abc.zip/node_modules/pkg-a/cjs/index.js");
    let output = plugin
        .on_resolve(&ImportRequest::new("peer", ImportKind::RequireCall).with_importer(importer))
        .unwrap()
        .unwrap();
    assert_eq!(output.warnings.len(), 1);
    assert!(output.warnings[0].text.contains("peer"));
}

#[test]
fn test_builtins_depend_on_platform() {
    let project = Project::new();

    let node = project.plugin(&BuildOptions::default().with_platform("node"));
    let output = node
        .on_resolve(
            &ImportRequest::new("node:fs", ImportKind::ImportStatement)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert!(output.external);
    assert!(output.errors.is_empty() && output.warnings.is_empty());
    assert_eq!(output.watch_files, [project.manifest.clone()]);

    let browser = project.plugin(&BuildOptions::default().with_platform("browser"));
    let output = browser
        .on_resolve(
            &ImportRequest::new("fs", ImportKind::ImportStatement)
                .with_importer(project.importer()),
        )
        .unwrap()
        .unwrap();
    assert_eq!(output.errors.len(), 1);
}

#[test]
fn test_ignored_and_outside_paths_delegate() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let ignored = ImportRequest::new("pkg-a", ImportKind::RequireCall)
        .with_importer(project.root.join("vendor/legacy.js"));
    assert_eq!(plugin.on_resolve(&ignored).unwrap(), None);

    let outside = ImportRequest::new("pkg-a", ImportKind::RequireCall)
        .with_importer("/somewhere/else/index.js");
    assert_eq!(plugin.on_resolve(&outside).unwrap(), None);
}

#[test]
fn test_entry_point_uses_base_dir() {
    let project = Project::new();
    let plugin = project.plugin(&BuildOptions::default());

    let output = plugin
        .on_resolve(&ImportRequest::new("./src/index.ts", ImportKind::EntryPoint))
        .unwrap()
        .unwrap();
    assert_eq!(output.path, Some(project.importer()));
}

#[test]
#[serial]
fn test_default_base_dir_is_cwd() {
    let project = Project::new();
    let original = std::env::current_dir().unwrap();
    std::env::set_current_dir(&project.root).unwrap();

    let plugin = project.plugin_with(PnpPluginOptions::default(), &BuildOptions::default());
    let output = plugin
        .on_resolve(&ImportRequest::new("./src/util", ImportKind::EntryPoint))
        .unwrap();

    std::env::set_current_dir(original).unwrap();
    assert_eq!(
        output.unwrap().path,
        Some(project.root.join("src/util.ts"))
    );
}

#[test]
fn test_chain_passes_unowned_requests_on() {
    struct NodeModules;

    impl Plugin for NodeModules {
        fn name(&self) -> &str {
            "node-modules"
        }

        fn on_resolve(
            &self,
            request: &ImportRequest,
        ) -> howth_pnp::HookResult<Option<howth_pnp::ResolveOutput>> {
            Ok(Some(
                howth_pnp::ResolveOutput::default()
                    .with_path(format!("/node_modules/{}", request.specifier)),
            ))
        }
    }

    let project = Project::new();
    let mut chain = PluginChain::new();
    chain.add(Box::new(project.plugin(&BuildOptions::default())));
    chain.add(Box::new(NodeModules));

    let outside = ImportRequest::new("react", ImportKind::ImportStatement)
        .with_importer("/somewhere/else/index.js");
    assert_eq!(
        chain.resolve(&outside).unwrap().unwrap().path,
        Some(PathBuf::from("/node_modules/react"))
    );

    let inside = ImportRequest::new("./util", ImportKind::ImportStatement)
        .with_importer(project.importer());
    assert!(chain.resolve(&inside).unwrap().unwrap().is_managed());
}
