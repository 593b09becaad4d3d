//! `.pnp.data.json` model.
//!
//! The on-disk format is tuple-heavy (`[[name, [[reference, info]]]]`); it is
//! parsed into raw serde types and then flattened into lookup tables with
//! absolute package locations.

use super::{DependencyTarget, LinkType, PackageInfo, PackageLocator};
use crate::error::Error;
use crate::paths::normalize;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    #[serde(default = "default_true")]
    enable_top_level_fallback: bool,
    #[serde(default)]
    ignore_pattern_data: Option<String>,
    #[serde(default)]
    fallback_exclusion_list: Vec<(String, Vec<String>)>,
    #[serde(default)]
    fallback_pool: Vec<(String, Option<RawDependency>)>,
    package_registry_data: Vec<(Option<String>, Vec<(Option<String>, RawPackage)>)>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPackage {
    package_location: String,
    #[serde(default)]
    package_dependencies: Vec<(String, Option<RawDependency>)>,
    #[serde(default = "default_link_type")]
    link_type: LinkType,
}

fn default_link_type() -> LinkType {
    LinkType::Hard
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDependency {
    Reference(String),
    Alias(String, String),
}

impl From<RawDependency> for DependencyTarget {
    fn from(raw: RawDependency) -> Self {
        match raw {
            RawDependency::Reference(reference) => Self::Reference(reference),
            RawDependency::Alias(name, reference) => Self::Alias { name, reference },
        }
    }
}

type Dependencies = BTreeMap<String, Option<DependencyTarget>>;

fn to_dependencies(raw: Vec<(String, Option<RawDependency>)>) -> Dependencies {
    raw.into_iter()
        .map(|(name, target)| (name, target.map(DependencyTarget::from)))
        .collect()
}

/// A loaded PnP manifest.
#[derive(Debug)]
pub struct PnpManifest {
    manifest_path: PathBuf,
    project_root: PathBuf,
    packages: BTreeMap<PackageLocator, PackageInfo>,
    /// Package locations, longest first, for owner lookups.
    locations: Vec<(PathBuf, PackageLocator)>,
    enable_top_level_fallback: bool,
    fallback_pool: Dependencies,
    fallback_exclusion_list: BTreeMap<String, BTreeSet<String>>,
    ignore_pattern: Option<regex_lite::Regex>,
}

impl PnpManifest {
    /// Load a manifest file; package locations resolve against its directory.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest_path = dunce::canonicalize(path).map_err(|source| Error::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content, &manifest_path)
    }

    /// Parse a manifest as if it were stored at `manifest_path`.
    pub fn from_json(content: &str, manifest_path: &Path) -> Result<Self, Error> {
        let raw: RawManifest =
            serde_json::from_str(content).map_err(|source| Error::ManifestParse {
                path: manifest_path.to_path_buf(),
                source,
            })?;

        let project_root = manifest_path
            .parent()
            .map_or_else(|| PathBuf::from("/"), Path::to_path_buf);

        let ignore_pattern = raw
            .ignore_pattern_data
            .as_deref()
            .map(regex_lite::Regex::new)
            .transpose()
            .map_err(|e| Error::ManifestInvalid {
                path: manifest_path.to_path_buf(),
                message: format!("ignorePatternData: {e}"),
            })?;

        let mut packages = BTreeMap::new();
        let mut locations = Vec::new();

        for (name, references) in raw.package_registry_data {
            for (reference, pkg) in references {
                let locator = PackageLocator {
                    name: name.clone(),
                    reference,
                };
                let location = normalize(&project_root.join(&pkg.package_location));
                locations.push((location.clone(), locator.clone()));
                packages.insert(
                    locator,
                    PackageInfo {
                        package_location: location,
                        package_dependencies: to_dependencies(pkg.package_dependencies),
                        link_type: pkg.link_type,
                    },
                );
            }
        }

        // Deepest location first so nested packages win over their parents;
        // a workspace sharing the project root wins over the top-level locator.
        locations.sort_by(|a, b| {
            b.0.components()
                .count()
                .cmp(&a.0.components().count())
                .then_with(|| a.1.is_top_level().cmp(&b.1.is_top_level()))
                .then_with(|| a.0.cmp(&b.0))
        });

        Ok(Self {
            manifest_path: manifest_path.to_path_buf(),
            project_root,
            packages,
            locations,
            enable_top_level_fallback: raw.enable_top_level_fallback,
            fallback_pool: to_dependencies(raw.fallback_pool),
            fallback_exclusion_list: raw
                .fallback_exclusion_list
                .into_iter()
                .map(|(name, refs)| (name, refs.into_iter().collect()))
                .collect(),
            ignore_pattern,
        })
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    #[must_use]
    pub fn package(&self, locator: &PackageLocator) -> Option<&PackageInfo> {
        self.packages.get(locator)
    }

    /// The package whose location contains `path` (deepest match).
    #[must_use]
    pub fn find_locator(&self, path: &Path) -> Option<&PackageLocator> {
        let path = normalize(path);
        self.locations
            .iter()
            .find(|(location, _)| path.starts_with(location))
            .map(|(_, locator)| locator)
    }

    #[must_use]
    pub fn top_level_fallback_enabled(&self) -> bool {
        self.enable_top_level_fallback
    }

    #[must_use]
    pub fn fallback_pool(&self) -> &Dependencies {
        &self.fallback_pool
    }

    /// Whether `locator` is barred from fallback lookups.
    #[must_use]
    pub fn is_fallback_excluded(&self, locator: &PackageLocator) -> bool {
        match (&locator.name, &locator.reference) {
            (Some(name), Some(reference)) => self
                .fallback_exclusion_list
                .get(name)
                .is_some_and(|refs| refs.contains(reference)),
            _ => false,
        }
    }

    /// Whether `path` is excluded from PnP by `ignorePatternData`.
    ///
    /// The pattern applies to the path relative to the project root.
    #[must_use]
    pub fn is_ignored(&self, path: &Path) -> bool {
        let Some(pattern) = &self.ignore_pattern else {
            return false;
        };
        let path = normalize(path);
        let Ok(relative) = path.strip_prefix(&self.project_root) else {
            return false;
        };
        pattern.is_match(&relative.to_string_lossy().replace('\\', "/"))
    }
}
