//! Package.json `exports` / `imports` evaluation against a condition set.
//!
//! - Root exports (`"."`, string shorthand, root-level conditions)
//! - Subpath exports (`"./feature"`)
//! - Pattern exports with a single `*` wildcard
//! - Conditional targets, matched in object key order, nested and in arrays

use crate::conditions::ConditionSet;
use serde_json::Value;
use std::cmp::Ordering;

/// Resolve exports for any subpath.
///
/// - `None` resolves the package root
/// - `Some("./feature")` resolves an exact subpath, then patterns
///
/// Returns the target path (starting with "./") if found.
#[must_use]
pub fn resolve_exports(
    pkg_json: &Value,
    subpath: Option<&str>,
    conditions: &ConditionSet,
) -> Option<String> {
    match subpath {
        None => resolve_exports_root(pkg_json, conditions),
        Some(sub) => resolve_exports_subpath(pkg_json, sub, conditions)
            .or_else(|| resolve_exports_pattern(pkg_json, sub, conditions)),
    }
}

/// Resolve the root export.
///
/// Supported shapes:
/// - `exports: "./path"`
/// - `exports: { ".": <target> }`
/// - `exports: { "import": ..., "default": ... }` (root-level conditions)
#[must_use]
pub fn resolve_exports_root(pkg_json: &Value, conditions: &ConditionSet) -> Option<String> {
    let exports = pkg_json.get("exports")?;

    if exports.is_string() || exports.is_array() {
        return resolve_target(exports, conditions);
    }

    let obj = exports.as_object()?;

    if let Some(dot) = obj.get(".") {
        return resolve_target(dot, conditions);
    }

    // A conditions object at the root has no "."-prefixed keys.
    if !obj.keys().any(|k| k.starts_with('.')) {
        return resolve_target(exports, conditions);
    }

    None
}

/// Resolve an exact subpath export; `subpath` must look like `"./feature"`.
#[must_use]
pub fn resolve_exports_subpath(
    pkg_json: &Value,
    subpath: &str,
    conditions: &ConditionSet,
) -> Option<String> {
    if !subpath.starts_with("./") {
        return None;
    }

    let obj = pkg_json.get("exports")?.as_object()?;
    if !has_subpath_keys(obj) {
        return None;
    }

    resolve_target(obj.get(subpath)?, conditions)
}

/// Resolve a pattern export such as `"./features/*"`.
///
/// The most specific pattern (longest key) wins; ties break lexicographically.
fn resolve_exports_pattern(
    pkg_json: &Value,
    subpath: &str,
    conditions: &ConditionSet,
) -> Option<String> {
    if !subpath.starts_with("./") {
        return None;
    }

    let obj = pkg_json.get("exports")?.as_object()?;

    let (_, target, star_value) = obj
        .iter()
        .filter(|(key, _)| key.starts_with("./") && key.matches('*').count() == 1)
        .filter_map(|(key, value)| {
            match_pattern(key, subpath).map(|star| (key.as_str(), value, star))
        })
        .min_by(|a, b| pattern_key_order(a.0, b.0))?;

    let target = resolve_target(target, conditions)?;
    substitute_star(&target, &star_value)
}

/// Resolve a `#`-prefixed specifier from the `imports` field.
///
/// The target may be a relative path (`./src/x.js`) or a bare specifier
/// that must be resolved again as a dependency.
#[must_use]
pub fn resolve_imports_map(
    pkg_json: &Value,
    spec: &str,
    conditions: &ConditionSet,
) -> Option<String> {
    if !spec.starts_with('#') {
        return None;
    }

    let imports = pkg_json.get("imports")?.as_object()?;

    if let Some(target) = imports.get(spec) {
        return resolve_any_target(target, conditions);
    }

    let (_, target, star_value) = imports
        .iter()
        .filter(|(key, _)| key.matches('*').count() == 1)
        .filter_map(|(key, value)| {
            match_pattern(key, spec).map(|star| (key.as_str(), value, star))
        })
        .min_by(|a, b| pattern_key_order(a.0, b.0))?;

    let target = resolve_any_target(target, conditions)?;
    Some(target.replace('*', &star_value))
}

/// Most specific pattern first: the longer text before `*`, then the longer
/// key overall.
fn pattern_key_order(a: &str, b: &str) -> Ordering {
    let base = |key: &str| key.find('*').map_or(key.len(), |i| i + 1);
    base(b)
        .cmp(&base(a))
        .then_with(|| b.len().cmp(&a.len()))
        .then_with(|| a.cmp(b))
}

fn has_subpath_keys(obj: &serde_json::Map<String, Value>) -> bool {
    obj.keys().any(|k| k.starts_with("./"))
}

/// Match a pattern key against a subpath, returning the `*` value.
fn match_pattern(pattern: &str, subpath: &str) -> Option<String> {
    let (prefix, suffix) = pattern.split_once('*')?;

    if subpath.len() < prefix.len() + suffix.len()
        || !subpath.starts_with(prefix)
        || !subpath.ends_with(suffix)
    {
        return None;
    }

    let star_value = &subpath[prefix.len()..subpath.len() - suffix.len()];
    if star_value.is_empty() {
        return None;
    }

    Some(star_value.to_string())
}

/// Substitute `*` in the target, rejecting traversal out of the package.
fn substitute_star(target: &str, star_value: &str) -> Option<String> {
    if target.matches('*').count() != 1 {
        return None;
    }

    let result = target.replace('*', star_value);

    if !result.starts_with("./") || result.split('/').any(|segment| segment == "..") {
        return None;
    }

    Some(result)
}

/// Resolve an exports target: a path, a conditions object, or a fallback array.
fn resolve_target(target: &Value, conditions: &ConditionSet) -> Option<String> {
    resolve_with(target, conditions, &validate_export_path)
}

/// Like [`resolve_target`] but also accepts bare specifiers (`imports` field).
fn resolve_any_target(target: &Value, conditions: &ConditionSet) -> Option<String> {
    resolve_with(target, conditions, &|s: &str| {
        if s.starts_with('/') || s.starts_with("../") {
            None
        } else {
            Some(s.to_string())
        }
    })
}

fn resolve_with(
    target: &Value,
    conditions: &ConditionSet,
    accept: &dyn Fn(&str) -> Option<String>,
) -> Option<String> {
    match target {
        Value::String(s) => accept(s),
        Value::Array(items) => items
            .iter()
            .find_map(|item| resolve_with(item, conditions, accept)),
        // First key present in the condition set wins, in object order.
        Value::Object(map) => map
            .iter()
            .filter(|(key, _)| conditions.contains(key))
            .find_map(|(_, value)| resolve_with(value, conditions, accept)),
        _ => None,
    }
}

/// Export targets must be relative and start with "./".
fn validate_export_path(path: &str) -> Option<String> {
    if path.starts_with("./") {
        Some(path.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn import_set() -> ConditionSet {
        ["default", "import", "node"].into_iter().collect()
    }

    fn require_set() -> ConditionSet {
        ["default", "require", "node"].into_iter().collect()
    }

    #[test]
    fn test_exports_string_root() {
        let pkg = json!({ "exports": "./index.js" });
        assert_eq!(
            resolve_exports_root(&pkg, &import_set()),
            Some("./index.js".to_string())
        );
    }

    #[test]
    fn test_exports_conditions_follow_key_order() {
        let pkg = json!({
            "exports": {
                ".": {
                    "node": "./node.js",
                    "import": "./esm.js",
                    "default": "./fallback.js"
                }
            }
        });
        // "node" comes first in the object, so it wins for both flavors.
        assert_eq!(
            resolve_exports_root(&pkg, &import_set()),
            Some("./node.js".to_string())
        );
        let browser: ConditionSet = ["default", "import", "browser"].into_iter().collect();
        assert_eq!(
            resolve_exports_root(&pkg, &browser),
            Some("./esm.js".to_string())
        );
    }

    #[test]
    fn test_exports_root_conditions_by_flavor() {
        let pkg = json!({
            "exports": {
                "import": "./esm.mjs",
                "require": "./cjs.cjs"
            }
        });
        assert_eq!(
            resolve_exports_root(&pkg, &import_set()),
            Some("./esm.mjs".to_string())
        );
        assert_eq!(
            resolve_exports_root(&pkg, &require_set()),
            Some("./cjs.cjs".to_string())
        );
    }

    #[test]
    fn test_exports_nested_conditions() {
        let pkg = json!({
            "exports": {
                ".": {
                    "browser": "./browser.js",
                    "import": { "types": "./index.d.ts", "default": "./esm/index.js" },
                    "default": "./cjs/index.js"
                }
            }
        });
        assert_eq!(
            resolve_exports_root(&pkg, &import_set()),
            Some("./esm/index.js".to_string())
        );
        assert_eq!(
            resolve_exports_root(&pkg, &require_set()),
            Some("./cjs/index.js".to_string())
        );
    }

    #[test]
    fn test_exports_array_fallback() {
        let pkg = json!({ "exports": { ".": ["not-relative", "./ok.js"] } });
        assert_eq!(
            resolve_exports_root(&pkg, &import_set()),
            Some("./ok.js".to_string())
        );
    }

    #[test]
    fn test_exports_null_target_excluded() {
        let pkg = json!({ "exports": { ".": "./index.js", "./internal": null } });
        assert_eq!(resolve_exports(&pkg, Some("./internal"), &import_set()), None);
    }

    #[test]
    fn test_exports_subpath_and_pattern() {
        let pkg = json!({
            "exports": {
                ".": "./index.js",
                "./feature": { "require": "./feature.cjs", "default": "./feature.mjs" },
                "./*": "./dist/*.js",
                "./features/*": "./dist/features/*.js"
            }
        });
        assert_eq!(
            resolve_exports(&pkg, Some("./feature"), &require_set()),
            Some("./feature.cjs".to_string())
        );
        assert_eq!(
            resolve_exports(&pkg, Some("./feature"), &import_set()),
            Some("./feature.mjs".to_string())
        );
        assert_eq!(
            resolve_exports(&pkg, Some("./features/auth"), &import_set()),
            Some("./dist/features/auth.js".to_string())
        );
        assert_eq!(
            resolve_exports(&pkg, Some("./utils"), &import_set()),
            Some("./dist/utils.js".to_string())
        );
    }

    #[test]
    fn test_exports_pattern_rejects_traversal() {
        let pkg = json!({ "exports": { "./*": "./dist/*" } });
        assert_eq!(
            resolve_exports(&pkg, Some("./../secret"), &import_set()),
            None
        );
    }

    #[test]
    fn test_pattern_with_longer_prefix_wins() {
        let pkg = json!({
            "exports": {
                "./features/*.js": "./generic/*.js",
                "./features/x/*": "./specific/*"
            },
            "imports": {
                "#lib/*.js": "./generic/*.js",
                "#lib/x/*": "./specific/*"
            }
        });
        assert_eq!(
            resolve_exports(&pkg, Some("./features/x/y.js"), &import_set()),
            Some("./specific/y.js".to_string())
        );
        assert_eq!(
            resolve_exports(&pkg, Some("./features/z.js"), &import_set()),
            Some("./generic/z.js".to_string())
        );
        assert_eq!(
            resolve_imports_map(&pkg, "#lib/x/y.js", &import_set()),
            Some("./specific/y.js".to_string())
        );
    }

    #[test]
    fn test_pattern_key_order() {
        assert_eq!(pattern_key_order("./a/b/*", "./a/*.js"), Ordering::Less);
        assert_eq!(pattern_key_order("./a/*.js", "./a/*"), Ordering::Less);
        assert_eq!(pattern_key_order("./a/*", "./a/*"), Ordering::Equal);
    }

    #[test]
    fn test_exports_subpath_with_string_exports() {
        let pkg = json!({ "exports": "./index.js" });
        assert_eq!(resolve_exports(&pkg, Some("./feature"), &import_set()), None);
    }

    #[test]
    fn test_no_exports_field() {
        let pkg = json!({ "main": "./main.js" });
        assert_eq!(resolve_exports(&pkg, None, &import_set()), None);
    }

    #[test]
    fn test_imports_exact_and_pattern() {
        let pkg = json!({
            "imports": {
                "#config": { "node": "./config.node.js", "default": "./config.js" },
                "#utils/*": "./src/utils/*.js",
                "#dep": "lodash"
            }
        });
        assert_eq!(
            resolve_imports_map(&pkg, "#config", &import_set()),
            Some("./config.node.js".to_string())
        );
        assert_eq!(
            resolve_imports_map(&pkg, "#utils/strings", &import_set()),
            Some("./src/utils/strings.js".to_string())
        );
        assert_eq!(
            resolve_imports_map(&pkg, "#dep", &import_set()),
            Some("lodash".to_string())
        );
        assert_eq!(resolve_imports_map(&pkg, "#missing", &import_set()), None);
        assert_eq!(resolve_imports_map(&pkg, "config", &import_set()), None);
    }
}
