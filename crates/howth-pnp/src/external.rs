//! External specifier matching.
//!
//! Externals are left for the host runtime to resolve. An entry is either an
//! exact specifier or a pattern with a single `*` wildcard (e.g. `left-*`).
//! Exact bare package names also cover their deep imports, so `react`
//! externalizes `react/jsx-runtime`.

/// A compiled external entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalPattern {
    Exact(String),
    Wildcard { prefix: String, suffix: String },
}

impl ExternalPattern {
    /// Compile a raw external specifier, splitting at the first `*`.
    #[must_use]
    pub fn compile(raw: &str) -> Self {
        match raw.split_once('*') {
            Some((prefix, suffix)) => Self::Wildcard {
                prefix: prefix.to_string(),
                suffix: suffix.to_string(),
            },
            None => Self::Exact(raw.to_string()),
        }
    }

    /// Test a candidate path against this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Wildcard { prefix, suffix } => {
                path.len() >= prefix.len() + suffix.len()
                    && path.starts_with(prefix.as_str())
                    && path.ends_with(suffix.as_str())
            }
            Self::Exact(pattern) => {
                if path == pattern {
                    return true;
                }
                is_bare_package(pattern)
                    && path
                        .strip_prefix(pattern.as_str())
                        .is_some_and(|rest| rest.starts_with('/'))
            }
        }
    }
}

/// Whether a specifier names a package rather than a path.
fn is_bare_package(spec: &str) -> bool {
    !(spec.starts_with('/')
        || spec.starts_with("./")
        || spec.starts_with("../")
        || spec == "."
        || spec == "..")
}

/// The compiled external list for a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Externals {
    patterns: Vec<ExternalPattern>,
}

impl Externals {
    /// Compile raw external specifiers.
    pub fn compile<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            patterns: raw
                .into_iter()
                .map(|s| ExternalPattern::compile(s.as_ref()))
                .collect(),
        }
    }

    /// Whether any pattern matches `path`.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    #[must_use]
    pub fn patterns(&self) -> &[ExternalPattern] {
        &self.patterns
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
