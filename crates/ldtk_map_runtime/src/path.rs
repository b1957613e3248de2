//! Asset path resolution
//!
//! Paths inside LDtk documents are relative to the document that names
//! them. [`resolve`] joins them onto the referencing document's directory
//! and then rewrites the result through a [`PathMap`], so hosts can point
//! asset folders somewhere else without touching the project.

use regex::Regex;

/// One redirection rule
#[derive(Debug, Clone)]
pub enum PathMapping {
    /// Replace the whole path with `output` when it contains `path`
    Literal { path: String, output: String },
    /// Replace the whole path with `output` when `regex` matches; `[match]`
    /// in `output` becomes the first capture group
    Pattern { regex: Regex, output: String },
}

impl PathMapping {
    pub fn literal(path: impl Into<String>, output: impl Into<String>) -> Self {
        PathMapping::Literal {
            path: path.into(),
            output: output.into(),
        }
    }

    pub fn pattern(regex: Regex, output: impl Into<String>) -> Self {
        PathMapping::Pattern {
            regex,
            output: output.into(),
        }
    }

    /// Rewritten path, or `None` when the rule does not apply
    pub fn apply(&self, resolved: &str) -> Option<String> {
        match self {
            PathMapping::Literal { path, output } => {
                resolved.contains(path.as_str()).then(|| output.clone())
            }
            PathMapping::Pattern { regex, output } => {
                let captures = regex.captures(resolved)?;
                let first = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                Some(output.replace("[match]", first))
            }
        }
    }
}

impl PartialEq for PathMapping {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                PathMapping::Literal { path, output },
                PathMapping::Literal {
                    path: other_path,
                    output: other_output,
                },
            ) => path == other_path && output == other_output,
            (
                PathMapping::Pattern { regex, output },
                PathMapping::Pattern {
                    regex: other_regex,
                    output: other_output,
                },
            ) => regex.as_str() == other_regex.as_str() && output == other_output,
            _ => false,
        }
    }
}

/// Ordered redirection table; the first matching rule wins
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathMap {
    entries: Vec<PathMapping>,
}

impl PathMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, mapping: PathMapping) -> Self {
        self.entries.push(mapping);
        self
    }

    pub fn push(&mut self, mapping: PathMapping) {
        self.entries.push(mapping);
    }

    pub fn entries(&self) -> &[PathMapping] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite a resolved path, passing it through when nothing matches
    pub fn rewrite(&self, resolved: &str) -> String {
        self.entries
            .iter()
            .find_map(|mapping| mapping.apply(resolved))
            .unwrap_or_else(|| resolved.to_string())
    }
}

impl FromIterator<PathMapping> for PathMap {
    fn from_iter<I: IntoIterator<Item = PathMapping>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Resolve `path` as referenced from the document at `origin`
///
/// A leading `/` keeps `path` as is. Otherwise the last segment of
/// `origin` is dropped when it looks like a file (contains a `.`) and the
/// segments of `path` are appended. `..` segments are kept verbatim.
pub fn resolve(origin: &str, path: &str, map: &PathMap) -> String {
    let joined = if path.starts_with('/') {
        path.to_string()
    } else {
        let mut segments: Vec<&str> = if origin.is_empty() {
            Vec::new()
        } else {
            origin.split('/').collect()
        };
        if segments.last().is_some_and(|last| last.contains('.')) {
            segments.pop();
        }
        segments.extend(path.split('/'));
        segments.join("/")
    };
    map.rewrite(&joined)
}
