//! Listing manifest.
//!
//! The manifest is a flat, path-sorted index of a suite's spec modules and
//! directory READMEs. [`Listing::crawl`] builds it from a [`SuiteRegistry`]
//! and checks every module on the way: a non-empty description and a group
//! that passes `validate()`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FrameworkError, FrameworkResult};
use crate::loader::SuiteRegistry;
use crate::logger::to_json;
use crate::query::SpecId;

const SPEC_SUFFIX: &str = ".spec";
const README_NAME: &str = "README.txt";

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListingEntry {
    Spec { file: Vec<String>, description: String },
    Readme { file: Vec<String>, readme: String },
}

impl ListingEntry {
    pub fn file(&self) -> &[String] {
        match self {
            ListingEntry::Spec { file, .. } | ListingEntry::Readme { file, .. } => file,
        }
    }

    pub fn path(&self) -> String {
        self.file().join("/")
    }

    fn sort_key(&self) -> String {
        match self {
            ListingEntry::Spec { .. } => spec_sort_key(&self.path()),
            ListingEntry::Readme { .. } => readme_sort_key(&self.path()),
        }
    }
}

/// Position of a spec module among the suite's files.
pub(crate) fn spec_sort_key(path: &str) -> String {
    format!("{}{}", path, SPEC_SUFFIX)
}

fn readme_sort_key(dir: &str) -> String {
    if dir.is_empty() {
        README_NAME.to_string()
    } else {
        format!("{}/{}", dir, README_NAME)
    }
}

fn split_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').map(str::to_string).collect()
    }
}

/// The manifest of one suite.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub suite: String,
    pub entries: Vec<ListingEntry>,
}

impl Listing {
    /// Load and check every registered module, then emit sorted entries.
    pub fn crawl(registry: &SuiteRegistry) -> FrameworkResult<Self> {
        let mut entries = Vec::new();

        for path in registry.spec_paths() {
            let id = SpecId::new(registry.suite(), path);
            let module = registry.load(path)?;
            let description = module.description.trim();
            if description.is_empty() {
                return Err(FrameworkError::MissingDescription(id.to_string()));
            }
            module
                .group
                .validate()
                .map_err(|e| FrameworkError::InvalidSpec {
                    spec: id.to_string(),
                    source: Box::new(e),
                })?;
            debug!(spec = %id, cases = module.group.len(), "crawled spec");
            entries.push(ListingEntry::Spec {
                file: split_path(path),
                description: description.to_string(),
            });
        }

        for (dir, text) in registry.readmes() {
            entries.push(ListingEntry::Readme {
                file: split_path(dir),
                readme: text.trim().to_string(),
            });
        }

        entries.sort_by_key(ListingEntry::sort_key);
        Ok(Self {
            suite: registry.suite().to_string(),
            entries,
        })
    }

    /// Spec entries only, as ids.
    pub fn specs(&self) -> Vec<SpecId> {
        self.entries
            .iter()
            .filter(|e| matches!(e, ListingEntry::Spec { .. }))
            .map(|e| SpecId::new(&self.suite, e.path()))
            .collect()
    }

    /// The manifest as a JSON array.
    pub fn to_json(&self, indent: usize) -> FrameworkResult<String> {
        to_json(&self.entries, indent)
    }

    pub fn from_json(suite: impl Into<String>, json: &str) -> FrameworkResult<Self> {
        Ok(Self {
            suite: suite.into(),
            entries: serde_json::from_str(json)?,
        })
    }
}
