//! Entity lookup table.
//!
//! The table is versioned data (`data/entities.json`), embedded in the binary
//! as the default and replaceable with `--entities <file>`. It is loaded once
//! and handed to every consumer by reference; nothing mutates it afterwards.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::{CanonicalEntity, EntityClass};
use crate::text::squash;

const BUILTIN_TABLE: &str = include_str!("../../data/entities.json");

#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read entity table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid entity table: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate {class:?} code `{code}` in entity table")]
    DuplicateCode { class: EntityClass, code: String },

    #[error("override for `{pattern}` points at unknown code `{code}`")]
    UnknownOverrideTarget { pattern: String, code: String },
}

#[derive(Debug, Deserialize)]
struct TableFile {
    version: String,
    #[serde(default)]
    supranational: Vec<String>,
    #[serde(default)]
    overrides: Vec<OverrideFile>,
    entities: Vec<CanonicalEntity>,
}

#[derive(Debug, Deserialize)]
struct OverrideFile {
    dataset: Option<String>,
    #[serde(rename = "match")]
    pattern: String,
    code: String,
}

/// An explicit mapping applied before the generic rules.
#[derive(Debug, Clone)]
pub(crate) struct Override {
    /// `None` applies to every dataset.
    pub(crate) dataset: Option<String>,
    /// Squashed name key.
    pub(crate) pattern: String,
    pub(crate) entity: usize,
}

/// Immutable entity lookup data plus the indexes the resolver needs.
#[derive(Debug, Clone)]
pub struct EntityTable {
    version: String,
    pub(crate) entities: Vec<CanonicalEntity>,
    /// Squashed spelling -> entity index (first declaration wins).
    pub(crate) aliases: HashMap<String, usize>,
    /// Uppercase code -> entity index (first declaration wins).
    pub(crate) codes: HashMap<String, usize>,
    pub(crate) overrides: Vec<Override>,
    supranational: HashSet<String>,
}

impl EntityTable {
    /// The table shipped with the crate.
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        let text = fs::read_to_string(path).map_err(|source| TableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, TableError> {
        let file: TableFile = serde_json::from_str(text)?;
        Self::build(file)
    }

    fn build(file: TableFile) -> Result<Self, TableError> {
        let mut primary: HashSet<(EntityClass, String)> = HashSet::new();
        let mut aliases = HashMap::new();
        let mut codes = HashMap::new();

        for (idx, entity) in file.entities.iter().enumerate() {
            let code = entity.code.to_ascii_uppercase();
            if !primary.insert((entity.class, code.clone())) {
                return Err(TableError::DuplicateCode {
                    class: entity.class,
                    code,
                });
            }
            for spelling in entity.spellings() {
                let key = squash(spelling);
                if !key.is_empty() {
                    aliases.entry(key).or_insert(idx);
                }
            }
            for code in entity.codes() {
                codes.entry(code.trim().to_ascii_uppercase()).or_insert(idx);
            }
        }

        let mut overrides = Vec::with_capacity(file.overrides.len());
        for o in file.overrides {
            let entity = *codes
                .get(&o.code.to_ascii_uppercase())
                .ok_or_else(|| TableError::UnknownOverrideTarget {
                    pattern: o.pattern.clone(),
                    code: o.code.clone(),
                })?;
            overrides.push(Override {
                dataset: o.dataset,
                pattern: squash(&o.pattern),
                entity,
            });
        }

        let supranational = file
            .supranational
            .iter()
            .map(|c| c.trim().to_ascii_uppercase())
            .collect();

        tracing::debug!(
            version = %file.version,
            entities = file.entities.len(),
            aliases = aliases.len(),
            overrides = overrides.len(),
            "entity table loaded"
        );

        Ok(Self {
            version: file.version,
            entities: file.entities,
            aliases,
            codes,
            overrides,
            supranational,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entities(&self) -> &[CanonicalEntity] {
        &self.entities
    }

    /// Exact lookup by any known code (case-insensitive).
    pub fn by_code(&self, code: &str) -> Option<&CanonicalEntity> {
        self.codes
            .get(&code.trim().to_ascii_uppercase())
            .map(|&idx| &self.entities[idx])
    }

    /// Entities of one class, in declaration order.
    pub fn of_class(&self, class: EntityClass) -> impl Iterator<Item = &CanonicalEntity> {
        self.entities.iter().filter(move |e| e.class == class)
    }

    /// `true` for EU / euro-area aggregates.
    ///
    /// Checks the explicit allowlist first, then the class of a known entity,
    /// so an aggregate missing from `entities` is still excluded from rankings.
    pub fn is_supranational(&self, code: &str) -> bool {
        let code = code.trim().to_ascii_uppercase();
        if self.supranational.contains(&code) {
            return true;
        }
        self.codes
            .get(&code)
            .is_some_and(|&idx| self.entities[idx].class == EntityClass::Supranational)
    }
}
