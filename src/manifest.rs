// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Release manifests as immutable, shareable collections of Kubernetes objects.
//!
//! A [`Manifest`] is parsed once at startup and shared by every reconcile pass.
//! It is never mutated in place: [`Manifest::filter`], [`Manifest::append`] and
//! [`Manifest::transform`] all return a new manifest, and `transform` works on
//! deep copies of the objects so concurrent passes never observe each other's
//! changes.
//!
//! # Example
//!
//! ```rust
//! use pac_operator::manifest::{by_kind, by_name, Manifest, Predicate};
//!
//! let manifest = Manifest::from_yaml_str(r#"
//! apiVersion: v1
//! kind: Namespace
//! metadata:
//!   name: pipelines-as-code
//! ---
//! apiVersion: v1
//! kind: ConfigMap
//! metadata:
//!   name: pipelines-as-code
//! "#).unwrap();
//!
//! let config_maps = manifest.filter(&Predicate::all([by_kind("ConfigMap"), by_name("pipelines-as-code")]));
//! assert_eq!(config_maps.len(), 1);
//! assert_eq!(manifest.filter(&by_kind("Namespace").not()).len(), 1);
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use kube::api::DynamicObject;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_yaml::Deserializer;

use crate::errors::{ManifestError, TransformError};

/// A mutation applied to a single object of a manifest.
pub type Transformer = Arc<dyn Fn(&mut DynamicObject) -> Result<(), TransformError> + Send + Sync>;

/// A composable test over a single object.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&DynamicObject) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&DynamicObject) -> bool + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn matches(&self, obj: &DynamicObject) -> bool {
        (self.0)(obj)
    }

    /// Matches objects every predicate matches.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let predicates: Vec<Predicate> = predicates.into_iter().collect();
        Self::new(move |obj| predicates.iter().all(|p| p.matches(obj)))
    }

    /// Matches objects at least one predicate matches.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        let predicates: Vec<Predicate> = predicates.into_iter().collect();
        Self::new(move |obj| predicates.iter().any(|p| p.matches(obj)))
    }

    /// Matches objects this predicate does not match.
    #[must_use]
    pub fn not(self) -> Self {
        Self::new(move |obj| !self.matches(obj))
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate")
    }
}

/// Matches objects of the given kind.
pub fn by_kind(kind: &str) -> Predicate {
    let kind = kind.to_string();
    Predicate::new(move |obj| kind_of(obj) == kind)
}

/// Matches objects with the given name.
pub fn by_name(name: &str) -> Predicate {
    let name = name.to_string();
    Predicate::new(move |obj| name_of(obj) == name)
}

/// Kind of a generic object, empty when the object carries no type information.
#[must_use]
pub fn kind_of(obj: &DynamicObject) -> &str {
    obj.types.as_ref().map_or("", |t| t.kind.as_str())
}

/// Name of a generic object, empty when unset.
#[must_use]
pub fn name_of(obj: &DynamicObject) -> &str {
    obj.metadata.name.as_deref().unwrap_or("")
}

/// Decode a generic object into a typed view such as `Deployment`.
///
/// # Errors
///
/// Returns [`TransformError::Decode`] when the object does not fit the type.
pub fn to_typed<K: DeserializeOwned>(obj: &DynamicObject) -> Result<K, TransformError> {
    let decode = |source| TransformError::Decode {
        kind: kind_of(obj).to_string(),
        name: name_of(obj).to_string(),
        source,
    };
    let value = serde_json::to_value(obj).map_err(decode)?;
    serde_json::from_value(value).map_err(decode)
}

/// Replace the contents of a generic object with an encoded typed view.
///
/// # Errors
///
/// Returns [`TransformError::Encode`] when the typed value cannot be represented.
pub fn from_typed<K: Serialize>(typed: &K, obj: &mut DynamicObject) -> Result<(), TransformError> {
    let encode = |source| TransformError::Encode {
        kind: kind_of(obj).to_string(),
        name: name_of(obj).to_string(),
        source,
    };
    let value = serde_json::to_value(typed).map_err(encode)?;
    let encoded: DynamicObject = serde_json::from_value(value).map_err(encode)?;
    *obj = encoded;
    Ok(())
}

/// An immutable, cheaply clonable list of Kubernetes objects.
#[derive(Clone, Default)]
pub struct Manifest {
    resources: Arc<[DynamicObject]>,
}

impl Manifest {
    #[must_use]
    pub fn new(resources: Vec<DynamicObject>) -> Self {
        Self {
            resources: resources.into(),
        }
    }

    /// Parse a multi-document YAML string. Empty documents are skipped.
    ///
    /// # Errors
    ///
    /// Returns the YAML error of the first document that is not a Kubernetes object.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let objects: Vec<Option<DynamicObject>> = Deserializer::from_str(yaml)
            .map(Option::<DynamicObject>::deserialize)
            .collect::<Result<_, serde_yaml::Error>>()?;

        Ok(Self::new(objects.into_iter().flatten().collect()))
    }

    /// Load a manifest from a YAML file, or from every `.yaml`/`.yml` file
    /// below a directory in lexical path order.
    ///
    /// # Errors
    ///
    /// Returns [`ManifestError`] if a file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, ManifestError> {
        let mut files = Vec::new();
        collect_yaml_files(path, &mut files)?;
        files.sort();

        let mut resources = Vec::new();
        for file in files {
            let content = fs::read_to_string(&file).map_err(|source| ManifestError::Io {
                path: file.clone(),
                source,
            })?;
            let parsed = Self::from_yaml_str(&content)
                .map_err(|source| ManifestError::Parse { path: file, source })?;
            resources.extend(parsed.resources.iter().cloned());
        }

        Ok(Self::new(resources))
    }

    #[must_use]
    pub fn resources(&self) -> &[DynamicObject] {
        &self.resources
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Keep only the objects matching `predicate`.
    #[must_use]
    pub fn filter(&self, predicate: &Predicate) -> Self {
        Self::new(
            self.resources
                .iter()
                .filter(|obj| predicate.matches(obj))
                .cloned()
                .collect(),
        )
    }

    /// Concatenate `others` after this manifest.
    #[must_use]
    pub fn append(&self, others: &[&Manifest]) -> Self {
        let mut resources = self.resources.to_vec();
        for other in others {
            resources.extend(other.resources.iter().cloned());
        }
        Self::new(resources)
    }

    /// Apply every transformer, in order, to a copy of every object.
    ///
    /// # Errors
    ///
    /// Returns the first transformer error; the partially transformed copy is discarded.
    pub fn transform(&self, transformers: &[Transformer]) -> Result<Self, TransformError> {
        let mut resources = self.resources.to_vec();
        for obj in &mut resources {
            for transformer in transformers {
                transformer(obj)?;
            }
        }
        Ok(Self::new(resources))
    }
}

impl fmt::Debug for Manifest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(
                self.resources
                    .iter()
                    .map(|obj| format!("{}/{}", kind_of(obj), name_of(obj))),
            )
            .finish()
    }
}

fn collect_yaml_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<(), ManifestError> {
    let io_err = |source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.is_dir() {
        // Existence is checked by the read in from_path
        files.push(path.to_path_buf());
        return Ok(());
    }

    for entry in fs::read_dir(path).map_err(io_err)? {
        let entry_path = entry.map_err(io_err)?.path();
        if entry_path.is_dir() {
            collect_yaml_files(&entry_path, files)?;
        } else if matches!(
            entry_path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml")
        ) {
            files.push(entry_path);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod manifest_tests;
