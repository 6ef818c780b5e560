//! Interaction templates and the infrastructure to look them up
//!
//! A template is an immutable signed description of a script or
//! transaction, identified by a stable id and by the digests of its
//! canonicalized Cadence (one per [`HashFlavor`]). This module provides:
//!
//! - [`TemplateStore`], the read-only lookup seam, with an in-memory
//!   implementation loaded from FLIX JSON files
//! - [`AliasTable`], which maps human names to template ids

mod alias;
mod ingest;
mod store;

pub use alias::{AliasError, AliasResolution, AliasTable, MAX_ALIAS_CHAIN};
pub use ingest::{address_books_from_flix, template_from_flix, IngestError};
pub use store::{InMemoryTemplateStore, Manifest, StoreError, TemplateStore};

use serde::{Deserialize, Serialize};

use crate::canonical::{Digest, HashFlavor, TemplateHashes};

/// A stored interaction template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    /// The template document as published
    pub body: serde_json::Value,
    pub hashes: TemplateHashes,
}

impl Template {
    pub fn hash(&self, flavor: HashFlavor) -> Option<&Digest> {
        self.hashes.get(flavor)
    }
}
