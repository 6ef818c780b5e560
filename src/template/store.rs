//! Template storage seam and the in-memory implementation

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use super::ingest::{template_from_flix, IngestError};
use super::Template;
use crate::canonical::{AddressBook, Digest, HashFlavor};
use crate::network::Network;

/// Errors that can occur during template store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Duplicate template id
    #[error("duplicate template id: {id}")]
    Duplicate { id: String },

    /// Error reading a template file or directory
    #[error("error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Template file is not JSON
    #[error("invalid template JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Template file is JSON but not a usable template
    #[error("cannot ingest {path}: {source}")]
    Ingest {
        path: PathBuf,
        #[source]
        source: IngestError,
    },

    /// Failure in an external storage backend
    #[error("template backend error: {0}")]
    Backend(String),
}

/// Every template body keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Manifest(pub BTreeMap<String, serde_json::Value>);

/// Read-only template lookup
#[async_trait]
pub trait TemplateStore: Send + Sync {
    async fn get_by_id(&self, id: &str) -> Result<Option<Template>, StoreError>;

    async fn get_by_hash(
        &self,
        digest: &Digest,
        flavor: HashFlavor,
    ) -> Result<Option<Template>, StoreError>;

    async fn list_all(&self) -> Result<Vec<Template>, StoreError>;

    async fn get_manifest(&self) -> Result<Option<Manifest>, StoreError>;
}

/// Templates held in memory, indexed by id and by every stored digest
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: BTreeMap<String, Template>,
    by_hash: HashMap<(HashFlavor, Digest), String>,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_templates(
        templates: impl IntoIterator<Item = Template>,
    ) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for template in templates {
            store.insert(template)?;
        }
        Ok(store)
    }

    /// Load every `*.json` FLIX document in a directory
    pub fn load_dir(
        dir: &Path,
        defaults: &HashMap<Network, AddressBook>,
    ) -> Result<Self, StoreError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| StoreError::Io { path, source }
        };

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .map_err(io_err(dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut store = Self::new();
        for path in paths {
            let content = std::fs::read_to_string(&path).map_err(io_err(&path))?;
            let body: serde_json::Value =
                serde_json::from_str(&content).map_err(|source| StoreError::Json {
                    path: path.clone(),
                    source,
                })?;
            let template = template_from_flix(body, defaults)
                .map_err(|source| StoreError::Ingest { path, source })?;
            store.insert(template)?;
        }

        info!(dir = %dir.display(), templates = store.len(), "loaded templates");
        Ok(store)
    }

    pub fn insert(&mut self, template: Template) -> Result<(), StoreError> {
        if self.templates.contains_key(&template.id) {
            return Err(StoreError::Duplicate { id: template.id });
        }

        for flavor in [
            HashFlavor::Testnet,
            HashFlavor::Mainnet,
            HashFlavor::AddressAgnostic,
        ] {
            let Some(digest) = template.hash(flavor) else {
                continue;
            };
            let key = (flavor, digest.clone());
            match self.by_hash.get(&key) {
                Some(existing) => warn!(
                    template_id = %template.id,
                    existing = %existing,
                    ?flavor,
                    "digest already indexed, keeping first template"
                ),
                None => {
                    self.by_hash.insert(key, template.id.clone());
                }
            }
        }

        self.templates.insert(template.id.clone(), template);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn get_by_id(&self, id: &str) -> Result<Option<Template>, StoreError> {
        Ok(self.templates.get(id).cloned())
    }

    async fn get_by_hash(
        &self,
        digest: &Digest,
        flavor: HashFlavor,
    ) -> Result<Option<Template>, StoreError> {
        Ok(self
            .by_hash
            .get(&(flavor, digest.clone()))
            .and_then(|id| self.templates.get(id))
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Template>, StoreError> {
        Ok(self.templates.values().cloned().collect())
    }

    async fn get_manifest(&self) -> Result<Option<Manifest>, StoreError> {
        if self.templates.is_empty() {
            return Ok(None);
        }
        Ok(Some(Manifest(
            self.templates
                .iter()
                .map(|(id, t)| (id.clone(), t.body.clone()))
                .collect(),
        )))
    }
}
