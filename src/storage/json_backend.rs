use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::OwnerId;
use crate::errors::Result;
use crate::utils::store_dir;

use super::{Collection, Document, DocumentStore, Listener, MemoryStore, Subscription};

const FILE_EXTENSION: &str = "json";
const META_FILE: &str = "meta.json";
const TMP_SUFFIX: &str = "tmp";

/// On-disk layout: `<root>/<owner>/<collection>.json` plus `<root>/meta.json`
/// carrying the sequence counter. Every mutation rewrites the touched
/// collection file atomically (tmp file + rename).
pub struct JsonStore {
    root: PathBuf,
    memory: MemoryStore,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionFile {
    owner: OwnerId,
    version: u64,
    documents: Vec<Document>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreMeta {
    next_sequence: u64,
}

impl JsonStore {
    /// Opens (and loads) the store rooted at `root`, defaulting to the
    /// application data directory.
    pub fn open(root: Option<PathBuf>) -> Result<Self> {
        let root = root.unwrap_or_else(store_dir);
        ensure_dir(&root)?;
        let store = Self {
            root,
            memory: MemoryStore::new(),
        };
        store.load()?;
        Ok(store)
    }

    pub fn open_default() -> Result<Self> {
        Self::open(None)
    }

    pub fn base_dir(&self) -> &Path {
        &self.root
    }

    fn load(&self) -> Result<()> {
        let meta = self.read_meta()?;
        self.memory.set_sequence_floor(meta.next_sequence);
        for owner_dir in read_dir_if_exists(&self.root)? {
            let path = owner_dir.path();
            if !path.is_dir() {
                continue;
            }
            for collection in Collection::ALL {
                let file = path.join(format!("{}.{}", collection.name(), FILE_EXTENSION));
                if !file.exists() {
                    continue;
                }
                let data = fs::read_to_string(&file)?;
                let parsed: CollectionFile = serde_json::from_str(&data)?;
                self.memory
                    .seed(collection, parsed.owner, parsed.version, parsed.documents);
            }
        }
        Ok(())
    }

    fn read_meta(&self) -> Result<StoreMeta> {
        let path = self.root.join(META_FILE);
        if path.exists() {
            let data = fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&data)?)
        } else {
            Ok(StoreMeta::default())
        }
    }

    fn owner_dir(&self, owner: &OwnerId) -> PathBuf {
        self.root.join(canonical_owner(owner.as_str()))
    }

    fn collection_path(&self, collection: Collection, owner: &OwnerId) -> PathBuf {
        self.owner_dir(owner)
            .join(format!("{}.{}", collection.name(), FILE_EXTENSION))
    }

    fn persist(&self, collection: Collection, owner: &OwnerId) -> Result<()> {
        let documents = self.memory.list(collection, owner)?;
        let version = self.memory.collection_version(collection, owner)?;
        let file = CollectionFile {
            owner: owner.clone(),
            version,
            documents,
        };
        let json = serde_json::to_string_pretty(&file)?;
        write_atomic(&self.collection_path(collection, owner), &json)?;
        let meta = StoreMeta {
            next_sequence: self.memory.sequence_floor(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)?;
        write_atomic(&self.root.join(META_FILE), &meta_json)?;
        Ok(())
    }
}

impl DocumentStore for JsonStore {
    fn list(&self, collection: Collection, owner: &OwnerId) -> Result<Vec<Document>> {
        self.memory.list(collection, owner)
    }

    fn get(&self, collection: Collection, owner: &OwnerId, key: &str) -> Result<Option<Document>> {
        self.memory.get(collection, owner, key)
    }

    fn insert(
        &self,
        collection: Collection,
        owner: &OwnerId,
        key: &str,
        body: serde_json::Value,
    ) -> Result<Document> {
        let document = self.memory.insert(collection, owner, key, body)?;
        self.persist(collection, owner)?;
        Ok(document)
    }

    fn insert_cas(
        &self,
        collection: Collection,
        owner: &OwnerId,
        expected_version: u64,
        key: &str,
        body: serde_json::Value,
    ) -> Result<Document> {
        let document = self
            .memory
            .insert_cas(collection, owner, expected_version, key, body)?;
        self.persist(collection, owner)?;
        Ok(document)
    }

    fn update(
        &self,
        collection: Collection,
        owner: &OwnerId,
        key: &str,
        expected_version: u64,
        body: serde_json::Value,
    ) -> Result<Document> {
        let document = self
            .memory
            .update(collection, owner, key, expected_version, body)?;
        self.persist(collection, owner)?;
        Ok(document)
    }

    fn delete(&self, collection: Collection, owner: &OwnerId, key: &str) -> Result<()> {
        self.memory.delete(collection, owner, key)?;
        self.persist(collection, owner)
    }

    fn collection_version(&self, collection: Collection, owner: &OwnerId) -> Result<u64> {
        self.memory.collection_version(collection, owner)
    }

    fn subscribe(
        &self,
        collection: Collection,
        owner: &OwnerId,
        listener: Listener,
    ) -> Subscription {
        self.memory.subscribe(collection, owner, listener)
    }
}

fn canonical_owner(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_') {
            out.push(ch);
        } else {
            out.push('-');
        }
    }
    out
}

fn read_dir_if_exists(path: &Path) -> Result<Vec<fs::DirEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(path)? {
        entries.push(entry?);
    }
    Ok(entries)
}

fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    fs::rename(&tmp, path)?;
    Ok(())
}
