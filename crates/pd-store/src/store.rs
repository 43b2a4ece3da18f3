//! Filesystem upload store.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use pd_core::{extension_of, stem_of, Error, ImageId, Result};

/// Name prefix of in-flight upload files. Entries starting with `.` are
/// never resolved by lookups.
pub const TEMP_PREFIX: &str = ".upload-";

/// Tunables for [`UploadStore`].
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
    /// Identifier draws per upload before failing with
    /// [`Error::StorageExhausted`].
    pub max_id_attempts: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self { max_id_attempts: 8 }
    }
}

/// A resolved image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Identifier portion of the file name.
    pub id: String,
    /// Full file name (`id` + extension).
    pub storage_key: String,
    /// Absolute or store-relative path to the file.
    pub path: PathBuf,
}

impl StoredImage {
    /// Extension of the stored file, dot included; empty if none.
    pub fn extension(&self) -> &str {
        &self.storage_key[self.id.len()..]
    }
}

#[derive(Debug, Default)]
struct Index {
    /// Identifier to storage key.
    entries: HashMap<String, String>,
    /// Identifiers claimed by uploads that have not been committed yet.
    reserved: HashSet<String>,
}

type IdGenerator = Box<dyn Fn() -> ImageId + Send + Sync>;

/// Directory-backed image store.
///
/// Writes go to a hidden temporary file that is then moved into place
/// without clobbering, so readers never observe partial content and two
/// uploads never share a storage key.
pub struct UploadStore {
    dir: PathBuf,
    options: StoreOptions,
    index: RwLock<Index>,
    generate: IdGenerator,
}

impl fmt::Debug for UploadStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStore")
            .field("dir", &self.dir)
            .field("options", &self.options)
            .field("images", &self.len())
            .finish_non_exhaustive()
    }
}

impl UploadStore {
    /// Open (creating if needed) the store rooted at `dir` and index the
    /// files already present.
    pub fn open(dir: impl Into<PathBuf>, options: StoreOptions) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;

        let store = Self {
            dir,
            options,
            index: RwLock::new(Index::default()),
            generate: Box::new(ImageId::random),
        };
        store.rebuild_index()?;
        Ok(store)
    }

    /// Replace the identifier source.
    #[cfg(test)]
    fn with_id_generator(mut self, generate: impl Fn() -> ImageId + Send + Sync + 'static) -> Self {
        self.generate = Box::new(generate);
        self
    }

    /// Directory the store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of indexed images.
    pub fn len(&self) -> usize {
        self.index.read().entries.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist `content` and return the identifier it was stored under.
    ///
    /// `declared_mime_type` must start with `image/`; otherwise nothing is
    /// written and [`Error::InvalidContentType`] is returned. The extension of
    /// `original_filename` is kept verbatim in the storage key.
    pub fn put(
        &self,
        content: &[u8],
        original_filename: &str,
        declared_mime_type: &str,
    ) -> Result<ImageId> {
        if !declared_mime_type.starts_with("image/") {
            tracing::debug!(
                mime = declared_mime_type,
                filename = original_filename,
                "Rejected upload with non-image content type"
            );
            return Err(Error::invalid_content_type(declared_mime_type));
        }

        let extension = extension_of(original_filename);

        // The directory may have been removed underneath us.
        std::fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)?;
        tmp.write_all(content)?;
        tmp.flush()?;

        for attempt in 1..=self.options.max_id_attempts {
            let id = (self.generate)();
            let id_str = id.to_string();

            if !self.reserve(&id_str) {
                tracing::debug!(id = %id_str, attempt, "Identifier already in use; drawing again");
                continue;
            }

            // Files dropped in after open are unknown to the index.
            match self.scan_for(&id_str) {
                Ok(None) => {}
                Ok(Some(existing)) => {
                    self.release(&id_str);
                    tracing::debug!(
                        id = %id_str,
                        existing = %existing,
                        attempt,
                        "Identifier names an unindexed file; drawing again"
                    );
                    self.index.write().entries.entry(id_str).or_insert(existing);
                    continue;
                }
                Err(e) => {
                    self.release(&id_str);
                    return Err(e);
                }
            }

            let storage_key = id.storage_key(extension);
            let path = self.dir.join(&storage_key);

            match tmp.persist_noclobber(&path) {
                Ok(_) => {
                    self.commit(id_str, storage_key.clone());
                    tracing::info!(
                        id = %id,
                        storage_key = %storage_key,
                        bytes = content.len(),
                        "Stored upload"
                    );
                    return Ok(id);
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                    self.release(&id_str);
                    tracing::debug!(
                        storage_key = %storage_key,
                        attempt,
                        "Storage key already on disk; drawing again"
                    );
                    tmp = e.file;
                }
                Err(e) => {
                    self.release(&id_str);
                    return Err(e.error.into());
                }
            }
        }

        tracing::warn!(
            attempts = self.options.max_id_attempts,
            "Could not find a free identifier for upload"
        );
        Err(Error::StorageExhausted {
            attempts: self.options.max_id_attempts,
        })
    }

    /// Read the bytes of the image whose identifier is `id`.
    pub fn get(&self, id: &str) -> Result<Vec<u8>> {
        let image = self.locate(id)?;
        std::fs::read(&image.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::not_found("image", id),
            _ => Error::from(e),
        })
    }

    /// Resolve `id` to the file holding it.
    ///
    /// `id` is not validated. The index is consulted first; on a miss the
    /// directory is scanned and the first entry (in listing order) whose
    /// name without extension equals `id` wins.
    pub fn locate(&self, id: &str) -> Result<StoredImage> {
        let cached = self.index.read().entries.get(id).cloned();

        if let Some(storage_key) = cached {
            let path = self.dir.join(&storage_key);
            if path.is_file() {
                return Ok(self.stored(id, storage_key));
            }

            tracing::debug!(id, storage_key = %storage_key, "Indexed image vanished from disk");
            let mut index = self.index.write();
            if index.entries.get(id) == Some(&storage_key) {
                index.entries.remove(id);
            }
        }

        match self.scan_for(id)? {
            Some(storage_key) => {
                tracing::debug!(id, storage_key = %storage_key, "Resolved image by directory scan");
                self.index
                    .write()
                    .entries
                    .entry(id.to_string())
                    .or_insert_with(|| storage_key.clone());
                Ok(self.stored(id, storage_key))
            }
            None => Err(Error::not_found("image", id)),
        }
    }

    fn stored(&self, id: &str, storage_key: String) -> StoredImage {
        StoredImage {
            id: id.to_string(),
            path: self.dir.join(&storage_key),
            storage_key,
        }
    }

    /// Claim `id` for an in-flight upload. Returns `false` if it is taken.
    fn reserve(&self, id: &str) -> bool {
        let mut index = self.index.write();
        if index.entries.contains_key(id) || index.reserved.contains(id) {
            return false;
        }
        index.reserved.insert(id.to_string())
    }

    fn release(&self, id: &str) {
        self.index.write().reserved.remove(id);
    }

    fn commit(&self, id: String, storage_key: String) {
        let mut index = self.index.write();
        index.reserved.remove(&id);
        index.entries.insert(id, storage_key);
    }

    /// Index every stored file and clear temp files left by interrupted
    /// uploads of a previous run.
    fn rebuild_index(&self) -> Result<()> {
        let mut entries = HashMap::new();
        let mut stale = 0usize;

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };

            if name.starts_with(TEMP_PREFIX) {
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => stale += 1,
                    Err(e) => tracing::warn!("Failed to remove stale upload {name}: {e}"),
                }
                continue;
            }

            if name.starts_with('.') || !entry.path().is_file() {
                continue;
            }

            entries
                .entry(stem_of(&name).to_string())
                .or_insert(name);
        }

        if stale > 0 {
            tracing::info!("Removed {stale} interrupted upload(s) from {}", self.dir.display());
        }
        tracing::info!(
            "Indexed {} stored image(s) in {}",
            entries.len(),
            self.dir.display()
        );

        self.index.write().entries = entries;
        Ok(())
    }

    /// Linear scan of the directory for an entry whose stem is `id`.
    fn scan_for(&self, id: &str) -> Result<Option<String>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if name.starts_with('.') {
                continue;
            }
            if stem_of(&name) == id && entry.path().is_file() {
                return Ok(Some(name));
            }
        }

        Ok(None)
    }
}
