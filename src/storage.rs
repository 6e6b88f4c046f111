// Bubble folder store - maps a bubble id to a directory under the temp root
// The file system is the source of truth; nothing here is cached.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Identifier of a live bubble. The primary bubble lives directly in the root folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BubbleId(pub u32);

impl BubbleId {
    pub const PRIMARY: BubbleId = BubbleId(1);

    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }
}

impl fmt::Display for BubbleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to create folder {}: {source}", path.display())]
    CreateFolder {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("refusing to delete the primary bubble folder {}", .0.display())]
    PrimaryFolder(PathBuf),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ItemStatus {
    Done,
    Failed(String),
}

/// Result of one file in a copy or delete batch.
#[derive(Clone, Debug)]
pub struct ItemOutcome {
    pub path: PathBuf,
    pub status: ItemStatus,
}

/// Per-item results of a batch. A failed item never stops the rest of the batch.
#[derive(Clone, Debug, Default)]
pub struct BatchOutcome {
    pub items: Vec<ItemOutcome>,
}

impl BatchOutcome {
    fn push(&mut self, path: PathBuf, result: Result<(), String>) {
        let status = match result {
            Ok(()) => ItemStatus::Done,
            Err(reason) => ItemStatus::Failed(reason),
        };
        self.items.push(ItemOutcome { path, status });
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &Path> {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Done)
            .map(|i| i.path.as_path())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.items.iter().filter_map(|i| match &i.status {
            ItemStatus::Failed(reason) => Some((i.path.as_path(), reason.as_str())),
            ItemStatus::Done => None,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.failed().next().is_none()
    }
}

pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Store rooted at `<os temp>/<folder_name>`.
    pub fn in_temp_dir(folder_name: &str) -> Self {
        Self::new(std::env::temp_dir().join(folder_name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folder_path(&self, id: BubbleId) -> PathBuf {
        if id.is_primary() {
            self.root.clone()
        } else {
            self.root.join(format!("Bubble_{}", id.0))
        }
    }

    /// Creates the root and the bubble folder if absent. Safe to call repeatedly.
    pub fn ensure_folder(&self, id: BubbleId) -> Result<PathBuf, StorageError> {
        let path = self.folder_path(id);
        fs::create_dir_all(&path).map_err(|source| StorageError::CreateFolder {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Regular files currently in the bubble folder, in enumeration order.
    pub fn list_files(&self, id: BubbleId) -> Vec<PathBuf> {
        let path = self.folder_path(id);
        let entries = match fs::read_dir(&path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("cannot list bubble {} at {}: {}", id, path.display(), e);
                return Vec::new();
            }
        };

        // Entries removed by someone else between read_dir and here are skipped
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .collect()
    }

    /// Copies each source into the bubble folder under its base name, overwriting.
    pub fn save_files<P: AsRef<Path>>(
        &self,
        id: BubbleId,
        sources: &[P],
    ) -> Result<BatchOutcome, StorageError> {
        let folder = self.ensure_folder(id)?;
        let mut outcome = BatchOutcome::default();

        for source in sources {
            let source = source.as_ref();
            let result = copy_into(source, &folder);
            if let Err(reason) = &result {
                tracing::warn!("skipping {} for bubble {}: {}", source.display(), id, reason);
            }
            outcome.push(source.to_path_buf(), result);
        }

        Ok(outcome)
    }

    /// Deletes the files (not sub-folders) of a bubble.
    pub fn clear(&self, id: BubbleId) -> Result<BatchOutcome, StorageError> {
        self.ensure_folder(id)?;
        let mut outcome = BatchOutcome::default();

        for file in self.list_files(id) {
            let result = fs::remove_file(&file).map_err(|e| e.to_string());
            if let Err(reason) = &result {
                tracing::warn!("could not delete {}: {}", file.display(), reason);
            }
            outcome.push(file, result);
        }

        Ok(outcome)
    }

    /// Removes a non-primary bubble folder and everything in it.
    /// Returns whether a folder was actually removed.
    pub fn delete_bubble_folder(&self, id: BubbleId) -> Result<bool, StorageError> {
        let path = self.folder_path(id);
        if id.is_primary() {
            return Err(StorageError::PrimaryFolder(path));
        }

        match fs::remove_dir_all(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => {
                tracing::warn!("could not delete folder {}: {}", path.display(), e);
                Ok(false)
            }
        }
    }
}

fn copy_into(source: &Path, folder: &Path) -> Result<(), String> {
    let name = source
        .file_name()
        .ok_or_else(|| "source path has no file name".to_string())?;
    let dest = folder.join(name);

    // Copying a file onto itself would truncate it on some platforms
    if let (Ok(a), Ok(b)) = (fs::canonicalize(source), fs::canonicalize(&dest)) {
        if a == b {
            return Ok(());
        }
    }

    fs::copy(source, &dest).map(|_| ()).map_err(|e| e.to_string())
}
