use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Publishes matches as symlinks inside a `completed` area.
pub struct Publisher {
    completed_directory: PathBuf,
}

impl Publisher {
    pub fn new<P: AsRef<Path>>(completed_directory: P) -> Self {
        Self {
            completed_directory: completed_directory.as_ref().to_path_buf(),
        }
    }

    /// Creates or replaces `completed/<name>` pointing at `target`.
    ///
    /// The link is built under a fixed-length temporary name and renamed into
    /// place, so an existing reference is swapped without a window where it is
    /// missing. Any name the filesystem accepts can be published.
    pub fn publish(&self, name: &str, target: &Path) -> Result<PathBuf, StorageError> {
        validate_name(name)?;

        if !self.completed_directory.exists() {
            std::fs::create_dir_all(&self.completed_directory).map_err(|e| {
                StorageError::CreateDirectory {
                    path: self.completed_directory.clone(),
                    source: e,
                }
            })?;
        }

        let link_path = self.completed_directory.join(name);
        let staging_path = self
            .completed_directory
            .join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        #[cfg(unix)]
        std::os::unix::fs::symlink(target, &staging_path).map_err(|e| {
            StorageError::CreateSymlink {
                link: link_path.clone(),
                target: target.to_path_buf(),
                source: e,
            }
        })?;

        #[cfg(windows)]
        std::os::windows::fs::symlink_file(target, &staging_path).map_err(|e| {
            StorageError::CreateSymlink {
                link: link_path.clone(),
                target: target.to_path_buf(),
                source: e,
            }
        })?;

        if let Err(e) = std::fs::rename(&staging_path, &link_path) {
            if let Err(cleanup) = std::fs::remove_file(&staging_path) {
                log::debug!(
                    "Could not remove staging link {:?}: {}",
                    staging_path,
                    cleanup
                );
            }
            return Err(StorageError::CreateSymlink {
                link: link_path,
                target: target.to_path_buf(),
                source: e,
            });
        }

        Ok(link_path)
    }
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}
