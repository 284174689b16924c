/// Run-scoped workspace for one sandboxed execution
///
/// Each execution gets a fresh directory that no other run can share. It is
/// created exclusively, readable only by the owner, and removed on every exit path.
use crate::config::types::{Result, VerifyError};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Prefix for workspace directory names
pub const WORKSPACE_PREFIX: &str = "verifybox-";

/// Owner-only permissions for the workspace directory
const WORKSPACE_DIR_MODE: u32 = 0o700;

/// Workspace for one record's execution artifacts
#[derive(Debug)]
pub struct Workspace {
    run_id: String,
    run_dir: PathBuf,
    files: Vec<PathBuf>,
    removed: bool,
}

impl Workspace {
    /// Create a new, uniquely named workspace under `base_dir`.
    /// Fails if the directory already exists.
    pub fn create(base_dir: &Path) -> Result<Self> {
        let run_id = Uuid::new_v4().to_string();
        let run_dir = base_dir.join(format!("{}{}", WORKSPACE_PREFIX, run_id));

        fs::create_dir(&run_dir).map_err(|e| {
            VerifyError::Filesystem(format!(
                "Failed to create workspace directory {}: {}",
                run_dir.display(),
                e
            ))
        })?;

        let workspace = Self {
            run_id,
            run_dir,
            files: Vec::new(),
            removed: false,
        };

        // From here on Drop owns the directory, so a permission failure still cleans up.
        fs::set_permissions(&workspace.run_dir, fs::Permissions::from_mode(WORKSPACE_DIR_MODE))
            .map_err(|e| {
                VerifyError::Filesystem(format!(
                    "Failed to set permissions on {}: {}",
                    workspace.run_dir.display(),
                    e
                ))
            })?;

        Ok(workspace)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Write a file directly inside the workspace. Names with path separators are refused.
    pub fn write_file(&mut self, name: &str, content: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(VerifyError::Filesystem(format!(
                "Refusing workspace file name: {:?}",
                name
            )));
        }

        let path = self.run_dir.join(name);
        fs::write(&path, content).map_err(|e| {
            VerifyError::Filesystem(format!("Failed to write {}: {}", path.display(), e))
        })?;

        self.files.push(path.clone());
        Ok(path)
    }

    /// Files written so far, in write order
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Remove the workspace and everything the child left in it (idempotent)
    pub fn cleanup(&mut self) -> Result<()> {
        if self.removed {
            return Ok(());
        }

        match fs::remove_dir_all(&self.run_dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(VerifyError::Filesystem(format!(
                    "Failed to remove workspace {}: {}",
                    self.run_dir.display(),
                    e
                )))
            }
        }

        self.removed = true;
        Ok(())
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            log::warn!("{}", e);
        }
    }
}
