//! On-disk layout of a store root.
//!
//! ```text
//! <root>/
//!   workflows/<workflow-id>/
//!     workflow.json
//!     requirements.md | design.md | tasks.md
//!     history/<phase-key>/<seq>-<snapshot-id>.json
//!   archive/<workflow-id>-<timestamp>/
//!   archive/.staging-<workflow-id>/
//!   archive/audit.log
//! ```

use crate::domain::WorkflowId;
use crate::phase::Phase;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub const DESCRIPTOR_FILE: &str = "workflow.json";
pub const AUDIT_LOG_FILE: &str = "audit.log";
pub const STAGING_PREFIX: &str = ".staging-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    root: PathBuf,
}

impl StorePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workflows_dir(&self) -> PathBuf {
        self.root.join("workflows")
    }

    pub fn workflow_dir(&self, id: WorkflowId) -> PathBuf {
        self.workflows_dir().join(id.to_string())
    }

    pub fn descriptor_path(&self, id: WorkflowId) -> PathBuf {
        self.workflow_dir(id).join(DESCRIPTOR_FILE)
    }

    pub fn phase_file(&self, id: WorkflowId, phase: Phase) -> PathBuf {
        self.workflow_dir(id).join(phase.file_name())
    }

    pub fn history_dir(&self, id: WorkflowId, phase: Phase) -> PathBuf {
        history_dir_in(&self.workflow_dir(id), phase)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("archive")
    }

    pub fn staging_dir(&self, id: WorkflowId) -> PathBuf {
        self.archive_dir().join(format!("{}{}", STAGING_PREFIX, id))
    }

    pub fn archived_workflow_dir(&self, id: WorkflowId, stamp: &str) -> PathBuf {
        self.archive_dir().join(format!("{}-{}", id, stamp))
    }

    pub fn audit_log_path(&self) -> PathBuf {
        self.archive_dir().join(AUDIT_LOG_FILE)
    }

    /// Creates the top-level directories if they don't exist.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [self.workflows_dir(), self.archive_dir()] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create store directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// History directory for `phase` inside any workflow directory (active or archived).
pub fn history_dir_in(workflow_dir: &Path, phase: Phase) -> PathBuf {
    workflow_dir.join("history").join(phase.key())
}

/// Writes `contents` to a sibling temp file, then renames it over `path`.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Path has no parent directory: {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Path has no file name: {}", path.display()))?;
    let temp_path = parent.join(format!(".{}.tmp", file_name));

    fs::write(&temp_path, contents)
        .with_context(|| format!("Failed to write temp file: {}", temp_path.display()))?;
    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e)
            .with_context(|| format!("Failed to rename temp file to: {}", path.display()));
    }
    Ok(())
}

/// Moves a directory tree, falling back to copy-then-delete when a plain
/// rename is impossible (for example across filesystems).
pub fn move_dir(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                from = %from.display(),
                to = %to.display(),
                error = %rename_err,
                "rename failed; copying directory instead"
            );
            if let Err(e) = copy_dir(from, to) {
                let _ = fs::remove_dir_all(to);
                return Err(e).with_context(|| {
                    format!("Failed to move {} to {}", from.display(), to.display())
                });
            }
            fs::remove_dir_all(from)
                .with_context(|| format!("Failed to remove moved directory: {}", from.display()))
        }
    }
}

fn copy_dir(from: &Path, to: &Path) -> Result<()> {
    fs::create_dir_all(to)
        .with_context(|| format!("Failed to create directory: {}", to.display()))?;
    for entry in fs::read_dir(from)
        .with_context(|| format!("Failed to read directory: {}", from.display()))?
    {
        let entry = entry?;
        let source = entry.path();
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir(&source, &target)?;
        } else {
            fs::copy(&source, &target)
                .with_context(|| format!("Failed to copy {}", source.display()))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_layout_paths() {
        let paths = StorePaths::new("/store");
        let id = WorkflowId::from_string("00000000-0000-0000-0000-000000000001").unwrap();
        assert_eq!(
            paths.phase_file(id, Phase::Implement),
            PathBuf::from("/store/workflows/00000000-0000-0000-0000-000000000001/tasks.md")
        );
        assert_eq!(
            paths.history_dir(id, Phase::Design),
            PathBuf::from("/store/workflows/00000000-0000-0000-0000-000000000001/history/design")
        );
        assert_eq!(
            paths.staging_dir(id),
            PathBuf::from("/store/archive/.staging-00000000-0000-0000-0000-000000000001")
        );
        assert_eq!(paths.audit_log_path(), PathBuf::from("/store/archive/audit.log"));
    }

    #[test]
    fn test_atomic_write_replaces_content_and_leaves_no_temp() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("design.md");
        atomic_write(&path, b"one").unwrap();
        atomic_write(&path, b"two").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[test]
    fn test_move_dir_relocates_tree() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("a");
        fs::create_dir_all(from.join("nested")).unwrap();
        fs::write(from.join("nested/file.txt"), "x").unwrap();
        let to = dir.path().join("b");
        move_dir(&from, &to).unwrap();
        assert!(!from.exists());
        assert_eq!(fs::read_to_string(to.join("nested/file.txt")).unwrap(), "x");
    }

    #[test]
    fn test_copy_dir_copies_recursively() {
        let dir = tempdir().unwrap();
        let from = dir.path().join("src");
        fs::create_dir_all(from.join("h/specify")).unwrap();
        fs::write(from.join("h/specify/1.json"), "{}").unwrap();
        let to = dir.path().join("dst");
        copy_dir(&from, &to).unwrap();
        assert!(to.join("h/specify/1.json").exists());
        assert!(from.exists());
    }
}
