use crate::model::DeleteOutcome;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// Delete each path on its own. A failure is logged and recorded, the rest of
/// the list is still processed.
pub fn remove_files<P: AsRef<Path>>(paths: &[P]) -> Vec<DeleteOutcome> {
    paths
        .iter()
        .map(|path| remove_file(path.as_ref()))
        .collect()
}

fn remove_file(path: &Path) -> DeleteOutcome {
    match fs::remove_file(path) {
        Ok(()) => {
            info!("Deleted {}", path.display());
            DeleteOutcome::Removed(path.to_path_buf())
        }
        Err(e) => {
            error!("Failed to delete {}: {}", path.display(), e);
            DeleteOutcome::Failed {
                path: PathBuf::from(path),
                reason: e.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_removes_all_files() {
        let tmp = tempdir().unwrap();
        let a = tmp.path().join("a.log");
        let b = tmp.path().join("b.log");
        fs::write(&a, "a").unwrap();
        fs::write(&b, "b").unwrap();

        let outcomes = remove_files(&[&a, &b]);

        assert!(outcomes.iter().all(DeleteOutcome::is_removed));
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[test]
    fn test_failure_does_not_stop_the_batch() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("missing.log");
        let present = tmp.path().join("present.log");
        fs::write(&present, "x").unwrap();

        let outcomes = remove_files(&[missing.clone(), present.clone()]);

        assert!(matches!(
            &outcomes[0],
            DeleteOutcome::Failed { path, .. } if *path == missing
        ));
        assert_eq!(outcomes[1], DeleteOutcome::Removed(present.clone()));
        assert!(!present.exists());
    }

    #[test]
    fn test_directory_is_not_removed() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("subdir");
        fs::create_dir_all(&dir).unwrap();

        let outcomes = remove_files(&[&dir]);

        assert!(!outcomes[0].is_removed());
        assert!(dir.exists());
    }
}
