use crate::model::VolumeStatus;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use sysinfo::Disks;
use tracing::{debug, info, warn};

/// A mounted volume as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountedVolume {
    pub mount_point: PathBuf,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

/// Source of the host's mounted volumes.
pub trait VolumeSource {
    fn volumes(&self) -> Vec<MountedVolume>;
}

/// Volumes read from the operating system through sysinfo.
pub struct SystemVolumes;

impl VolumeSource for SystemVolumes {
    fn volumes(&self) -> Vec<MountedVolume> {
        let disks = Disks::new_with_refreshed_list();
        disks
            .iter()
            .map(|disk| MountedVolume {
                mount_point: disk.mount_point().to_path_buf(),
                total_bytes: disk.total_space(),
                available_bytes: disk.available_space(),
            })
            .collect()
    }
}

#[cfg(target_os = "windows")]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    let text = path.to_string_lossy();
    match text.strip_prefix(r"\\?\") {
        Some(rest) if !rest.starts_with("UNC") => PathBuf::from(rest),
        _ => path,
    }
}

#[cfg(not(target_os = "windows"))]
fn strip_verbatim(path: PathBuf) -> PathBuf {
    path
}

fn absolute_path(dir: &Path) -> PathBuf {
    match fs::canonicalize(dir) {
        Ok(path) => strip_verbatim(path),
        Err(_) if dir.is_absolute() => dir.to_path_buf(),
        Err(_) => env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf()),
    }
}

/// The volume holding `dir`: the mounted volume with the longest mount point that
/// is a prefix of the directory's absolute path.
pub fn volume_root<'a>(dir: &Path, volumes: &'a [MountedVolume]) -> Option<&'a MountedVolume> {
    let absolute = absolute_path(dir);
    volumes
        .iter()
        .filter(|volume| absolute.starts_with(&volume.mount_point))
        .max_by_key(|volume| volume.mount_point.components().count())
}

/// Compute one `VolumeStatus` per distinct volume holding any of `dirs`, in the
/// order the volumes are first referenced. Directories that resolve to no
/// mounted volume are skipped with a warning.
pub fn check_volumes(dirs: &[PathBuf], source: &dyn VolumeSource) -> Vec<VolumeStatus> {
    let volumes = source.volumes();
    let mut statuses: Vec<VolumeStatus> = Vec::new();

    for dir in dirs {
        let volume = match volume_root(dir, &volumes) {
            Some(volume) => volume,
            None => {
                warn!("No mounted volume found for {}, skipping", dir.display());
                continue;
            }
        };

        if statuses.iter().any(|s| s.root == volume.mount_point) {
            debug!(
                "{} shares volume {} with an earlier directory",
                dir.display(),
                volume.mount_point.display()
            );
            continue;
        }

        if volume.total_bytes == 0 {
            warn!(
                "Volume {} reports no capacity, skipping",
                volume.mount_point.display()
            );
            continue;
        }

        let status = VolumeStatus::new(
            volume.mount_point.clone(),
            volume.total_bytes,
            volume.available_bytes,
        );
        info!(
            "Total free space on volume {}: {:.2}%",
            status.root.display(),
            status.free_percent
        );
        statuses.push(status);
    }

    statuses
}
