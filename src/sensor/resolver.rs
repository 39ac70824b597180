//! Volume resolver: maps a block device to its mount point (or back) using the
//! live mount table.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::errors::{Result, SensorError};
use crate::platform::pal::Platform;

/// Device placeholder meaning "whatever is mounted at `/`".
pub const ROOT_SENTINEL: &str = "(root)";

/// Mount point watched when nothing else is known.
pub const ROOT_MOUNT_POINT: &str = "/";

/// One `<device> <mountPoint> ...` row of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub device: String,
    pub mount_point: String,
}

/// A device/mount-point pair the sensor watches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub block_device: String,
    pub mount_point: String,
}

impl Default for Volume {
    fn default() -> Self {
        Self {
            block_device: ROOT_SENTINEL.to_string(),
            mount_point: ROOT_MOUNT_POINT.to_string(),
        }
    }
}

impl Volume {
    /// Starting pair before resolution: the configured device (or the root
    /// sentinel) with the root mount point.
    #[must_use]
    pub fn initial(configured_device: Option<&str>) -> Self {
        configured_device.map_or_else(Self::default, |device| Self {
            block_device: device.to_string(),
            mount_point: ROOT_MOUNT_POINT.to_string(),
        })
    }
}

/// Parse mount table text. Rows keep their file order and their fields verbatim.
#[must_use]
pub fn parse_mount_table(raw: &str) -> Vec<MountEntry> {
    raw.lines()
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            Some(MountEntry {
                device: device.to_string(),
                mount_point: mount_point.to_string(),
            })
        })
        .collect()
}

/// Looks up devices and mount points in the mount table. First match wins.
#[derive(Clone)]
pub struct VolumeResolver {
    platform: Arc<dyn Platform>,
    mount_table: PathBuf,
}

impl VolumeResolver {
    #[must_use]
    pub fn new(platform: Arc<dyn Platform>, mount_table: impl Into<PathBuf>) -> Self {
        Self {
            platform,
            mount_table: mount_table.into(),
        }
    }

    #[must_use]
    pub fn mount_table(&self) -> &Path {
        &self.mount_table
    }

    /// Mount point of `device`.
    pub fn resolve_mount_point(&self, device: &str) -> Result<String> {
        self.entries()?
            .into_iter()
            .find(|entry| entry.device == device)
            .map(|entry| entry.mount_point)
            .ok_or_else(|| SensorError::NotFound {
                query: device.to_string(),
                details: format!("failed to find mount point for block device {device}"),
            })
    }

    /// Device mounted at `mount_point`.
    pub fn resolve_block_device(&self, mount_point: &str) -> Result<String> {
        self.entries()?
            .into_iter()
            .find(|entry| entry.mount_point == mount_point)
            .map(|entry| entry.device)
            .ok_or_else(|| SensorError::NotFound {
                query: mount_point.to_string(),
                details: format!("failed to find block device for mount point {mount_point}"),
            })
    }

    /// Complete a one-sided identifier: a configured device gets its mount
    /// point, otherwise the device behind `/` is looked up.
    pub fn resolve(&self, configured_device: Option<&str>) -> Result<Volume> {
        match configured_device {
            Some(device) => Ok(Volume {
                block_device: device.to_string(),
                mount_point: self.resolve_mount_point(device)?,
            }),
            None => Ok(Volume {
                block_device: self.resolve_block_device(ROOT_MOUNT_POINT)?,
                mount_point: ROOT_MOUNT_POINT.to_string(),
            }),
        }
    }

    fn entries(&self) -> Result<Vec<MountEntry>> {
        let raw = self.platform.read_text(&self.mount_table)?;
        Ok(parse_mount_table(&raw))
    }
}

impl std::fmt::Debug for VolumeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeResolver")
            .field("mount_table", &self.mount_table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::pal::MockPlatform;
    use proptest::prelude::*;

    const TABLE: &str = "/dev/sda1 / ext4 rw,relatime 0 0\r\n\
                         tmpfs /tmp tmpfs rw,nosuid,nodev 0 0\n\
                         \n\
                         /dev/sdb1 /data xfs rw 0 0\n\
                         /dev/sdb1 /mnt/again xfs rw 0 0\n";

    fn resolver_with(table: &str) -> VolumeResolver {
        let platform = MockPlatform::new().with_file("/proc/mounts", table);
        VolumeResolver::new(Arc::new(platform), "/proc/mounts")
    }

    #[test]
    fn parses_rows_in_order_and_tolerates_crlf() {
        let rows = parse_mount_table(TABLE);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].device, "/dev/sda1");
        assert_eq!(rows[0].mount_point, "/");
        assert_eq!(rows[1].mount_point, "/tmp");
    }

    #[test]
    fn single_field_lines_are_skipped() {
        assert!(parse_mount_table("orphan\n").is_empty());
    }

    #[test]
    fn resolves_mount_point_first_match_wins() {
        let resolver = resolver_with(TABLE);
        assert_eq!(resolver.resolve_mount_point("/dev/sdb1").expect("found"), "/data");
    }

    #[test]
    fn resolves_block_device_for_root() {
        let resolver = resolver_with(TABLE);
        assert_eq!(resolver.resolve_block_device("/").expect("found"), "/dev/sda1");
    }

    #[test]
    fn no_normalization_of_trailing_slash() {
        let resolver = resolver_with(TABLE);
        let err = resolver
            .resolve_block_device("/data/")
            .expect_err("trailing slash is not normalized");
        assert!(matches!(err, SensorError::NotFound { .. }));
    }

    #[test]
    fn unknown_device_is_not_found() {
        let err = resolver_with(TABLE)
            .resolve_mount_point("/dev/sdz9")
            .expect_err("unknown device");
        assert!(matches!(err, SensorError::NotFound { .. }));
        assert!(err.to_string().contains("/dev/sdz9"));
    }

    #[test]
    fn missing_table_is_source_unavailable() {
        let resolver = VolumeResolver::new(Arc::new(MockPlatform::new()), "/proc/mounts");
        let err = resolver
            .resolve_block_device("/")
            .expect_err("missing table");
        assert!(matches!(err, SensorError::SourceUnavailable { .. }));
    }

    #[test]
    fn resolve_without_device_uses_root() {
        let volume = resolver_with(TABLE).resolve(None).expect("resolved");
        assert_eq!(
            volume,
            Volume {
                block_device: "/dev/sda1".to_string(),
                mount_point: "/".to_string(),
            }
        );
    }

    #[test]
    fn initial_volume_keeps_configured_device() {
        let volume = Volume::initial(Some("/dev/sdb1"));
        assert_eq!(volume.block_device, "/dev/sdb1");
        assert_eq!(volume.mount_point, "/");
        assert_eq!(Volume::initial(None).block_device, ROOT_SENTINEL);
    }

    proptest! {
        #[test]
        fn device_and_mount_point_lookups_are_inverse(
            rows in proptest::collection::btree_map("/[a-z]{1,8}", "/dev/[a-z]{2,6}[0-9]", 1..8),
            pick in any::<proptest::sample::Index>(),
        ) {
            // Keys are unique mount points; devices may repeat.
            let table: String = rows
                .iter()
                .map(|(mount, device)| format!("{device} {mount} ext4 rw 0 0\n"))
                .collect();
            let resolver = resolver_with(&table);
            let (mount, _) = rows.iter().nth(pick.index(rows.len())).expect("index in range");

            let device = resolver.resolve_block_device(mount).expect("mount present");
            let first_mount = resolver.resolve_mount_point(&device).expect("device present");
            prop_assert_eq!(
                resolver.resolve_block_device(&first_mount).expect("round trip"),
                device
            );
        }
    }
}
