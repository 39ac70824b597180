//! Sensor wired to the real platform: a temp mount table and a stand-in `df` script.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use storage_space_sensor::prelude::*;

fn write_script(path: &Path, body: &str) {
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    let mut perms = fs::metadata(path).expect("script metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod script");
}

#[test]
fn samples_through_external_command() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mounts = dir.path().join("mounts");
    fs::write(&mounts, "/dev/sdc1 /srv ext4 rw 0 0\n").expect("write mounts");
    let df = dir.path().join("fake-df");
    // Fails unless invoked as `df -BM --output=... /srv`.
    write_script(
        &df,
        "[ \"$3\" = /srv ] || exit 1\necho \"1M-blocks Used Avail\"\necho \"  2000M   500M  1500M\"",
    );

    let config = SensorConfig {
        block_device: Some("/dev/sdc1".to_string()),
        mount_table: mounts,
        probe_command: df.to_string_lossy().into_owned(),
        ..SensorConfig::default()
    };
    let sink = Arc::new(MemorySink::new());
    let sensor = StorageSpaceSensor::init_blocking(
        &config,
        Arc::new(LinuxPlatform::new()),
        sink.clone(),
        Duration::from_secs(5),
    )
    .expect("sensor init");

    assert_eq!(sensor.volume().mount_point, "/srv");
    let out = sensor.sample(1_000, "{0} {4}").expect("renders");
    assert_eq!(out.text, "500 25");
    assert_eq!(out.max, 100);
    assert_eq!(sink.count(Severity::Error), 0);
}

#[test]
fn failing_command_degrades_without_error_to_caller() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mounts = dir.path().join("mounts");
    fs::write(&mounts, "/dev/sdc1 / ext4 rw 0 0\n").expect("write mounts");
    let df = dir.path().join("broken-df");
    write_script(&df, "exit 3");

    let config = SensorConfig {
        mount_table: mounts,
        probe_command: df.to_string_lossy().into_owned(),
        ..SensorConfig::default()
    };
    let sink = Arc::new(MemorySink::new());
    let sensor = StorageSpaceSensor::init_blocking(
        &config,
        Arc::new(LinuxPlatform::new()),
        sink.clone(),
        Duration::from_secs(5),
    )
    .expect("sensor init");

    let out = sensor.sample(1_000, "{0}").expect("still renders");
    assert_eq!(out.text, "0");
    assert!(sensor.is_faulted());
    assert_eq!(sink.count(Severity::Error), 1);
}

#[test]
fn missing_mount_table_still_resolves_with_defaults() {
    let config = SensorConfig {
        mount_table: "/nonexistent/sss-mounts".into(),
        ..SensorConfig::default()
    };
    let sink = Arc::new(MemorySink::new());
    let sensor = StorageSpaceSensor::init_blocking(
        &config,
        Arc::new(LinuxPlatform::new()),
        sink.clone(),
        Duration::from_secs(5),
    )
    .expect("sensor init");

    assert_eq!(sensor.id(), "storage_space_rootfs");
    assert_eq!(sensor.volume().mount_point, "/");
    let events = sink.events();
    assert!(matches!(
        events.as_slice(),
        [SensorEvent::ResolutionFailed { error, .. }] if error.contains("does not exist")
    ));
}
