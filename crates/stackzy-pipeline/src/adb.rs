//! Android Debug Bridge integration.
//!
//! Shells out to the `adb` binary: `devices -l` to enumerate handsets,
//! `shell pm path` to locate an installed package and `pull` to copy it.

use crate::error::ToolError;
use crate::process::capture;
use async_trait::async_trait;
use stackzy_core::{DeviceBridge, DeviceHandle, DownloadProgress, ProgressSink, Result, StackzyError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// How often the local file is measured during a pull
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Client for the `adb` command line tool
#[derive(Debug, Clone)]
pub struct Adb {
    program: PathBuf,
    poll_interval: Duration,
}

impl Adb {
    /// Use `adb` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::with_program("adb")
    }

    /// Use a specific `adb` binary
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set how often pull progress is sampled
    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Devices that are online and authorized
    pub async fn list_devices(&self) -> Result<Vec<DeviceHandle>> {
        let stdout = capture(&self.program, ["devices", "-l"])
            .await?
            .into_stdout(&self.program)?;
        Ok(parse_devices(&stdout))
    }

    /// Size of a file on the device, if `stat` can tell
    async fn remote_size(&self, device: &DeviceHandle, remote_path: &str) -> Option<u64> {
        let output = capture(
            &self.program,
            ["-s", device.serial.as_str(), "shell", "stat", "-c", "%s", remote_path],
        )
        .await
        .ok()?;
        if !output.success {
            return None;
        }
        output.stdout.trim().parse().ok()
    }
}

impl Default for Adb {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceBridge for Adb {
    async fn apk_path(&self, device: &DeviceHandle, package_name: &str) -> Result<Option<String>> {
        let output = capture(
            &self.program,
            ["-s", device.serial.as_str(), "shell", "pm", "path", package_name],
        )
        .await?;

        if output.success {
            return Ok(parse_apk_path(&output.stdout));
        }

        // `pm path` exits 1 with no output for packages that are not installed
        if output.stderr.trim().is_empty() && parse_apk_path(&output.stdout).is_none() {
            debug!(device = %device, package = package_name, "package not installed");
            return Ok(None);
        }

        Err(ToolError::Exit {
            program: self.program.display().to_string(),
            status: output.status,
            detail: output.stderr.trim().to_string(),
        }
        .into())
    }

    async fn pull(
        &self,
        device: &DeviceHandle,
        remote_path: &str,
        destination: &Path,
        progress: &dyn ProgressSink,
    ) -> Result<()> {
        let total = self.remote_size(device, remote_path).await.unwrap_or(0);
        debug!(device = %device, remote = remote_path, bytes = total, "pulling from device");

        let mut child = Command::new(&self.program)
            .arg("-s")
            .arg(&device.serial)
            .arg("pull")
            .arg(remote_path)
            .arg(destination)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ToolError::Launch {
                program: self.program.display().to_string(),
                source,
            })?;

        let mut stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(stderr) = stderr.as_mut() {
                let _ = stderr.read_to_string(&mut text).await;
            }
            text
        });

        progress.report(0);
        let mut ticker = tokio::time::interval(self.poll_interval);
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                _ = ticker.tick() => {
                    if total > 0 {
                        let written = tokio::fs::metadata(destination).await.map(|m| m.len()).unwrap_or(0);
                        // 100 is reserved for a successful exit
                        progress.report(DownloadProgress::from_bytes(written, total).percent().min(99));
                    }
                }
            }
        };

        let stderr = stderr_task.await.unwrap_or_default();
        if !status.success() {
            warn!(device = %device, remote = remote_path, %status, "adb pull failed");
            return Err(StackzyError::Transport(format!(
                "adb pull of {remote_path} from {device} failed: {}",
                stderr.trim()
            )));
        }

        info!(device = %device, remote = remote_path, "pull finished");
        progress.report(100);
        Ok(())
    }
}

/// Parse `adb devices -l` output, keeping devices in the `device` state
#[must_use]
pub fn parse_devices(output: &str) -> Vec<DeviceHandle> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let serial = fields.next()?;
            if fields.next()? != "device" {
                return None;
            }
            let model = fields
                .find_map(|field| field.strip_prefix("model:"))
                .map(|model| model.replace('_', " "));
            Some(DeviceHandle {
                serial: serial.to_string(),
                model,
            })
        })
        .collect()
}

/// Pick the APK path from `pm path` output, preferring `base.apk`
#[must_use]
pub fn parse_apk_path(output: &str) -> Option<String> {
    let paths: Vec<&str> = output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .filter(|path| !path.is_empty())
        .collect();

    paths
        .iter()
        .find(|path| path.ends_with("/base.apk"))
        .or_else(|| paths.first())
        .map(|path| (*path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices() {
        let output = "List of devices attached\n\
            emulator-5554          device product:sdk_gphone64 model:sdk_gphone64_x86_64 device:emu64x transport_id:1\n\
            0A1B2C3D               unauthorized usb:1-1 transport_id:2\n\
            R58M123ABC             device usb:2-1 product:beyond1 model:SM_G973F device:beyond1 transport_id:3\n\n";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[0].model.as_deref(), Some("sdk gphone64 x86 64"));
        assert_eq!(devices[1].serial, "R58M123ABC");
        assert_eq!(devices[1].model.as_deref(), Some("SM G973F"));
    }

    #[test]
    fn test_parse_devices_skips_daemon_banner() {
        let output = "* daemon not running; starting now at tcp:5037\n* daemon started successfully\nList of devices attached\n";
        assert!(parse_devices(output).is_empty());
    }

    #[test]
    fn test_parse_apk_path_prefers_base() {
        let output = "package:/data/app/~~x==/com.example-1/split_config.arm64_v8a.apk\n\
            package:/data/app/~~x==/com.example-1/base.apk\n";
        assert_eq!(
            parse_apk_path(output).as_deref(),
            Some("/data/app/~~x==/com.example-1/base.apk")
        );
    }

    #[test]
    fn test_parse_apk_path_single_and_missing() {
        assert_eq!(
            parse_apk_path("package:/system/app/Foo/Foo.apk\n").as_deref(),
            Some("/system/app/Foo/Foo.apk")
        );
        assert_eq!(parse_apk_path(""), None);
        assert_eq!(parse_apk_path("package:\n"), None);
    }

    #[cfg(unix)]
    mod fake_adb {
        use super::super::*;
        use std::os::unix::fs::PermissionsExt;
        use std::sync::Mutex;

        fn fake(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("adb");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[tokio::test]
        async fn test_apk_path_not_installed() {
            let tmp = tempfile::tempdir().unwrap();
            let adb = Adb::with_program(fake(tmp.path(), "exit 1"));
            let device = DeviceHandle::new("emulator-5554");
            assert_eq!(adb.apk_path(&device, "com.missing").await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_apk_path_offline_device_is_transport() {
            let tmp = tempfile::tempdir().unwrap();
            let adb = Adb::with_program(fake(tmp.path(), "echo \"error: device offline\" >&2\nexit 1"));
            let device = DeviceHandle::new("emulator-5554");
            let err = adb.apk_path(&device, "com.example").await.unwrap_err();
            assert_eq!(err.kind(), "transport");
            assert!(err.to_string().contains("device offline"));
        }

        #[tokio::test]
        async fn test_pull_copies_and_reports_completion() {
            let tmp = tempfile::tempdir().unwrap();
            let source = tmp.path().join("remote.apk");
            std::fs::write(&source, vec![7u8; 4096]).unwrap();
            // $1=-s $2=serial $3=shell|pull ...
            let script = format!(
                "if [ \"$3\" = shell ]; then echo 4096; exit 0; fi\ncp \"{}\" \"$5\"",
                source.display()
            );
            let adb = Adb::with_program(fake(tmp.path(), &script)).poll_interval(Duration::from_millis(5));

            let dest = tmp.path().join("local.apk");
            let seen = Mutex::new(Vec::new());
            let sink = |p: u8| seen.lock().unwrap().push(p);
            adb.pull(&DeviceHandle::new("emulator-5554"), "/data/app/base.apk", &dest, &sink)
                .await
                .unwrap();

            assert_eq!(std::fs::metadata(&dest).unwrap().len(), 4096);
            let seen = seen.into_inner().unwrap();
            assert_eq!(seen.first(), Some(&0));
            assert_eq!(seen.last(), Some(&100));
        }

        #[tokio::test]
        async fn test_pull_failure_is_transport() {
            let tmp = tempfile::tempdir().unwrap();
            let script = "if [ \"$3\" = shell ]; then echo 10; exit 0; fi\necho \"adb: error: remote object does not exist\" >&2\nexit 1";
            let adb = Adb::with_program(fake(tmp.path(), script));
            let sink = |_: u8| {};
            let err = adb
                .pull(&DeviceHandle::new("x"), "/nope.apk", &tmp.path().join("out.apk"), &sink)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), "transport");
            assert!(err.to_string().contains("does not exist"));
        }
    }
}
