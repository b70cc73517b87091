//! `apktool` subprocess integration.

use crate::cancel::Cancellation;
use crate::paths::is_populated;
use async_trait::async_trait;
use regex::Regex;
use stackzy_core::{Result, StackzyError};
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// `I: `, `W: `, `E: `, `S: ` prefixes apktool puts before each line
static LOG_LEVEL_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]: ").expect("static regex"));

/// Lines of stderr kept for the failure message
const STDERR_TAIL: usize = 5;

/// Reconstructs a source/resource tree from a binary
#[async_trait]
pub trait Decompiler: Send + Sync {
    /// Decompile `binary` into `target_dir`, relaying each progress line
    ///
    /// On success the returned directory exists and is non-empty. On
    /// failure or cancellation nothing is left at `target_dir`.
    async fn decompile(
        &self,
        binary: &Path,
        target_dir: &Path,
        on_line: &(dyn for<'a> Fn(&'a str) + Send + Sync),
        cancel: &Cancellation,
    ) -> Result<PathBuf>;
}

/// Strip the log-level prefix of an apktool line
#[must_use]
pub fn strip_log_level(line: &str) -> &str {
    LOG_LEVEL_PREFIX
        .find(line)
        .map_or(line, |prefix| &line[prefix.end()..])
}

/// Runs `apktool d -f <binary> -o <dir>`
#[derive(Debug, Clone)]
pub struct ApkTool {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ApkTool {
    /// Use `apktool` from `PATH`
    #[must_use]
    pub fn new() -> Self {
        Self::with_command("apktool", Vec::<OsString>::new())
    }

    /// Use a custom launcher, e.g. `java -jar apktool.jar`
    #[must_use]
    pub fn with_command<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run a jar through `java -jar`
    #[must_use]
    pub fn jar(java: impl Into<PathBuf>, jar: impl Into<PathBuf>) -> Self {
        let jar: PathBuf = jar.into();
        Self::with_command(java, [OsString::from("-jar"), jar.into_os_string()])
    }

    fn command_args(&self, binary: &Path, target_dir: &Path) -> Vec<OsString> {
        let mut args = self.args.clone();
        args.extend([
            OsString::from("d"),
            OsString::from("-f"),
            binary.as_os_str().to_owned(),
            OsString::from("-o"),
            target_dir.as_os_str().to_owned(),
        ]);
        args
    }

    async fn run(
        &self,
        binary: &Path,
        target_dir: &Path,
        on_line: &(dyn Fn(&str) + Send + Sync),
    ) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(self.command_args(binary, target_dir))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                StackzyError::DecompileFailure(format!(
                    "failed to launch {}: {e}",
                    self.program.display()
                ))
            })?;

        let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
        let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());
        let mut tail = VecDeque::with_capacity(STDERR_TAIL);

        while stdout.is_some() || stderr.is_some() {
            tokio::select! {
                line = next_line(&mut stdout) => match line {
                    Some(line) => relay(&line, on_line),
                    None => stdout = None,
                },
                line = next_line(&mut stderr) => match line {
                    Some(line) => {
                        relay(&line, on_line);
                        if tail.len() == STDERR_TAIL {
                            tail.pop_front();
                        }
                        tail.push_back(strip_log_level(&line).to_string());
                    }
                    None => stderr = None,
                },
            }
        }

        let status = child.wait().await?;
        if status.success() {
            Ok(())
        } else {
            let detail = Vec::from(tail).join("; ");
            Err(StackzyError::DecompileFailure(format!(
                "apktool exited with {status}: {detail}"
            )))
        }
    }
}

impl Default for ApkTool {
    fn default() -> Self {
        Self::new()
    }
}

type Lines<R> = tokio::io::Lines<BufReader<R>>;

/// Next line of an open stream; pends forever once the stream is closed
async fn next_line<R>(lines: &mut Option<Lines<R>>) -> Option<String>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

fn relay(line: &str, on_line: &(dyn Fn(&str) + Send + Sync)) {
    let line = strip_log_level(line.trim_end());
    if !line.is_empty() {
        on_line(line);
    }
}

async fn clear_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(dir = %dir.display(), error = %e, "failed to remove decompiled directory");
        }
    }
}

#[async_trait]
impl Decompiler for ApkTool {
    async fn decompile(
        &self,
        binary: &Path,
        target_dir: &Path,
        on_line: &(dyn for<'a> Fn(&'a str) + Send + Sync),
        cancel: &Cancellation,
    ) -> Result<PathBuf> {
        clear_dir(target_dir).await;
        if let Some(parent) = target_dir.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(binary = %binary.display(), target = %target_dir.display(), "starting apktool");

        if let Err(e) = cancel.guard(self.run(binary, target_dir, on_line)).await {
            clear_dir(target_dir).await;
            return Err(e);
        }

        if !is_populated(target_dir) {
            clear_dir(target_dir).await;
            return Err(StackzyError::DecompileFailure(format!(
                "apktool produced no output in {}",
                target_dir.display()
            )));
        }

        info!(target = %target_dir.display(), "decompile finished");
        Ok(target_dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_log_level() {
        assert_eq!(strip_log_level("I: Using Apktool 2.9.3"), "Using Apktool 2.9.3");
        assert_eq!(strip_log_level("W: Could not decode attr"), "Could not decode attr");
        assert_eq!(strip_log_level("Input: no prefix"), "Input: no prefix");
        assert_eq!(strip_log_level("plain line"), "plain line");
    }

    #[test]
    fn test_command_args() {
        let tool = ApkTool::jar("java", "/opt/apktool.jar");
        let args = tool.command_args(Path::new("/tmp/a.apk"), Path::new("/tmp/out"));
        let args: Vec<_> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args, ["-jar", "/opt/apktool.jar", "d", "-f", "/tmp/a.apk", "-o", "/tmp/out"]);
    }

    #[cfg(unix)]
    mod script {
        use super::super::*;
        use std::sync::Mutex;
        use std::time::Duration;

        /// apktool stand-in run through `sh`; `$3` is the binary, `$5` the output dir
        fn fake_apktool(dir: &Path, body: &str) -> ApkTool {
            let script = dir.join("apktool.sh");
            std::fs::write(&script, body).unwrap();
            ApkTool::with_command("sh", [script])
        }

        #[tokio::test]
        async fn test_successful_decompile_relays_stripped_lines() {
            let tmp = tempfile::tempdir().unwrap();
            let tool = fake_apktool(
                tmp.path(),
                r#"echo "I: Using Apktool 2.9.3 on $(basename "$3")"
echo "I: Baksmaling classes.dex..."
mkdir -p "$5/smali/com/example"
echo ".class public Lcom/example/A;" > "$5/smali/com/example/A.smali"
echo "W: Could not decode attr value" >&2
"#,
            );
            let binary = tmp.path().join("app.apk");
            std::fs::write(&binary, b"apk").unwrap();
            let target = tmp.path().join("out");

            let lines = Mutex::new(Vec::new());
            let on_line = |line: &str| lines.lock().unwrap().push(line.to_string());
            let dir = tool
                .decompile(&binary, &target, &on_line, &Cancellation::new())
                .await
                .unwrap();

            assert_eq!(dir, target);
            assert!(dir.join("smali/com/example/A.smali").is_file());
            let lines = lines.into_inner().unwrap();
            assert!(lines.contains(&"Using Apktool 2.9.3 on app.apk".to_string()));
            assert!(lines.contains(&"Baksmaling classes.dex...".to_string()));
            assert!(lines.contains(&"Could not decode attr value".to_string()));
        }

        #[tokio::test]
        async fn test_non_zero_exit_removes_partial_output() {
            let tmp = tempfile::tempdir().unwrap();
            let tool = fake_apktool(
                tmp.path(),
                "mkdir -p \"$5/partial\"\necho \"E: brut.androlib.AndrolibException: boom\" >&2\nexit 1\n",
            );
            let target = tmp.path().join("out");

            let err = tool
                .decompile(&tmp.path().join("app.apk"), &target, &|_| {}, &Cancellation::new())
                .await
                .unwrap_err();

            assert!(matches!(err, StackzyError::DecompileFailure(_)));
            assert!(err.to_string().contains("AndrolibException: boom"));
            assert!(!target.exists());
        }

        #[tokio::test]
        async fn test_empty_output_is_failure() {
            let tmp = tempfile::tempdir().unwrap();
            let tool = fake_apktool(tmp.path(), "mkdir -p \"$5\"\nexit 0\n");
            let target = tmp.path().join("out");

            let err = tool
                .decompile(&tmp.path().join("app.apk"), &target, &|_| {}, &Cancellation::new())
                .await
                .unwrap_err();
            assert!(err.to_string().contains("no output"));
            assert!(!target.exists());
        }

        #[tokio::test]
        async fn test_stale_output_is_replaced() {
            let tmp = tempfile::tempdir().unwrap();
            let target = tmp.path().join("out");
            std::fs::create_dir_all(target.join("stale")).unwrap();
            let tool = fake_apktool(tmp.path(), "mkdir -p \"$5/res\"\ntouch \"$5/AndroidManifest.xml\"\n");

            tool.decompile(&tmp.path().join("app.apk"), &target, &|_| {}, &Cancellation::new())
                .await
                .unwrap();
            assert!(!target.join("stale").exists());
            assert!(target.join("AndroidManifest.xml").is_file());
        }

        #[tokio::test]
        async fn test_cancel_kills_subprocess() {
            let tmp = tempfile::tempdir().unwrap();
            let tool = fake_apktool(tmp.path(), "mkdir -p \"$5/smali\"\nexec sleep 30\n");
            let target = tmp.path().join("out");
            let cancel = Cancellation::new();
            let trigger = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                trigger.cancel();
            });

            let started = std::time::Instant::now();
            let err = tool
                .decompile(&tmp.path().join("app.apk"), &target, &|_| {}, &cancel)
                .await
                .unwrap_err();
            assert!(err.is_cancelled());
            assert!(started.elapsed() < Duration::from_secs(10));
            assert!(!target.exists());
        }

        #[tokio::test]
        async fn test_missing_program_is_decompile_failure() {
            let tmp = tempfile::tempdir().unwrap();
            let tool = ApkTool::with_command(tmp.path().join("no-such-apktool"), Vec::<OsString>::new());
            let err = tool
                .decompile(&tmp.path().join("a.apk"), &tmp.path().join("out"), &|_| {}, &Cancellation::new())
                .await
                .unwrap_err();
            assert!(matches!(err, StackzyError::DecompileFailure(_)));
        }
    }
}
