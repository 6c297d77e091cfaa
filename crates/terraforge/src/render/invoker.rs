//! External render tool invocation.
//!
//! Wraps a single headless Blender call:
//! `blender --background --python <script> -- <args...>`.
//! The calling worker thread blocks until the process exits or the timeout
//! fires. Output is captured up to a hard per-stream limit; exceeding it is
//! a failure, not silent truncation.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use crate::error::RenderError;
use crate::sanitize;

/// Maximum stdout or stderr size captured per stream (10 MiB).
pub const MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// How often the invoker polls a running child for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Script identity per job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    Terrain,
    Road,
    Test,
}

impl ScriptKind {
    /// Filename of the generator script under the scripts directory.
    pub fn script_file(&self) -> &'static str {
        match self {
            ScriptKind::Terrain => "terrain_generator.py",
            ScriptKind::Road => "road_generator.py",
            ScriptKind::Test => "test.py",
        }
    }
}

/// Captured output of a successful invocation.
#[derive(Debug)]
pub struct RenderOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Seam for substituting a fake renderer in tests.
pub trait RenderInvoker: Send + Sync {
    fn invoke(&self, kind: ScriptKind, args: &[PathBuf]) -> Result<RenderOutput, RenderError>;
}

/// Production invoker running the configured Blender executable.
pub struct BlenderInvoker {
    blender_path: PathBuf,
    scripts_directory: PathBuf,
    timeout: Duration,
}

impl BlenderInvoker {
    pub fn new<P: AsRef<Path>>(blender_path: P, scripts_directory: P, timeout: Duration) -> Self {
        Self {
            blender_path: blender_path.as_ref().to_path_buf(),
            scripts_directory: scripts_directory.as_ref().to_path_buf(),
            timeout,
        }
    }
}

impl RenderInvoker for BlenderInvoker {
    fn invoke(&self, kind: ScriptKind, args: &[PathBuf]) -> Result<RenderOutput, RenderError> {
        // Every path argument crosses a trust boundary here.
        for arg in args {
            if !sanitize::is_safe_argument(arg) {
                return Err(RenderError::UnsafeArgument(
                    arg.to_string_lossy().into_owned(),
                ));
            }
        }

        let script = self.scripts_directory.join(kind.script_file());
        if !script.is_file() {
            return Err(RenderError::MissingScript(script));
        }

        log::info!(
            "Invoking {} with {} ({} args)",
            self.blender_path.display(),
            kind.script_file(),
            args.len()
        );

        let mut child = Command::new(&self.blender_path)
            .arg("--background")
            .arg("--python")
            .arg(&script)
            .arg("--")
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RenderError::Spawn {
                program: self.blender_path.clone(),
                source: e,
            })?;

        // Drain both streams on reader threads so a chatty child never
        // deadlocks against a full pipe while we wait for it.
        let stdout_handle = child.stdout.take();
        let stderr_handle = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || read_stream(stdout_handle));
        let stderr_reader = std::thread::spawn(move || read_stream(stderr_handle));

        let start = Instant::now();
        let status = loop {
            match child.try_wait()? {
                Some(status) => break status,
                None => {
                    if start.elapsed() > self.timeout {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(RenderError::Timeout {
                            elapsed_secs: start.elapsed().as_secs(),
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
            }
        };

        let stdout_bytes = stdout_reader.join().unwrap_or_default();
        let stderr_bytes = stderr_reader.join().unwrap_or_default();

        if stdout_bytes.len() > MAX_OUTPUT_BYTES {
            return Err(RenderError::OutputOverflow {
                stream: "stdout",
                limit: MAX_OUTPUT_BYTES,
            });
        }
        if stderr_bytes.len() > MAX_OUTPUT_BYTES {
            return Err(RenderError::OutputOverflow {
                stream: "stderr",
                limit: MAX_OUTPUT_BYTES,
            });
        }

        let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
        let stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

        if !status.success() {
            return Err(RenderError::NonZeroExit {
                code: status.code().unwrap_or(-1),
                stderr_tail: tail(&stderr, 300),
            });
        }

        // Some tools report errors without a failing exit code.
        if let Some(marker) = find_error_marker(&stderr) {
            return Err(RenderError::ErrorMarker { marker });
        }

        Ok(RenderOutput { stdout, stderr })
    }
}

/// Reads an entire output stream, allowing one byte past the capture limit
/// so overflow is detectable.
fn read_stream<R: Read>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(h) = handle {
        let _ = h.take(MAX_OUTPUT_BYTES as u64 + 1).read_to_end(&mut buf);
    }
    buf
}

/// First line in captured error output starting with an `Error:` marker.
fn find_error_marker(stderr: &str) -> Option<String> {
    stderr
        .lines()
        .find(|line| line.trim_start().starts_with("Error:"))
        .map(|line| line.trim().to_string())
}

fn tail(s: &str, max_chars: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        s.to_string()
    } else {
        chars[chars.len() - max_chars..].iter().collect()
    }
}
