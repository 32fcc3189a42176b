//! Delegation to `puppet apply` and parsing of its log output.

use crate::core::error::{PassgenError, Result};
use serde_yaml::Value;
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Result of one manifest evaluation.
#[derive(Debug, Clone, Default)]
pub struct ApplyOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Command line, for error messages.
    pub command: String,
}

impl ApplyOutput {
    /// Turn a non-zero exit into a [`PassgenError::Delegate`].
    pub fn check(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        // stdout may carry listed passwords, so only stderr is reported.
        let mut stderr = self.stderr.trim().to_string();
        if stderr.is_empty() {
            stderr = "(no error output)".to_string();
        }
        if let Some(code) = self.code {
            stderr = format!("exit status {}\n{}", code, stderr);
        }
        Err(PassgenError::Delegate {
            command: self.command,
            stderr,
        })
    }
}

/// Capability to evaluate a manifest in a puppet environment.
pub trait ManifestRunner {
    fn apply(&self, manifest: &str, environment: &str, vardir: &Path) -> Result<ApplyOutput>;
}

/// Runs manifests through the `puppet apply` executable.
#[derive(Debug, Clone)]
pub struct PuppetApply {
    pub command: String,
    pub group: Option<String>,
    /// Kill the process after this long; `None` blocks until exit.
    pub timeout: Option<Duration>,
}

impl PuppetApply {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            group: None,
            timeout: None,
        }
    }

    pub fn with_group(mut self, group: Option<String>) -> Self {
        self.group = group.filter(|g| !g.is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn build(&self, manifest_path: &Path, environment: &str, vardir: &Path) -> Command {
        let mut cmd = Command::new(&self.command);
        cmd.arg("apply")
            .arg("--color=false")
            .arg(format!("--environment={}", environment))
            .arg(format!("--vardir={}", vardir.display()));
        if let Some(group) = &self.group {
            cmd.arg(format!("--group={}", group));
        }
        cmd.arg(manifest_path);
        cmd
    }
}

impl ManifestRunner for PuppetApply {
    fn apply(&self, manifest: &str, environment: &str, vardir: &Path) -> Result<ApplyOutput> {
        let mut file = tempfile::Builder::new()
            .prefix("passgen-")
            .suffix(".pp")
            .tempfile()
            .map_err(|e| PassgenError::io("create temp manifest", e))?;
        file.write_all(manifest.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| PassgenError::io("write temp manifest", e))?;

        let mut cmd = self.build(file.path(), environment, vardir);
        let command = format!("{:?}", cmd);
        tracing::debug!(%command, "running puppet apply");

        match self.timeout {
            None => {
                let output = cmd
                    .output()
                    .map_err(|e| PassgenError::io(format!("run {}", self.command), e))?;
                Ok(ApplyOutput {
                    success: output.status.success(),
                    code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                    command,
                })
            }
            Some(timeout) => run_with_timeout(cmd, command, timeout),
        }
    }
}

// Output goes to temp files so the child never blocks on a full pipe while
// it is being polled.
fn run_with_timeout(mut cmd: Command, command: String, timeout: Duration) -> Result<ApplyOutput> {
    let stdout_file = tempfile::tempfile().map_err(|e| PassgenError::io("create temp file", e))?;
    let stderr_file = tempfile::tempfile().map_err(|e| PassgenError::io("create temp file", e))?;
    let mut stdout_reader = stdout_file
        .try_clone()
        .map_err(|e| PassgenError::io("clone temp file", e))?;
    let mut stderr_reader = stderr_file
        .try_clone()
        .map_err(|e| PassgenError::io("clone temp file", e))?;

    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout_file))
        .stderr(Stdio::from(stderr_file))
        .spawn()
        .map_err(|e| PassgenError::io(format!("run {}", command), e))?;

    let start = Instant::now();
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(PassgenError::Delegate {
                        command,
                        stderr: format!("timed out after {:?}", timeout),
                    });
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(PassgenError::io("wait for puppet apply", e)),
        }
    };

    Ok(ApplyOutput {
        success: status.success(),
        code: status.code(),
        stdout: read_all(&mut stdout_reader)?,
        stderr: read_all(&mut stderr_reader)?,
        command,
    })
}

fn read_all(file: &mut fs::File) -> Result<String> {
    use std::io::{Read, Seek, SeekFrom};
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))
        .and_then(|_| file.read_to_end(&mut buf))
        .map_err(|e| PassgenError::io("read puppet output", e))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

const LOG_PREFIXES: &[&str] = &[
    "Debug:",
    "Info:",
    "Notice:",
    "Warning:",
    "Error:",
    "Critical:",
    "Alert:",
    "Emergency:",
];

fn is_log_line(line: &str) -> bool {
    LOG_PREFIXES.iter().any(|p| line.starts_with(p))
}

/// Extract the YAML document a manifest emitted through `notice()`.
///
/// Everything before the first `---` marker is banner text; log-prefixed
/// lines after it are dropped. A missing marker or a non-mapping document is
/// an error rather than an empty result; errors never echo the output.
pub fn parse_apply_output(stdout: &str) -> Result<Value> {
    let mut lines = stdout.lines().skip_while(|l| !(*l == "---" || l.starts_with("--- ")));
    let Some(marker) = lines.next() else {
        return Err(PassgenError::parse(
            "puppet apply output",
            format!("no YAML document marker in {} lines of output", stdout.lines().count()),
        ));
    };
    let mut body = String::from(marker);
    body.push('\n');
    for line in lines.filter(|l| !is_log_line(l)) {
        body.push_str(line);
        body.push('\n');
    }

    let value: Value = serde_yaml::from_str(&body)
        .map_err(|e| PassgenError::parse("puppet apply output", e.to_string()))?;
    if !value.is_mapping() {
        return Err(PassgenError::parse(
            "puppet apply output",
            format!("expected a mapping, got {}", yaml_kind(&value)),
        ));
    }
    Ok(value)
}

fn yaml_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Render `value` as a single-quoted puppet string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "\
Notice: Compiled catalog for puppet.example.com in environment production in 0.05 seconds
Notice: Scope(Class[main]): 
---
keys:
  db:
    value:
      password: s3cret
      salt: abc
    metadata:
      history: []
Notice: Applied catalog in 0.01 seconds
";

    #[test]
    fn test_parse_strips_banner_and_log_lines() {
        let value = parse_apply_output(OUTPUT).unwrap();
        let password = value["keys"]["db"]["value"]["password"].as_str();
        assert_eq!(password, Some("s3cret"));
        assert!(value.get("Notice").is_none());
    }

    #[test]
    fn test_parse_inline_empty_mapping() {
        let value = parse_apply_output("Notice: Scope(Class[main]): \n--- {}\nNotice: done\n").unwrap();
        assert!(value.as_mapping().unwrap().is_empty());
    }

    #[test]
    fn test_parse_without_marker_fails() {
        let err = parse_apply_output("Notice: Applied catalog in 0.01 seconds\n").unwrap_err();
        assert!(matches!(err, PassgenError::Parse { .. }));
    }

    #[test]
    fn test_parse_scalar_document_fails() {
        let err = parse_apply_output("---\njust text\n").unwrap_err();
        assert!(err.to_string().contains("got a string"));
        assert!(!err.to_string().contains("just text"));
    }

    #[test]
    fn test_parse_errors_do_not_echo_output() {
        let err = parse_apply_output("Notice: password: TOPSECRET\n").unwrap_err();
        assert!(!err.to_string().contains("TOPSECRET"));
    }

    #[test]
    fn test_check_ignores_stdout() {
        let out = ApplyOutput {
            success: false,
            code: Some(1),
            stdout: "---\nkeys:\n  db:\n    value: {password: TOPSECRET}\n".into(),
            stderr: String::new(),
            command: "puppet apply x.pp".into(),
        };
        let msg = out.check().unwrap_err().to_string();
        assert!(msg.contains("no error output"), "{}", msg);
        assert!(!msg.contains("TOPSECRET"), "{}", msg);
    }

    #[test]
    fn test_check_nonzero_exit() {
        let out = ApplyOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: "Error: Evaluation Error".into(),
            command: "puppet apply x.pp".into(),
        };
        let err = out.check().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("puppet apply x.pp"));
        assert!(msg.contains("Evaluation Error"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's"), r"'it\'s'");
        assert_eq!(quote(r"a\b"), r"'a\\b'");
    }

    #[test]
    fn test_build_arguments() {
        let runner = PuppetApply::new("puppet").with_group(Some("puppet".into()));
        let cmd = runner.build(Path::new("/tmp/m.pp"), "dev", Path::new("/var/pup"));
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "apply",
                "--color=false",
                "--environment=dev",
                "--vardir=/var/pup",
                "--group=puppet",
                "/tmp/m.pp"
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-puppet");
        fs::write(&script, "#!/bin/sh\nsleep 5\n").unwrap();
        crate::util::fs::set_permissions(&script, 0o755).unwrap();
        let runner = PuppetApply::new(script.display().to_string())
            .with_timeout(Some(Duration::from_millis(200)));
        let err = runner.apply("notice('x')", "production", dir.path()).unwrap_err();
        assert!(err.to_string().contains("timed out after 200ms"), "{}", err);
    }

    #[cfg(unix)]
    #[test]
    fn test_apply_captures_stdout() {
        let dir = tempfile::TempDir::new().unwrap();
        let script = dir.path().join("fake-puppet");
        fs::write(&script, "#!/bin/sh\necho '---'\necho 'ok: true'\n").unwrap();
        crate::util::fs::set_permissions(&script, 0o755).unwrap();
        for timeout in [None, Some(Duration::from_secs(5))] {
            let runner = PuppetApply::new(script.display().to_string()).with_timeout(timeout);
            let out = runner.apply("notice('x')", "production", dir.path()).unwrap();
            assert!(out.success);
            let value = parse_apply_output(&out.stdout).unwrap();
            assert_eq!(value["ok"].as_bool(), Some(true));
        }
    }
}
