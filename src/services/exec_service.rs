use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout_at;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::models::Language;

/// Outcome of one execution, always a normal payload. Compiler errors,
/// non-zero exits and timeouts all land here with `success: false`;
/// they are expected results of running arbitrary code, not protocol
/// failures.
#[derive(Debug, Clone)]
pub struct ExecOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
}

impl ExecOutcome {
    fn failed(stderr: String, started: Instant) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr,
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }
}

/// Local-process execution collaborator. Writes the buffer to a scratch
/// workspace, invokes the language's toolchain and captures the output.
/// Callers must not hold any room lock across `execute`.
pub struct ExecService {
    exec_timeout: Duration,
    work_dir: PathBuf,
}

impl ExecService {
    pub fn new(config: &Config) -> Self {
        Self {
            exec_timeout: config.exec_timeout(),
            work_dir: config.exec_work_dir(),
        }
    }

    /// Run `code` as `language` with `stdin` piped to the process
    pub async fn execute(&self, code: &str, language: Language, stdin: &str) -> ExecOutcome {
        let started = Instant::now();
        // One hard ceiling for the whole call; compiled languages share
        // it between the compile and run stages.
        let deadline = tokio::time::Instant::now() + self.exec_timeout;
        let workspace = self
            .work_dir
            .join(format!("pairpad-run-{}", Uuid::new_v4()));

        if let Err(e) = tokio::fs::create_dir_all(&workspace).await {
            error!("Failed to create execution workspace: {}", e);
            return ExecOutcome::failed(format!("failed to create workspace: {}", e), started);
        }

        let source = workspace.join(language.source_file_name());
        if let Err(e) = tokio::fs::write(&source, code).await {
            error!("Failed to write source file: {}", e);
            cleanup(&workspace).await;
            return ExecOutcome::failed(format!("failed to write source: {}", e), started);
        }

        // Compiled languages get a separate compile stage; a compile
        // failure is reported as the run's stderr.
        if let Some(mut compile) = compile_command(language) {
            match timeout_at(deadline, compile.current_dir(&workspace).output()).await {
                Ok(Ok(out)) if !out.status.success() => {
                    let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                    debug!(language = %language, "Compilation failed");
                    cleanup(&workspace).await;
                    return ExecOutcome::failed(stderr, started);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    warn!(language = %language, "Compiler unavailable: {}", e);
                    cleanup(&workspace).await;
                    return ExecOutcome::failed(format!("compiler unavailable: {}", e), started);
                }
                Err(_) => {
                    cleanup(&workspace).await;
                    return ExecOutcome::failed("compilation timed out".to_string(), started);
                }
            }
        }

        let mut run = run_command(language);
        run.current_dir(&workspace)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match run.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(language = %language, "Runtime unavailable: {}", e);
                cleanup(&workspace).await;
                return ExecOutcome::failed(format!("runtime unavailable: {}", e), started);
            }
        };

        if let Some(mut child_stdin) = child.stdin.take() {
            if let Err(e) = child_stdin.write_all(stdin.as_bytes()).await {
                debug!("Failed to pipe stdin to child: {}", e);
            }
            // Dropping the handle closes the pipe so readers see EOF
        }

        // kill_on_drop reaps the child when the timeout discards the
        // wait future.
        let outcome = match timeout_at(deadline, child.wait_with_output()).await {
            Ok(Ok(out)) => ExecOutcome {
                success: out.status.success(),
                stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
                duration_ms: started.elapsed().as_millis() as u64,
            },
            Ok(Err(e)) => ExecOutcome::failed(format!("execution failed: {}", e), started),
            Err(_) => ExecOutcome::failed(
                format!(
                    "execution timed out after {} seconds",
                    self.exec_timeout.as_secs()
                ),
                started,
            ),
        };

        cleanup(&workspace).await;
        info!(
            language = %language,
            success = outcome.success,
            duration_ms = outcome.duration_ms,
            "Execution finished"
        );
        outcome
    }
}

fn compile_command(language: Language) -> Option<Command> {
    let mut cmd = match language {
        Language::C => {
            let mut cmd = Command::new("gcc");
            cmd.args([language.source_file_name(), "-o", "main"]);
            cmd
        }
        Language::Cpp => {
            let mut cmd = Command::new("g++");
            cmd.args([language.source_file_name(), "-o", "main"]);
            cmd
        }
        Language::Java => {
            let mut cmd = Command::new("javac");
            cmd.arg(language.source_file_name());
            cmd
        }
        Language::Javascript | Language::Typescript | Language::Python => return None,
    };
    // A compile that outlives its timeout must die with the dropped
    // output future, same as the run stage.
    cmd.kill_on_drop(true);
    Some(cmd)
}

fn run_command(language: Language) -> Command {
    match language {
        Language::Javascript => {
            let mut cmd = Command::new("node");
            cmd.arg(language.source_file_name());
            cmd
        }
        Language::Typescript => {
            let mut cmd = Command::new("ts-node");
            cmd.arg(language.source_file_name());
            cmd
        }
        Language::Python => {
            let mut cmd = Command::new("python3");
            cmd.arg(language.source_file_name());
            cmd
        }
        Language::C | Language::Cpp => Command::new("./main"),
        Language::Java => {
            let mut cmd = Command::new("java");
            cmd.arg("Main");
            cmd
        }
    }
}

async fn cleanup(workspace: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(workspace).await {
        debug!("Failed to remove execution workspace: {}", e);
    }
}
