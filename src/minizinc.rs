//! MiniZinc command-line adapter.
//!
//! Writes the template and instance into a scratch directory, runs
//! `minizinc --json-stream` (directly or inside a Docker image) and turns
//! its JSON-lines output into [`SolverEvent`]s.

use std::env;
use std::fs;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::SolverError;
use crate::model::ModelInstance;
use crate::stream::{SolutionStream, SolverEvent, SolverStatus};
use crate::template::ModelTemplate;
use crate::traits::ConstraintSolver;

const MODEL_FILE: &str = "model.mzn";
const DATA_FILE: &str = "instance.json";

#[derive(Debug, Clone)]
pub struct MiniZincConfig {
    /// MiniZinc executable (inside the image when `docker_image` is set).
    pub program: String,
    /// Backend solver id passed to `--solver`.
    pub solver: String,
    /// Run through `docker run <image>` instead of a local install.
    pub docker_image: Option<String>,
    /// Wall-clock limit enforced on our side.
    pub timeout_secs: u64,
    /// Limit passed to MiniZinc as `--time-limit`, letting it stop cleanly
    /// with its best solution.
    pub time_limit_ms: Option<u64>,
    pub extra_args: Vec<String>,
}

impl Default for MiniZincConfig {
    fn default() -> Self {
        Self {
            program: "minizinc".to_string(),
            solver: "gecode".to_string(),
            docker_image: None,
            timeout_secs: 60,
            time_limit_ms: None,
            extra_args: Vec::new(),
        }
    }
}

impl MiniZincConfig {
    /// Defaults overridden by `MINIZINC_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(program) = env::var("MINIZINC_BIN") {
            config.program = program;
        }
        if let Ok(solver) = env::var("MINIZINC_SOLVER") {
            config.solver = solver;
        }
        if let Ok(image) = env::var("MINIZINC_DOCKER_IMAGE") {
            config.docker_image = Some(image).filter(|i| !i.is_empty());
        }
        if let Some(secs) = env::var("MINIZINC_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()) {
            config.timeout_secs = secs;
        }
        if let Some(ms) = env::var("MINIZINC_TIME_LIMIT_MS").ok().and_then(|v| v.parse().ok()) {
            config.time_limit_ms = Some(ms);
        }
        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MiniZincSolver {
    config: MiniZincConfig,
}

impl MiniZincSolver {
    pub fn new(config: MiniZincConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MiniZincConfig {
        &self.config
    }

    /// Program and arguments for a run in `work_dir`.
    pub fn command_line(&self, work_dir: &Path) -> (String, Vec<String>) {
        let mut minizinc = vec![
            "--solver".to_string(),
            self.config.solver.clone(),
            "--json-stream".to_string(),
            "--output-mode".to_string(),
            "json".to_string(),
        ];
        if let Some(ms) = self.config.time_limit_ms {
            minizinc.push("--time-limit".to_string());
            minizinc.push(ms.to_string());
        }
        minizinc.extend(self.config.extra_args.iter().cloned());
        minizinc.push(MODEL_FILE.to_string());
        minizinc.push(DATA_FILE.to_string());

        match &self.config.docker_image {
            None => (self.config.program.clone(), minizinc),
            Some(image) => {
                let mut args = vec![
                    "run".to_string(),
                    "--rm".to_string(),
                    "-i".to_string(),
                    "-v".to_string(),
                    format!("{}:/work", work_dir.display()),
                    "-w".to_string(),
                    "/work".to_string(),
                    image.clone(),
                    self.config.program.clone(),
                ];
                args.extend(minizinc);
                ("docker".to_string(), args)
            }
        }
    }
}

impl ConstraintSolver for MiniZincSolver {
    fn submit(
        &self,
        template: &ModelTemplate,
        instance: &ModelInstance,
    ) -> Result<SolutionStream, SolverError> {
        let work_dir = tempfile::tempdir()?;
        fs::write(work_dir.path().join(MODEL_FILE), &template.text)?;
        let data = instance
            .to_json()
            .map_err(|err| SolverError::MalformedResponse(format!("unencodable instance: {}", err)))?;
        fs::write(work_dir.path().join(DATA_FILE), data)?;

        let (program, args) = self.command_line(work_dir.path());
        info!(%program, ?args, template = %template.name, edges = instance.num_edges, "starting solver");

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(work_dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| SolverError::Spawn {
                program: program.clone(),
                source,
            })?;

        let stdout = child.stdout.take().ok_or(SolverError::Disconnected)?;
        let stderr = child.stderr.take();
        let child = Arc::new(Mutex::new(child));

        let (tx, stream) = SolutionStream::channel(Some(self.config.timeout()));

        let stderr_reader = thread::spawn(move || {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text);
            }
            text
        });

        let reader_child = Arc::clone(&child);
        thread::spawn(move || {
            let outcome = pump(BufReader::new(stdout), &tx);
            if !matches!(outcome, Ok(ref o) if !o.hung_up) {
                kill(&reader_child);
            }
            let failed_exit = reap(&reader_child)
                .filter(|status| !status.success())
                .map(|status| status.code());
            let stderr = stderr_reader.join().unwrap_or_default();
            let _ = tx.send(finish(outcome, failed_exit, stderr));
            // scratch files stay until the solver is gone
            drop(work_dir);
        });

        Ok(stream.with_cancel(move || kill(&child)))
    }
}

fn kill(child: &Mutex<Child>) {
    // a docker client going away does not stop its container; time_limit_ms bounds that case
    if let Ok(mut child) = child.lock() {
        let _ = child.kill();
    }
}

/// Waits for exit without holding the lock, so a cancel can still get in.
fn reap(child: &Mutex<Child>) -> Option<ExitStatus> {
    loop {
        let polled = child.lock().ok()?.try_wait();
        match polled {
            Ok(Some(status)) => return Some(status),
            Ok(None) => thread::sleep(Duration::from_millis(10)),
            Err(_) => return None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamMessage {
    Solution {
        output: SolutionOutput,
    },
    Status {
        status: String,
    },
    Error {
        #[serde(default)]
        what: String,
        #[serde(default)]
        message: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SolutionOutput {
    json: Option<SolutionJson>,
}

#[derive(Debug, Deserialize)]
struct SolutionJson {
    x: Vec<u8>,
}

/// What was seen on stdout before it closed.
#[derive(Debug, Default, PartialEq)]
struct PumpOutcome {
    status: Option<SolverStatus>,
    solutions: usize,
    errors: Vec<String>,
    /// The stream consumer went away before stdout closed.
    hung_up: bool,
}

/// Forwards solutions as they arrive; returns once stdout closes or the
/// consumer hangs up.
fn pump<R: BufRead>(
    reader: R,
    tx: &Sender<Result<SolverEvent, SolverError>>,
) -> Result<PumpOutcome, SolverError> {
    let mut outcome = PumpOutcome::default();

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let message: StreamMessage = serde_json::from_str(&line)
            .map_err(|err| SolverError::MalformedResponse(format!("{}: {}", err, line)))?;

        match message {
            StreamMessage::Solution { output } => {
                let json = output.json.ok_or_else(|| {
                    SolverError::MalformedResponse("solution without json output".to_string())
                })?;
                outcome.solutions += 1;
                debug!(solution = outcome.solutions, "received solution");
                if tx.send(Ok(SolverEvent::Solution(json.x))).is_err() {
                    outcome.hung_up = true;
                    break;
                }
            }
            StreamMessage::Status { status } => {
                let parsed = SolverStatus::from_minizinc(&status).ok_or_else(|| {
                    SolverError::MalformedResponse(format!("unknown status `{}`", status))
                })?;
                outcome.status = Some(parsed);
            }
            StreamMessage::Error { what, message } => {
                warn!(%what, %message, "solver reported an error");
                outcome.errors.push(format!("{}: {}", what, message));
            }
            StreamMessage::Other => {}
        }
    }

    Ok(outcome)
}

/// Final stream item from what stdout said and how the process ended.
fn finish(
    outcome: Result<PumpOutcome, SolverError>,
    failed_exit: Option<Option<i32>>,
    stderr: String,
) -> Result<SolverEvent, SolverError> {
    let outcome = outcome?;

    let status = match (outcome.status, failed_exit) {
        (Some(status), _) => status,
        (None, _) if !outcome.errors.is_empty() => SolverStatus::Error,
        (None, Some(code)) => return Err(SolverError::Process { code, stderr }),
        // stopped by --time-limit after finding something
        (None, None) if outcome.solutions > 0 => SolverStatus::Satisfied,
        (None, None) => SolverStatus::Unknown,
    };

    info!(?status, solutions = outcome.solutions, "solver finished");
    Ok(SolverEvent::Completed(status))
}
