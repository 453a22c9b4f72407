//! Process-level layer dispatch.
//!
//! Each layer runs in its own `extract-layer` child process so a crash or a
//! runaway query in one layer cannot take down the run. A fixed number of
//! scoped threads pull layers off a shared queue and wait on their child.

use std::ffi::OsString;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use osmlayers_core::{BoundaryJob, LayerConfig, LayerDispatch, LayerOutcome};

use crate::{ARG_BOUNDARY, ARG_LAYER, ARG_OUTPUT_PATH, WORKER_SUBCOMMAND};

type Job = (usize, &'static LayerConfig);

/// Runs layers in child processes of `program`.
#[derive(Debug, Clone)]
pub(crate) struct ProcessDispatch {
    program: PathBuf,
    workers: NonZeroUsize,
    worker_args: Vec<OsString>,
}

impl ProcessDispatch {
    /// `worker_args` are appended to every child command line.
    pub(crate) const fn new(
        program: PathBuf,
        workers: NonZeroUsize,
        worker_args: Vec<OsString>,
    ) -> Self {
        Self {
            program,
            workers,
            worker_args,
        }
    }

    fn command(&self, job: &BoundaryJob<'_>, layer: &LayerConfig) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(WORKER_SUBCOMMAND)
            .arg(format!("--{ARG_BOUNDARY}"))
            .arg(job.path)
            .arg(format!("--{ARG_LAYER}"))
            .arg(layer.name)
            .arg(format!("--{ARG_OUTPUT_PATH}"))
            .arg(job.output_root)
            .args(&self.worker_args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit());
        command
    }

    fn run_child(&self, job: &BoundaryJob<'_>, layer: &LayerConfig) -> LayerOutcome {
        let output = match self.command(job, layer).output() {
            Ok(output) => output,
            Err(err) => {
                return LayerOutcome::Failed {
                    reason: format!("failed to start worker: {err}"),
                };
            }
        };
        if !output.status.success() {
            return LayerOutcome::Failed {
                reason: format!("worker exited with {}", output.status),
            };
        }
        parse_worker_output(&output.stdout).unwrap_or_else(|reason| LayerOutcome::Failed { reason })
    }
}

impl LayerDispatch for ProcessDispatch {
    fn dispatch(&self, job: &BoundaryJob<'_>, layers: &[&'static LayerConfig]) -> Vec<LayerOutcome> {
        let (job_tx, job_rx) = mpsc::channel::<Job>();
        for job_entry in layers.iter().copied().enumerate() {
            if job_tx.send(job_entry).is_err() {
                break;
            }
        }
        drop(job_tx);
        let queue = Mutex::new(job_rx);
        let (result_tx, result_rx) = mpsc::channel();
        let workers = self.workers.get().min(layers.len());

        thread::scope(|scope| {
            for _ in 0..workers {
                let result_tx = result_tx.clone();
                let queue = &queue;
                scope.spawn(move || {
                    while let Some((index, layer)) = next_job(queue) {
                        let outcome = self.run_child(job, layer);
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(result_tx);

        let mut outcomes: Vec<Option<LayerOutcome>> = vec![None; layers.len()];
        for (index, outcome) in result_rx {
            if let Some(slot) = outcomes.get_mut(index) {
                *slot = Some(outcome);
            }
        }
        outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| LayerOutcome::Failed {
                    reason: "worker did not report an outcome".to_owned(),
                })
            })
            .collect()
    }
}

fn next_job(queue: &Mutex<Receiver<Job>>) -> Option<Job> {
    queue.lock().ok()?.recv().ok()
}

/// Parse the outcome a worker printed as its last non-empty stdout line.
pub(crate) fn parse_worker_output(stdout: &[u8]) -> Result<LayerOutcome, String> {
    let text = String::from_utf8_lossy(stdout);
    let line = text
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| "worker produced no outcome".to_owned())?;
    serde_json::from_str(line.trim())
        .map_err(|err| format!("worker outcome {line:?} is not valid: {err}"))
}
