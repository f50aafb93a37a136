//! JSONL persistence of intermediate run states.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use factcheck_types::{ExecutionError, State};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::observer::{StageEvent, StageObserver};

/// One line of a run record file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub index: usize,
    pub solver: String,
    #[serde(rename = "continue")]
    pub proceed: bool,
    pub state: State,
    pub recorded_at: DateTime<Utc>,
}

/// Appends a [`RunRecord`] per stage to `<dir>/<sample_name>.jsonl`.
#[derive(Debug, Clone)]
pub struct JsonlRecorder {
    dir: PathBuf,
}

impl JsonlRecorder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, sample_name: &str) -> PathBuf {
        self.dir.join(format!("{sample_name}.jsonl"))
    }

    /// Read back every record of a sample, in stage order.
    pub fn read(&self, sample_name: &str) -> Result<Vec<RunRecord>, ExecutionError> {
        let path = self.path_for(sample_name);
        let file = fs::File::open(&path).map_err(|e| io_error(&path, e))?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| io_error(&path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            let record = serde_json::from_str(&line).map_err(|e| {
                ExecutionError::Recording(format!("{}: {e}", path.display()))
            })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Delete a sample's record file. Missing files are not an error.
    pub fn remove(&self, sample_name: &str) -> Result<(), ExecutionError> {
        let path = self.path_for(sample_name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    fn append(&self, sample_name: &str, record: &RunRecord) -> Result<(), ExecutionError> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let path = self.path_for(sample_name);
        let line = serde_json::to_string(record)
            .map_err(|e| ExecutionError::Recording(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(&path, e))?;
        writeln!(file, "{line}").map_err(|e| io_error(&path, e))?;
        debug!(path = %path.display(), index = record.index, "Recorded stage");
        Ok(())
    }
}

impl StageObserver for JsonlRecorder {
    fn on_stage(&self, event: &StageEvent<'_>) -> Result<(), ExecutionError> {
        let record = RunRecord {
            index: event.index,
            solver: event.solver.to_string(),
            proceed: event.flow.is_continue(),
            state: event.state.clone(),
            recorded_at: Utc::now(),
        };
        self.append(&event.ctx.sample_name, &record)
    }
}

fn io_error(path: &Path, err: std::io::Error) -> ExecutionError {
    ExecutionError::Recording(format!("{}: {err}", path.display()))
}
