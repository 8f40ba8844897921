//! JSONL file writer for trace entries.
//!
//! Each [`TraceEntry`] becomes one JSON line carrying its `type` tag, the
//! RFC3339 `timestamp` it was appended at, and the `context` path of the
//! context that recorded it.

use agentctx_application::TraceSink;
use agentctx_domain::{RunOutcome, TraceEntry};
use serde_json::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlTraceWriter {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlTraceWriter {
    /// Create a writer for the given path.
    ///
    /// Creates the file (and parent directories) if they don't exist.
    /// Returns `None` if the file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create trace directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match File::create(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not create trace file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a `run_outcome` line.
    pub fn write_outcome(&self, outcome: &RunOutcome) {
        let Ok(Value::Object(mut map)) = serde_json::to_value(outcome) else {
            return;
        };
        map.insert("type".to_string(), Value::String("run_outcome".to_string()));
        map.insert(
            "duration_ms".to_string(),
            Value::from(outcome.duration_ms()),
        );
        self.write_line(&Value::Object(map));
    }

    fn write_line(&self, record: &Value) {
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
        }
    }
}

impl TraceSink for JsonlTraceWriter {
    fn write_entry(&self, context_path: &str, entry: &TraceEntry) {
        let Ok(Value::Object(mut map)) = serde_json::to_value(entry) else {
            return;
        };
        map.insert(
            "context".to_string(),
            Value::String(context_path.to_string()),
        );
        self.write_line(&Value::Object(map));
    }

    fn flush(&self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlTraceWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentctx_application::{ExecutionContext, RunConfig, export_tree};
    use agentctx_domain::{TerminationReason, TraceEvent};
    use std::time::Duration;

    fn read_lines(path: &Path) -> Vec<Value> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_writes_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.trace.jsonl");
        let writer = JsonlTraceWriter::new(&path).unwrap();

        let ctx = ExecutionContext::new("root", RunConfig::default());
        ctx.start_iteration();
        ctx.record_model_call("test-model", 120, 30, Duration::from_millis(40), None);
        let child = ctx.spawn_child("sub", None);
        child.trace(TraceEvent::Custom {
            name: "note".into(),
            data: serde_json::json!({"k": 1}),
        });

        assert_eq!(export_tree(&ctx, &writer), 4);
        ctx.set_termination(TerminationReason::Completed, None, None);
        writer.write_outcome(&ctx.outcome().unwrap());
        drop(writer);

        let lines = read_lines(&path);
        assert_eq!(lines.len(), 5);
        for line in &lines {
            assert!(line.get("type").is_some());
        }
        for line in &lines[..4] {
            let stamp = line["timestamp"].as_str().unwrap();
            assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        }

        assert_eq!(lines[1]["type"], "model_call");
        assert_eq!(lines[1]["model"], "test-model");
        assert_eq!(lines[1]["context"], "root");
        assert_eq!(lines[3]["type"], "custom");
        assert_eq!(lines[3]["context"], "root/sub");
        assert_eq!(lines[3]["depth"], 1);
        assert_eq!(lines[4]["type"], "run_outcome");
        assert_eq!(lines[4]["reason"], "completed");
    }

    #[test]
    fn test_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("t.jsonl");
        let writer = JsonlTraceWriter::new(&path).unwrap();
        assert_eq!(writer.path(), path.as_path());
        assert!(path.exists());
    }
}
