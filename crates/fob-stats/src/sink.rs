//! Destinations for finished snapshots.
//!
//! A sink takes ownership of a snapshot and is responsible for delivering it.
//! `dispatch` returns nothing: the observer never sees the outcome, so a sink
//! that can fail reports the failure itself.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::snapshot::BuildSnapshot;
use crate::{Error, Result};

/// Receives one snapshot per build.
pub trait SnapshotSink: Send + Sync {
    /// Hand off a snapshot. Must not block the build.
    fn dispatch(&self, snapshot: BuildSnapshot);
}

impl<F> SnapshotSink for F
where
    F: Fn(BuildSnapshot) + Send + Sync,
{
    fn dispatch(&self, snapshot: BuildSnapshot) {
        self(snapshot)
    }
}

/// Discards every snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl SnapshotSink for NoopSink {
    fn dispatch(&self, _snapshot: BuildSnapshot) {}
}

/// Logs each snapshot as a `tracing` event at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn dispatch(&self, snapshot: BuildSnapshot) {
        match serde_json::to_string(&snapshot) {
            Ok(record) => tracing::info!(target: "fob_stats::snapshot", %record, "build stats"),
            Err(error) => tracing::warn!(%error, "failed to serialize build stats"),
        }
    }
}

/// Keeps snapshots in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    snapshots: Mutex<Vec<BuildSnapshot>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.lock().is_empty()
    }

    /// Most recent snapshot, if any.
    pub fn last(&self) -> Option<BuildSnapshot> {
        self.snapshots.lock().last().cloned()
    }

    /// Remove and return everything collected so far.
    pub fn take(&self) -> Vec<BuildSnapshot> {
        std::mem::take(&mut *self.snapshots.lock())
    }
}

impl SnapshotSink for MemorySink {
    fn dispatch(&self, snapshot: BuildSnapshot) {
        self.snapshots.lock().push(snapshot);
    }
}

/// Forwards snapshots to an async consumer over an unbounded channel.
///
/// Sending never waits, so the build is not held up by whatever the
/// receiving task does with the record.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<BuildSnapshot>,
}

impl ChannelSink {
    /// Create a sink and the receiver a delivery task should drain.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BuildSnapshot>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    pub fn from_sender(sender: mpsc::UnboundedSender<BuildSnapshot>) -> Self {
        Self { sender }
    }
}

impl SnapshotSink for ChannelSink {
    fn dispatch(&self, snapshot: BuildSnapshot) {
        if self.sender.send(snapshot).is_err() {
            tracing::warn!("build stats receiver closed, snapshot dropped");
        }
    }
}

/// Appends each snapshot to a file as one line of JSON.
///
/// Records are queued to a dedicated writer thread, so `dispatch` never
/// touches the filesystem. Dropping the sink drains the queue and waits for
/// the writer to finish.
pub struct JsonLinesSink {
    path: PathBuf,
    sender: Option<mpsc::UnboundedSender<WriterCommand>>,
    writer: Option<JoinHandle<()>>,
}

enum WriterCommand {
    Append(BuildSnapshot),
    Flush(std_mpsc::SyncSender<()>),
}

impl JsonLinesSink {
    /// Create a sink writing to `path`, creating parent directories.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| Error::IoError {
                message: format!("Failed to create stats directory '{}'", parent.display()),
                source,
            })?;
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let writer_path = path.clone();
        let writer = thread::Builder::new()
            .name("fob-stats-writer".into())
            .spawn(move || run_writer(&writer_path, receiver))
            .map_err(|source| Error::IoError {
                message: "Failed to start the stats writer thread".into(),
                source,
            })?;

        Ok(Self {
            path,
            sender: Some(sender),
            writer: Some(writer),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until every snapshot dispatched so far has been written.
    pub fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };

        let (ack, written) = std_mpsc::sync_channel(1);
        if sender.send(WriterCommand::Flush(ack)).is_ok() {
            let _ = written.recv();
        }
    }
}

fn run_writer(path: &Path, mut receiver: mpsc::UnboundedReceiver<WriterCommand>) {
    while let Some(command) = receiver.blocking_recv() {
        match command {
            WriterCommand::Append(snapshot) => {
                if let Err(error) = append_line(path, &snapshot) {
                    tracing::warn!(
                        path = %path.display(),
                        %error,
                        "failed to write build stats"
                    );
                }
            }
            WriterCommand::Flush(ack) => {
                let _ = ack.send(());
            }
        }
    }
}

fn append_line(path: &Path, snapshot: &BuildSnapshot) -> Result<()> {
    let mut line = serde_json::to_vec(snapshot)?;
    line.push(b'\n');

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    Ok(())
}

impl SnapshotSink for JsonLinesSink {
    fn dispatch(&self, snapshot: BuildSnapshot) {
        let queued = self
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(WriterCommand::Append(snapshot)).is_ok());

        if !queued {
            tracing::warn!(
                path = %self.path.display(),
                "build stats writer stopped, snapshot dropped"
            );
        }
    }
}

impl Drop for JsonLinesSink {
    fn drop(&mut self) {
        // Closing the channel lets the writer finish the queue and exit.
        self.sender.take();
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::warn!(path = %self.path.display(), "build stats writer panicked");
            }
        }
    }
}

impl fmt::Debug for JsonLinesSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLinesSink")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactSizes;
    use crate::stats::CompilationStats;
    use serde_json::{Map, Value};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn snapshot(size: u64) -> BuildSnapshot {
        let artifacts: ArtifactSizes = [("main.js", size)].into_iter().collect();
        BuildSnapshot::assemble(&CompilationStats::default(), &artifacts, Map::new())
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemorySink::new();
        sink.dispatch(snapshot(1));
        sink.dispatch(snapshot(2));

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.last().unwrap().bundle_size(), 2);

        let taken = sink.take();
        assert_eq!(taken[0].bundle_size(), 1);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.dispatch(snapshot(9));

        let received = receiver.try_recv().unwrap();
        assert_eq!(received.bundle_size(), 9);
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        sink.dispatch(snapshot(1));
    }

    #[test]
    fn test_json_lines_sink_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats").join("builds.jsonl");
        let sink = JsonLinesSink::create(&path).unwrap();

        sink.dispatch(snapshot(10));
        sink.dispatch(snapshot(20));
        sink.flush();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["bundleSize"], 10);
        assert_eq!(lines[1]["type"], "webpack");
    }

    #[test]
    fn test_json_lines_sink_drop_drains_queue() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("builds.jsonl");
        let sink = JsonLinesSink::create(&path).unwrap();

        for size in 0..50 {
            sink.dispatch(snapshot(size));
        }
        drop(sink);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 50);
    }

    #[test]
    fn test_json_lines_write_failure_stays_in_writer() {
        let dir = TempDir::new().unwrap();
        // A directory at the target path makes every write fail.
        let path = dir.path().join("builds.jsonl");
        std::fs::create_dir(&path).unwrap();
        let sink = JsonLinesSink::create(&path).unwrap();

        sink.dispatch(snapshot(1));
        sink.flush();
        assert!(path.is_dir());
    }

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |snapshot: BuildSnapshot| seen.lock().push(snapshot.bundle_size())
        };

        sink.dispatch(snapshot(3));
        assert_eq!(*seen.lock(), vec![3]);
    }
}
