//! Live tail of a log file that may be rotated or truncated underneath us.
//!
//! A single polling loop: each [`LogTailer::tick`] performs one step of the
//! Idle → Open ⇄ Waiting state machine, and [`LogTailer::follow`] repeats it
//! until cancelled.

use crate::cancel::CancellationToken;
use crate::config::AppConfig;
use crate::error::{Result, ToolError};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Position of the reader in the tracked file. Process-local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailCursor {
    pub path: PathBuf,
    pub offset: u64,
}

impl TailCursor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn reset(&mut self) {
        self.offset = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailState {
    /// Nothing opened yet.
    Idle,
    /// A handle is open at the cursor offset.
    Open,
    /// The file does not exist; waiting for it to appear.
    Waiting,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A complete line was emitted.
    Line,
    /// The file is absent.
    Missing,
    /// No complete line is available yet.
    CaughtUp,
    /// The file shrank below the cursor or was replaced; reading restarts
    /// from offset 0 on the next tick.
    Reset,
}

pub struct LogTailer {
    cursor: TailCursor,
    reader: Option<BufReader<File>>,
    state: TailState,
    poll_interval: Duration,
    line: Vec<u8>,
}

impl LogTailer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            cursor: TailCursor::new(path),
            reader: None,
            state: TailState::Idle,
            poll_interval: AppConfig::TAIL_POLL_INTERVAL,
            line: Vec::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn cursor(&self) -> &TailCursor {
        &self.cursor
    }

    pub fn state(&self) -> TailState {
        self.state
    }

    /// Run one step of the state machine, handing any complete line to
    /// `emit` without its line terminator.
    pub fn tick<F: FnMut(&str)>(&mut self, emit: &mut F) -> Result<TickOutcome> {
        let path = self.cursor.path.clone();
        if !path.exists() {
            return Ok(self.on_missing());
        }

        if self.reader.is_none() {
            match open_at(&path, self.cursor.offset) {
                Ok(reader) => {
                    debug!("Opened {} at offset {}", path.display(), self.cursor.offset);
                    self.reader = Some(reader);
                    self.state = TailState::Open;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Ok(self.on_missing());
                }
                Err(e) => return Err(ToolError::io_with_path(e, &path)),
            }
        }

        let Some(reader) = self.reader.as_mut() else {
            return Ok(TickOutcome::CaughtUp);
        };

        self.line.clear();
        let read = reader
            .read_until(b'\n', &mut self.line)
            .map_err(|e| ToolError::io_with_path(e, &path))?;

        if read > 0 && self.line.ends_with(b"\n") {
            self.cursor.offset += read as u64;
            let text = String::from_utf8_lossy(&self.line);
            emit(text.trim_end_matches('\n').trim_end_matches('\r'));
            return Ok(TickOutcome::Line);
        }

        if read > 0 {
            // Leave a partial trailing line for a later tick.
            reader
                .seek(SeekFrom::Start(self.cursor.offset))
                .map_err(|e| ToolError::io_with_path(e, &path))?;
        }

        let shrank = fs::metadata(&path)
            .map(|meta| meta.len() < self.cursor.offset)
            .unwrap_or(false);
        if shrank || self.replaced(&path) {
            debug!("{} was truncated or rotated; restarting at 0", path.display());
            self.close();
            self.cursor.reset();
            self.state = TailState::Idle;
            return Ok(TickOutcome::Reset);
        }

        Ok(TickOutcome::CaughtUp)
    }

    /// Tail until `token` is cancelled. The handle is released on return.
    pub fn follow<F: FnMut(&str)>(&mut self, token: &CancellationToken, mut emit: F) -> Result<()> {
        let result = loop {
            if token.is_cancelled() {
                break Ok(());
            }
            match self.tick(&mut emit) {
                Ok(TickOutcome::Line) => continue,
                Ok(_) => std::thread::sleep(self.poll_interval),
                Err(e) => break Err(e),
            }
        };
        self.close();
        result
    }

    fn on_missing(&mut self) -> TickOutcome {
        self.close();
        self.cursor.reset();
        self.state = TailState::Waiting;
        TickOutcome::Missing
    }

    fn close(&mut self) {
        self.reader = None;
    }

    /// Whether the path now names a different file than the open handle.
    #[cfg(unix)]
    fn replaced(&self, path: &Path) -> bool {
        use std::os::unix::fs::MetadataExt;

        let Some(reader) = self.reader.as_ref() else {
            return false;
        };
        match (reader.get_ref().metadata(), fs::metadata(path)) {
            (Ok(open), Ok(current)) => open.ino() != current.ino() || open.dev() != current.dev(),
            _ => false,
        }
    }

    #[cfg(not(unix))]
    fn replaced(&self, _path: &Path) -> bool {
        false
    }
}

fn open_at(path: &Path, offset: u64) -> std::io::Result<BufReader<File>> {
    let mut file = File::open(path)?;
    file.seek(SeekFrom::Start(offset))?;
    Ok(BufReader::new(file))
}
