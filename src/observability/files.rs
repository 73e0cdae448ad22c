//! Owner-only, append-only log files.
//!
//! # Responsibilities
//! - Create log directories `0700` and files `0600`
//! - Tighten looser existing permissions, never loosen
//! - Append one line per entry from a background task
//!
//! # Design Decisions
//! - Callers hand lines to an unbounded channel and return immediately
//! - One writer task per file; each line is a single `write_all`, so entries
//!   never interleave
//! - Write failures are reported through a hook and the handle is reopened on
//!   the next entry

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Directory mode: owner read/write/execute.
pub const DIR_MODE: u32 = 0o700;

/// File mode: owner read/write.
pub const FILE_MODE: u32 = 0o600;

/// Called from the writer task when an append fails.
pub type FailureHook = Arc<dyn Fn(&Path, &io::Error) + Send + Sync>;

/// Create `dir` and `dir/file_name` with owner-only permissions.
pub fn prepare_log_file(dir: &Path, file_name: &str) -> io::Result<PathBuf> {
    create_private_dir(dir)?;
    let path = dir.join(file_name);

    let mut options = std::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(FILE_MODE);
    }
    options.open(&path)?;
    tighten_permissions(&path, FILE_MODE)?;

    Ok(path)
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIR_MODE);
    }
    builder.create(dir)?;
    tighten_permissions(dir, DIR_MODE)
}

/// Clear any permission bits outside `max_mode`. Never adds bits.
#[cfg(unix)]
pub fn tighten_permissions(path: &Path, max_mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let current = std::fs::metadata(path)?.permissions().mode() & 0o777;
    let tightened = current & max_mode;
    if tightened != current {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(tightened))?;
    }
    Ok(())
}

#[cfg(not(unix))]
pub fn tighten_permissions(_path: &Path, _max_mode: u32) -> io::Result<()> {
    Ok(())
}

enum WriterCommand {
    Append(String),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget line appender backed by a tokio task.
#[derive(Clone)]
pub struct AppendWriter {
    tx: mpsc::UnboundedSender<WriterCommand>,
    path: Arc<PathBuf>,
}

impl AppendWriter {
    /// Prepare `dir/file_name` and start the writer task.
    ///
    /// Fails when the directory or file cannot be created, or when called
    /// outside a tokio runtime.
    pub fn open(dir: &Path, file_name: &str, on_failure: Option<FailureHook>) -> io::Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(io::Error::other)?;
        let path = prepare_log_file(dir, file_name)?;
        let (tx, rx) = mpsc::unbounded_channel();

        handle.spawn(run_writer(path.clone(), rx, on_failure));

        Ok(Self {
            tx,
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queue one line. Never blocks; a trailing newline is added.
    pub fn append(&self, mut line: String) {
        line.push('\n');
        if self.tx.send(WriterCommand::Append(line)).is_err() {
            tracing::error!(path = %self.path.display(), "Log writer stopped, entry dropped");
        }
    }

    /// Wait until every line queued before this call has been written.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(WriterCommand::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn run_writer(
    path: PathBuf,
    mut rx: mpsc::UnboundedReceiver<WriterCommand>,
    on_failure: Option<FailureHook>,
) {
    let mut file: Option<tokio::fs::File> = None;

    while let Some(command) = rx.recv().await {
        match command {
            WriterCommand::Append(line) => {
                if file.is_none() {
                    match open_append(&path).await {
                        Ok(f) => file = Some(f),
                        Err(e) => {
                            report_failure(&path, &e, on_failure.as_ref());
                            continue;
                        }
                    }
                }
                if let Some(f) = file.as_mut() {
                    if let Err(e) = f.write_all(line.as_bytes()).await {
                        report_failure(&path, &e, on_failure.as_ref());
                        file = None;
                    }
                }
            }
            WriterCommand::Flush(done) => {
                if let Some(f) = file.as_mut() {
                    if let Err(e) = f.flush().await {
                        report_failure(&path, &e, on_failure.as_ref());
                    }
                }
                let _ = done.send(());
            }
        }
    }
}

async fn open_append(path: &Path) -> io::Result<tokio::fs::File> {
    let mut options = tokio::fs::OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    options.mode(FILE_MODE);
    options.open(path).await
}

fn report_failure(path: &Path, error: &io::Error, hook: Option<&FailureHook>) {
    super::metrics::record_log_write_failure();
    match hook {
        Some(hook) => hook(path, error),
        None => tracing::error!(path = %path.display(), error = %error, "Failed to append log entry"),
    }
}
