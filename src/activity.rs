//! Append-only activity log of channel traffic.
//!
//! One record per line: `timestamp\tsender\ttext\n`. The file is opened for
//! append on every call and closed afterwards so external rotation or
//! truncation between calls is picked up. A single async mutex spans the
//! open-write-close sequence; each line goes out in one `write_all`, so
//! concurrent callers never interleave partial lines.

use crate::normalize_line;

use tokio::io::AsyncWriteExt as _;
use tokio::sync::Mutex;

use std::path::{Path, PathBuf};

/// Serialized writer for the activity log file.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ActivityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record stamped with the current time. The stamp is taken
    /// under the write lock, so file order and timestamps agree.
    ///
    /// Failures are logged here; callers are free to ignore the returned
    /// error since a missed record never blocks message relay.
    pub async fn append(&self, sender: &str, text: &str) -> crate::Result<()> {
        let _guard = self.write_lock.lock().await;
        let line = format_record(&format_timestamp(chrono::Utc::now()), sender, text);
        self.write_locked(&line).await
    }

    /// Append one record stamped with the time its message was received.
    pub async fn append_at(
        &self,
        received_at: chrono::DateTime<chrono::Utc>,
        sender: &str,
        text: &str,
    ) -> crate::Result<()> {
        let line = format_record(&format_timestamp(received_at), sender, text);
        let _guard = self.write_lock.lock().await;
        self.write_locked(&line).await
    }

    /// Caller must hold `write_lock`.
    async fn write_locked(&self, line: &str) -> crate::Result<()> {
        if let Err(error) = self.write_line(line).await {
            tracing::error!(path = %self.path.display(), %error, "failed to write activity log");
            return Err(error.into());
        }
        Ok(())
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

/// Render a log line. Tabs inside fields would break the column layout, so
/// they are replaced along with line breaks.
fn format_record(timestamp: &str, sender: &str, text: &str) -> String {
    let sender = normalize_line(sender).replace('\t', " ");
    let text = normalize_line(text).replace('\t', " ");
    format!("{timestamp}\t{sender}\t{text}\n")
}
