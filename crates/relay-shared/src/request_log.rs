use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const MESSAGE_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Error)]
pub enum RequestLogError {
    #[error("failed to open request log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to append to request log: {0}")]
    Write(#[from] std::io::Error),
}

/// Append-only, pipe-delimited record of completed chat calls.
///
/// Lines are written whole under a lock, so concurrent handlers never
/// interleave partial records.
#[derive(Debug)]
pub struct RequestLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl RequestLog {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, RequestLogError> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RequestLogError::Open {
                    path: path.clone(),
                    source,
                })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|source| RequestLogError::Open {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn record_chat(
        &self,
        at: DateTime<Utc>,
        caller: &str,
        message: &str,
    ) -> Result<(), RequestLogError> {
        self.append_line(&format_chat_line(at, caller, message)).await
    }

    async fn append_line(&self, line: &str) -> Result<(), RequestLogError> {
        let mut record = String::with_capacity(line.len() + 1);
        record.push_str(line);
        record.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

pub fn format_chat_line(at: DateTime<Utc>, caller: &str, message: &str) -> String {
    format!(
        "{} | {caller} | msg={}",
        at.to_rfc3339_opts(SecondsFormat::Millis, true),
        message_preview(message)
    )
}

fn message_preview(message: &str) -> String {
    message
        .chars()
        .take(MESSAGE_PREVIEW_CHARS)
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .collect()
}
