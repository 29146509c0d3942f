// src/producer.rs
use crate::types::NescError;
use log::{debug, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

/// Outcome of a producer run: `Ok` at end of input, otherwise the reason it stopped.
pub type TerminalStatus = Result<(), NescError>;

/// Streams wordlist labels into the candidate queue.
pub struct Producer {
    wordlist: PathBuf,
    sender: mpsc::Sender<String>,
    cancel: CancellationToken,
    produced: Arc<AtomicUsize>,
}

impl Producer {
    pub fn new(
        wordlist: PathBuf,
        sender: mpsc::Sender<String>,
        cancel: CancellationToken,
        produced: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            wordlist,
            sender,
            cancel,
            produced,
        }
    }

    /// Runs to completion and writes the terminal status exactly once.
    ///
    /// The candidate sender is dropped before the status is written, which
    /// closes the queue for the workers.
    pub async fn run(self, status: oneshot::Sender<TerminalStatus>) {
        let result = self.produce().await;
        drop(self.sender);
        match &result {
            Ok(()) => debug!("Wordlist {} fully read", self.wordlist.display()),
            Err(e) => debug!("Wordlist reader stopped: {}", e),
        }
        if status.send(result).is_err() {
            warn!("Terminal status dropped: nobody is waiting for the wordlist reader");
        }
    }

    async fn produce(&self) -> TerminalStatus {
        let file = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(NescError::Cancelled),
            file = File::open(&self.wordlist) => file.map_err(|e| self.io_error(e))?,
        };
        self.feed(BufReader::new(file)).await
    }

    pub(crate) async fn feed<R>(&self, reader: R) -> TerminalStatus
    where
        R: AsyncBufRead + Unpin,
    {
        let mut segments = reader.split(b'\n');
        loop {
            let segment = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(NescError::Cancelled),
                segment = segments.next_segment() => segment.map_err(|e| self.io_error(e))?,
            };

            let Some(segment) = segment else {
                return Ok(());
            };

            // A label that is not UTF-8 cannot form a hostname; skip it and keep reading.
            let line = match String::from_utf8(segment) {
                Ok(line) => line,
                Err(e) => {
                    debug!("Skipping wordlist line that is not valid UTF-8: {}", e);
                    continue;
                }
            };

            let label = line.trim();
            if label.is_empty() {
                continue;
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(NescError::Cancelled),
                sent = self.sender.send(label.to_string()) => {
                    if sent.is_err() {
                        // Every worker is gone.
                        return if self.cancel.is_cancelled() {
                            Err(NescError::Cancelled)
                        } else {
                            Ok(())
                        };
                    }
                }
            }
            self.produced.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn io_error(&self, source: std::io::Error) -> NescError {
        NescError::WordlistIo {
            path: self.wordlist.display().to_string(),
            source,
        }
    }
}
