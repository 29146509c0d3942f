use crate::config;
use crate::error::Result;
use crate::output::OutputManager;
use crate::producer::{Producer, TerminalStatus};
use crate::resolver::{subdomain, HostLookup, ResolutionEnvironment};
use crate::types::{Config, EnumerationStats, NescError, Options, ResolutionResult};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type CandidateQueue = Arc<Mutex<mpsc::Receiver<String>>>;

/// Validates `options`, resolves candidates until the wordlist is exhausted
/// and streams hits to `output`. SIGINT and SIGTERM cancel the run.
pub async fn run(options: Options, output: OutputManager) -> Result<EnumerationStats> {
    let config = config::validate(options)?;
    let environment = ResolutionEnvironment::new(&config)?;
    info!(
        "Resolving against {} over {}",
        environment.nameserver(),
        environment.protocol()
    );

    let engine = BruteForceEngine::new(config, Arc::new(environment), Arc::new(output));
    let signals = install_signal_handler(engine.cancellation_token());
    let result = engine.run().await;
    signals.abort();
    result
}

/// Cancels `token` on the first interrupt or terminate notification.
pub fn install_signal_handler(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown().await {
            warn!("Unable to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal, stopping enumeration");
        token.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_shutdown() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result,
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

pub struct BruteForceEngine {
    config: Config,
    lookup: Arc<dyn HostLookup>,
    output: Arc<OutputManager>,
    cancel: CancellationToken,
}

impl BruteForceEngine {
    pub fn new(config: Config, lookup: Arc<dyn HostLookup>, output: Arc<OutputManager>) -> Self {
        Self {
            config,
            lookup,
            output,
            cancel: CancellationToken::new(),
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Starts the wordlist reader and the worker pool, waits for every worker
    /// to finish, then reports the reader's terminal status.
    pub async fn run(self) -> Result<EnumerationStats> {
        let start_time = Instant::now();
        let (sender, receiver) = mpsc::channel(self.config.queue_capacity());
        let (status_tx, status_rx) = oneshot::channel::<TerminalStatus>();
        let produced = Arc::new(AtomicUsize::new(0));

        info!(
            "Enumerating {} with {} workers from {}",
            self.config.domain(),
            self.config.workers(),
            self.config.wordlist().display()
        );

        let producer = Producer::new(
            self.config.wordlist().clone(),
            sender,
            self.cancel.clone(),
            produced.clone(),
        );
        tokio::spawn(producer.run(status_tx));

        let shared = Arc::new(WorkerContext {
            domain: self.config.domain().to_string(),
            lookup: self.lookup.clone(),
            output: self.output.clone(),
            cancel: self.cancel.clone(),
            attempted: AtomicUsize::new(0),
            resolved: AtomicUsize::new(0),
        });
        let queue: CandidateQueue = Arc::new(Mutex::new(receiver));

        let mut workers = FuturesUnordered::new();
        for id in 0..self.config.workers() {
            workers.push(tokio::spawn(worker(id, queue.clone(), shared.clone())));
        }
        drop(queue);

        while let Some(joined) = workers.next().await {
            if let Err(e) = joined {
                error!("Worker task failed: {}", e);
            }
        }

        let status = status_rx.await.map_err(|_| NescError::TerminalStatusLost)?;
        status?;
        if self.cancel.is_cancelled() {
            return Err(NescError::Cancelled);
        }

        let stats = EnumerationStats {
            candidates: produced.load(Ordering::Relaxed),
            attempted: shared.attempted.load(Ordering::Relaxed),
            resolved: shared.resolved.load(Ordering::Relaxed),
            duration: start_time.elapsed(),
        };
        debug!("Run finished: {:?}", stats);
        Ok(stats)
    }
}

/// State every worker reads: the target domain and the shared resolver.
/// Only the counters change.
struct WorkerContext {
    domain: String,
    lookup: Arc<dyn HostLookup>,
    output: Arc<OutputManager>,
    cancel: CancellationToken,
    attempted: AtomicUsize,
    resolved: AtomicUsize,
}

async fn worker(id: usize, queue: CandidateQueue, ctx: Arc<WorkerContext>) {
    loop {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let label = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            label = next_candidate(&queue) => label,
        };
        let Some(label) = label else {
            break;
        };

        let name = subdomain(&label, &ctx.domain);
        let lookup = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            lookup = async {
                ctx.attempted.fetch_add(1, Ordering::Relaxed);
                ctx.lookup.lookup_host(&name).await
            } => lookup,
        };

        match lookup {
            Ok(addresses) if !addresses.is_empty() => {
                ctx.resolved.fetch_add(1, Ordering::Relaxed);
                let result = ResolutionResult::new(name, addresses);
                if let Err(e) = ctx.output.write_result(&result) {
                    warn!("Failed to write result for {}: {}", result.subdomain, e);
                }
            }
            Ok(_) => debug!("{}: no addresses", name),
            // Failed candidates are skipped; the run goes on.
            Err(e) => debug!("{}", e),
        }
    }
    debug!("Worker {} stopped", id);
}

async fn next_candidate(queue: &CandidateQueue) -> Option<String> {
    queue.lock().await.recv().await
}
