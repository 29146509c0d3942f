use async_trait::async_trait;
use nesc::config::validate;
use nesc::output::OutputManager;
use nesc::types::OutputFormat;
use nesc::{BruteForceEngine, Config, HostLookup, NescError, Options};
use std::collections::HashMap;
use std::io::Write;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::{NamedTempFile, TempDir};

/// Answers from a fixed table and records every name it was asked for.
#[derive(Default)]
struct TableLookup {
    answers: HashMap<String, Vec<IpAddr>>,
    delay: Duration,
    asked: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl TableLookup {
    fn with_answers(answers: &[(&str, &str)]) -> Self {
        let mut table: HashMap<String, Vec<IpAddr>> = HashMap::new();
        for (name, ip) in answers {
            table.entry(name.to_string()).or_default().push(ip.parse().unwrap());
        }
        Self {
            answers: table,
            ..Self::default()
        }
    }

    fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn asked(&self) -> Vec<String> {
        self.asked.lock().unwrap().clone()
    }
}

#[async_trait]
impl HostLookup for TableLookup {
    async fn lookup_host(&self, name: &str) -> Result<Vec<IpAddr>, NescError> {
        self.asked.lock().unwrap().push(name.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.answers
            .get(name)
            .cloned()
            .ok_or_else(|| NescError::Resolution(format!("Failed to resolve {}: NXDOMAIN", name)))
    }
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap().clone();
        let mut lines: Vec<String> = String::from_utf8(bytes)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn wordlist(lines: &[&str]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn config(wordlist: &NamedTempFile, workers: usize) -> Config {
    validate(Options {
        args: vec!["example.com".to_string()],
        wordlist: wordlist.path().to_path_buf(),
        workers,
        ..Options::default()
    })
    .unwrap()
}

fn engine(config: Config, lookup: Arc<TableLookup>) -> (BruteForceEngine, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let output = OutputManager::with_writer(OutputFormat::Text, Box::new(buffer.clone()));
    (BruteForceEngine::new(config, lookup, Arc::new(output)), buffer)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_blank_lines_are_skipped_and_each_label_tried_once() {
    let words = wordlist(&["www", "mail", "", "  ", "api"]);
    let lookup = Arc::new(TableLookup::with_answers(&[
        ("www.example.com", "93.184.216.34"),
        ("api.example.com", "10.0.0.1"),
        ("api.example.com", "10.0.0.2"),
    ]));
    let (engine, output) = engine(config(&words, 2), lookup.clone());

    let stats = engine.run().await.unwrap();

    let mut asked = lookup.asked();
    asked.sort();
    assert_eq!(asked, vec!["api.example.com", "mail.example.com", "www.example.com"]);
    assert_eq!(stats.candidates, 3);
    assert_eq!(stats.attempted, 3);
    assert_eq!(stats.resolved, 2);
    assert_eq!(
        output.lines(),
        vec!["api.example.com: 10.0.0.1,10.0.0.2", "www.example.com: 93.184.216.34"]
    );
}

#[tokio::test]
async fn test_single_worker_follows_read_order() {
    let words = wordlist(&["www", "mail", "", "  ", "api"]);
    let lookup = Arc::new(TableLookup::default());
    let (engine, output) = engine(config(&words, 1), lookup.clone());

    let stats = engine.run().await.unwrap();

    assert_eq!(
        lookup.asked(),
        vec!["www.example.com", "mail.example.com", "api.example.com"]
    );
    assert_eq!(stats.resolved, 0);
    assert!(output.lines().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_in_flight_lookups_bounded_by_worker_count() {
    let labels: Vec<String> = (0..60).map(|i| format!("host{}", i)).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let words = wordlist(&refs);
    let lookup = Arc::new(TableLookup::default().delayed(Duration::from_millis(5)));
    let (engine, _output) = engine(config(&words, 3), lookup.clone());

    let stats = engine.run().await.unwrap();

    assert_eq!(stats.attempted, 60);
    assert_eq!(lookup.asked().len(), 60);
    let max = lookup.max_in_flight.load(Ordering::SeqCst);
    assert!(max >= 1 && max <= 3, "max in flight was {}", max);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cancellation_stops_run_promptly() {
    let labels: Vec<String> = (0..5_000).map(|i| format!("host{}", i)).collect();
    let refs: Vec<&str> = labels.iter().map(String::as_str).collect();
    let words = wordlist(&refs);
    let lookup = Arc::new(TableLookup::default().delayed(Duration::from_millis(20)));
    let (engine, _output) = engine(config(&words, 4), lookup.clone());
    let token = engine.cancellation_token();

    let started = Instant::now();
    let run = tokio::spawn(engine.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    token.cancel();
    let asked_at_cancel = lookup.asked().len();

    let result = run.await.unwrap();
    assert!(matches!(result, Err(NescError::Cancelled)));
    assert!(started.elapsed() < Duration::from_secs(2));

    // Workers may have been between dequeue and lookup when the token fired.
    assert!(lookup.asked().len() <= asked_at_cancel + 4);
    assert!(lookup.asked().len() < 5_000);
}

#[tokio::test]
async fn test_cancelled_before_start_does_no_lookups() {
    let words = wordlist(&["www", "mail"]);
    let lookup = Arc::new(TableLookup::default());
    let (engine, _output) = engine(config(&words, 2), lookup.clone());
    engine.cancellation_token().cancel();

    let result = engine.run().await;
    assert!(matches!(result, Err(NescError::Cancelled)));
    assert!(lookup.asked().is_empty());
}

#[tokio::test]
async fn test_wordlist_removed_after_validation_is_io_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("words.txt");
    std::fs::write(&path, "www\n").unwrap();
    let config = validate(Options {
        args: vec!["example.com".to_string()],
        wordlist: path.clone(),
        ..Options::default()
    })
    .unwrap();
    std::fs::remove_file(&path).unwrap();

    let lookup = Arc::new(TableLookup::default());
    let (engine, output) = engine(config, lookup.clone());

    let result = engine.run().await;
    assert!(matches!(result, Err(NescError::WordlistIo { .. })));
    assert!(lookup.asked().is_empty());
    assert!(output.lines().is_empty());
}

#[tokio::test]
async fn test_invalid_options_fail_before_any_work() {
    let dir = TempDir::new().unwrap();
    let output = OutputManager::with_writer(OutputFormat::Text, Box::new(SharedBuffer::default()));
    let options = Options {
        args: vec!["example.com".to_string()],
        wordlist: dir.path().join("missing.txt"),
        protocol: "icmp".to_string(),
        ..Options::default()
    };

    let result = nesc::engine::run(options, output).await;
    assert!(matches!(
        result,
        Err(NescError::Config(nesc::ConfigError::InvalidProtocol(_)))
    ));
}
