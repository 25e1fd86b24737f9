use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::{Config, WatchConfig};
use crate::error::Result;
use crate::ledger::{JsonFileStore, Ledger, Outcome};
use crate::subtitle::{self, SUPPORTED_EXTENSIONS, SubtitleDocument};
use crate::translate::{BatchTranslator, DeepLProvider, TranslationRequestOptions};

/// Pause between scans
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Counts for one pass over the watched directories
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    pub discovered: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl ScanSummary {
    pub fn processed(&self) -> usize {
        self.succeeded + self.failed
    }
}

pub struct Workflow {
    watch: WatchConfig,
    filter: Option<Regex>,
    translator: BatchTranslator,
    ledger: Ledger,
}

impl Workflow {
    pub fn new(config: &Config, translator: BatchTranslator, ledger: Ledger) -> Result<Self> {
        Ok(Self {
            watch: config.watch.clone(),
            filter: config.filename_filter()?,
            translator,
            ledger,
        })
    }

    /// Wire up the DeepL provider and the on-disk ledger
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = DeepLProvider::new(&config.translate)?;
        let translator = BatchTranslator::new(
            Box::new(provider),
            TranslationRequestOptions::from(&config.translate),
        );
        let ledger = Ledger::open(Box::new(JsonFileStore::new(&config.ledger.path)))?;
        info!(
            "Ledger {} holds {} entries",
            config.ledger.path.display(),
            ledger.len()
        );
        Self::new(config, translator, ledger)
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Subtitle files under the watched directories, excluding generated output
    pub fn discover(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        for root in &self.watch.dirs {
            if !root.is_dir() {
                warn!("Watch directory not found: {}", root.display());
                continue;
            }

            for entry in WalkDir::new(root).sort_by_file_name() {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        debug!("Skipping unreadable entry: {}", e);
                        continue;
                    }
                };

                let path = entry.path();
                if !path.is_file() || !self.is_candidate(path) {
                    continue;
                }

                candidates.push(std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf()));
            }
        }

        candidates
    }

    fn is_candidate(&self, path: &Path) -> bool {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };

        let supported = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()));

        if !supported || subtitle::is_generated(file_name) {
            return false;
        }

        self.filter.as_ref().is_none_or(|re| re.is_match(file_name))
    }

    fn should_process(&self, path: &Path) -> bool {
        match self.ledger.outcome(path) {
            None => true,
            Some(Outcome::Error) => self.watch.retry_errors,
            Some(Outcome::Success) => false,
        }
    }

    /// One pass: process every discovered file the ledger has not settled.
    ///
    /// Per-file failures are recorded and do not stop the pass. A ledger write
    /// failure does.
    pub async fn scan_once(&mut self) -> Result<ScanSummary> {
        let candidates = self.discover();
        let mut summary = ScanSummary {
            discovered: candidates.len(),
            ..ScanSummary::default()
        };

        for path in candidates {
            if !self.should_process(&path) {
                continue;
            }

            match self.process_file(&path).await? {
                Outcome::Success => summary.succeeded += 1,
                Outcome::Error => summary.failed += 1,
            }
        }

        debug!("Scan finished: {:?}", summary);
        Ok(summary)
    }

    /// Translate one file and record the outcome in the ledger.
    ///
    /// Only a ledger write failure is returned as an error.
    pub async fn process_file<P: AsRef<Path>>(&mut self, path: P) -> Result<Outcome> {
        let path = path.as_ref();

        let outcome = match self.translate_file(path).await {
            Ok(output) => {
                info!("Translated: {} -> {}", path.display(), output.display());
                Outcome::Success
            }
            Err(e) => {
                error!("Error translating {}: {}", path.display(), e);
                Outcome::Error
            }
        };

        self.ledger.record(path, outcome)?;
        Ok(outcome)
    }

    async fn translate_file(&self, path: &Path) -> Result<PathBuf> {
        let document = SubtitleDocument::load(path).await?;
        let format = document.format();
        let segments = format.parse(&document);
        let texts = subtitle::batch_texts(&segments);

        debug!("{}: {} lines, {} text blocks", path.display(), document.lines().len(), texts.len());

        let translations = self.translator.translate(&texts).await?;
        let content = format.reassemble(&document, &segments, &translations)?;

        let output = subtitle::output_path(path, self.translator.target_language())?;
        fs::write(&output, content).await?;

        Ok(output)
    }

    async fn run_cycle(&mut self) {
        if let Err(e) = self.scan_once().await {
            error!("Scan aborted: {}", e);
        }
    }

    /// Scan, sleep, repeat until the process is terminated
    pub async fn run(&mut self, sleeper: &dyn Sleeper) {
        let interval = Duration::from_secs(self.watch.interval_secs);
        info!(
            "Watching {} directories every {}s",
            self.watch.dirs.len(),
            self.watch.interval_secs
        );

        loop {
            self.run_cycle().await;
            sleeper.sleep(interval).await;
        }
    }

    /// Run exactly `cycles` scan/sleep rounds
    pub async fn run_cycles(&mut self, sleeper: &dyn Sleeper, cycles: usize) {
        let interval = Duration::from_secs(self.watch.interval_secs);
        for _ in 0..cycles {
            self.run_cycle().await;
            sleeper.sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SubwatchError;
    use crate::ledger::{LedgerEntries, LedgerStore, MemoryStore};
    use crate::translate::TranslationProvider;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\nworld\n\n";
    const ASS: &str = "[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,Hello, world\n";

    /// Upper-cases every text; can be switched to fail
    #[derive(Clone, Default)]
    struct FakeProvider {
        calls: Arc<AtomicUsize>,
        failing: Arc<AtomicBool>,
    }

    #[async_trait]
    impl TranslationProvider for FakeProvider {
        async fn translate_batch(
            &self,
            texts: &[String],
            _options: &TranslationRequestOptions,
        ) -> Result<Vec<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(SubwatchError::TranslationProvider("network unreachable".to_string()));
            }
            Ok(texts.iter().map(|t| t.to_uppercase()).collect())
        }
    }

    struct BrokenStore;

    impl LedgerStore for BrokenStore {
        fn load(&self) -> Result<LedgerEntries> {
            Ok(LedgerEntries::new())
        }

        fn save(&self, _entries: &LedgerEntries) -> Result<()> {
            Err(SubwatchError::Persistence("read-only filesystem".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn config(root: &Path) -> Config {
        let mut config = Config::default();
        config.watch.dirs = vec![root.to_path_buf()];
        config.translate.api_key = "test".to_string();
        config
    }

    fn workflow_with(config: &Config, provider: FakeProvider, ledger: Ledger) -> Workflow {
        let translator = BatchTranslator::new(
            Box::new(provider),
            TranslationRequestOptions::from(&config.translate),
        );
        Workflow::new(config, translator, ledger).unwrap()
    }

    #[test]
    fn test_discovery_filters() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();
        temp.child("b.ASS").write_str(ASS).unwrap();
        temp.child("c.txt").write_str("notes").unwrap();
        temp.child("a.GENERATED.th.srt").write_str(SRT).unwrap();
        temp.child("sub").create_dir_all().unwrap();
        temp.child("sub/d.srt").write_str(SRT).unwrap();

        let config = config(temp.path());
        let workflow = workflow_with(&config, FakeProvider::default(), Ledger::in_memory());

        assert_eq!(
            workflow.discover(),
            vec![
                temp.path().join("a.srt"),
                temp.path().join("b.ASS"),
                temp.path().join("sub").join("d.srt"),
            ]
        );
    }

    #[test]
    fn test_discovery_filename_pattern() {
        let temp = TempDir::new().unwrap();
        temp.child("Show.S01E01.srt").write_str(SRT).unwrap();
        temp.child("Extras.srt").write_str(SRT).unwrap();

        let mut config = config(temp.path());
        config.watch.filename_pattern = Some(r"S\d+E\d+".to_string());
        let workflow = workflow_with(&config, FakeProvider::default(), Ledger::in_memory());

        assert_eq!(workflow.discover(), vec![temp.path().join("Show.S01E01.srt")]);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();

        let mut config = config(temp.path());
        config.watch.dirs.insert(0, temp.path().join("gone"));
        let workflow = workflow_with(&config, FakeProvider::default(), Ledger::in_memory());

        assert_eq!(workflow.discover(), vec![temp.path().join("a.srt")]);
    }

    #[tokio::test]
    async fn test_scan_translates_and_is_idempotent() {
        let temp = TempDir::new().unwrap();
        temp.child("ep.srt").write_str(SRT).unwrap();
        temp.child("ep.ass").write_str(ASS).unwrap();

        let config = config(temp.path());
        let provider = FakeProvider::default();
        let store = MemoryStore::new();
        let ledger = Ledger::open(Box::new(store.clone())).unwrap();
        let mut workflow = workflow_with(&config, provider.clone(), ledger);

        let first = tokio_test::assert_ok!(workflow.scan_once().await);
        assert_eq!(first.succeeded, 2);
        assert_eq!(first.failed, 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);

        temp.child("ep.GENERATED.th.srt")
            .assert("1\n00:00:01,000 --> 00:00:02,000\nHELLO WORLD\n\n");
        temp.child("ep.GENERATED.th.ass")
            .assert("[Events]\nDialogue: 0,0:00:01.00,0:00:02.00,Default,,0,0,0,,HELLO, WORLD\n");

        let entries = store.load().unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.values().all(|o| *o == Outcome::Success));

        let second = workflow.scan_once().await.unwrap();
        assert_eq!(second.discovered, 2);
        assert_eq!(second.processed(), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_is_recorded_and_not_retried() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();
        temp.child("b.srt").write_str(SRT).unwrap();

        let config = config(temp.path());
        let provider = FakeProvider::default();
        provider.failing.store(true, Ordering::SeqCst);
        let mut workflow = workflow_with(&config, provider.clone(), Ledger::in_memory());

        let summary = workflow.scan_once().await.unwrap();
        assert_eq!(summary.failed, 2);
        assert!(!temp.child("a.GENERATED.th.srt").path().exists());
        assert_eq!(workflow.ledger().outcome(temp.path().join("a.srt")), Some(Outcome::Error));

        provider.failing.store(false, Ordering::SeqCst);
        let summary = workflow.scan_once().await.unwrap();
        assert_eq!(summary.processed(), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_retried_when_enabled() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();

        let mut config = config(temp.path());
        config.watch.retry_errors = true;
        let provider = FakeProvider::default();
        provider.failing.store(true, Ordering::SeqCst);
        let mut workflow = workflow_with(&config, provider.clone(), Ledger::in_memory());

        assert_eq!(workflow.scan_once().await.unwrap().failed, 1);

        provider.failing.store(false, Ordering::SeqCst);
        assert_eq!(workflow.scan_once().await.unwrap().succeeded, 1);
        assert_eq!(workflow.ledger().outcome(temp.path().join("a.srt")), Some(Outcome::Success));

        assert_eq!(workflow.scan_once().await.unwrap().processed(), 0);
    }

    #[tokio::test]
    async fn test_rerun_after_crash_before_ledger_write() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();
        let config = config(temp.path());
        let provider = FakeProvider::default();

        // First run writes the output but its ledger entry never reaches disk
        let mut crashed = workflow_with(&config, provider.clone(), Ledger::in_memory());
        crashed.scan_once().await.unwrap();
        drop(crashed);

        let store = MemoryStore::new();
        let mut restarted = workflow_with(&config, provider.clone(), Ledger::open(Box::new(store.clone())).unwrap());
        let summary = restarted.scan_once().await.unwrap();

        assert_eq!(summary.succeeded, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        temp.child("a.GENERATED.th.srt")
            .assert("1\n00:00:01,000 --> 00:00:02,000\nHELLO WORLD\n\n");

        assert_eq!(restarted.scan_once().await.unwrap().processed(), 0);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(store.load().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ledger_failure_aborts_scan() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();
        temp.child("b.srt").write_str(SRT).unwrap();

        let config = config(temp.path());
        let provider = FakeProvider::default();
        let ledger = Ledger::open(Box::new(BrokenStore)).unwrap();
        let mut workflow = workflow_with(&config, provider.clone(), ledger);

        let result = workflow.scan_once().await;
        assert!(matches!(result, Err(SubwatchError::Persistence(_))));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(workflow.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_file_is_recorded_as_error() {
        let temp = TempDir::new().unwrap();
        temp.child("movie.vtt").write_str("WEBVTT\n").unwrap();

        let config = config(temp.path());
        let provider = FakeProvider::default();
        let mut workflow = workflow_with(&config, provider.clone(), Ledger::in_memory());

        let path = temp.path().join("movie.vtt");
        assert_eq!(workflow.process_file(&path).await.unwrap(), Outcome::Error);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(workflow.ledger().outcome(&path), Some(Outcome::Error));
    }

    #[tokio::test]
    async fn test_file_without_dialogue_skips_provider() {
        let temp = TempDir::new().unwrap();
        temp.child("empty.ass").write_str("[Script Info]\nTitle: none\n").unwrap();

        let config = config(temp.path());
        let provider = FakeProvider::default();
        let mut workflow = workflow_with(&config, provider.clone(), Ledger::in_memory());

        assert_eq!(workflow.scan_once().await.unwrap().succeeded, 1);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        temp.child("empty.GENERATED.th.ass").assert("[Script Info]\nTitle: none\n");
    }

    #[tokio::test]
    async fn test_run_cycles_sleeps_between_scans() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();

        let mut config = config(temp.path());
        config.watch.interval_secs = 7;
        let provider = FakeProvider::default();
        let mut workflow = workflow_with(&config, provider.clone(), Ledger::in_memory());
        let sleeper = RecordingSleeper::default();

        workflow.run_cycles(&sleeper, 3).await;

        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(7); 3]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cycle_survives_ledger_failure() {
        let temp = TempDir::new().unwrap();
        temp.child("a.srt").write_str(SRT).unwrap();

        let config = config(temp.path());
        let provider = FakeProvider::default();
        let ledger = Ledger::open(Box::new(BrokenStore)).unwrap();
        let mut workflow = workflow_with(&config, provider.clone(), ledger);
        let sleeper = RecordingSleeper::default();

        workflow.run_cycles(&sleeper, 2).await;

        // Nothing was durably recorded, so each cycle tries again
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 2);
    }
}
