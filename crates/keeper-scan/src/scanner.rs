use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use keeper_ledger::{Ledger, Transition};
use keeper_source::{ObjectListing, ObjectSource, SourceResult, StorageScope};
use keeper_types::{CanonicalPath, ChangeKind};

use crate::classify::{action, transition, Action};
use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult};
use crate::report::{CycleReport, ObjectFailure, ScopeFailure};

/// Result of handling one listed object.
enum Outcome {
    Unchanged,
    MetadataOnly,
    Versioned(ChangeKind),
}

/// The change-detection engine.
///
/// Owns handles to the object source and the ledger plus the configured
/// scopes. Cycles are serialised: a cycle requested while another runs waits
/// for it to finish.
pub struct Scanner {
    source: Arc<dyn ObjectSource>,
    ledger: Arc<dyn Ledger>,
    scopes: Arc<[StorageScope]>,
    config: ScanConfig,
    cycles: Mutex<u64>,
}

impl Scanner {
    pub fn new(
        source: Arc<dyn ObjectSource>,
        ledger: Arc<dyn Ledger>,
        scopes: Vec<StorageScope>,
        config: ScanConfig,
    ) -> ScanResult<Self> {
        config.validate()?;
        if scopes.is_empty() {
            return Err(ScanError::InvalidConfig("at least one scope is required".into()));
        }
        Ok(Self {
            source,
            ledger,
            scopes: scopes.into(),
            config,
            cycles: Mutex::new(0),
        })
    }

    pub fn scopes(&self) -> &[StorageScope] {
        &self.scopes
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Run cycles on a fixed interval until `shutdown` resolves. The first
    /// cycle starts immediately. A cycle in flight when shutdown is requested
    /// runs to completion.
    pub async fn run_until<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            interval = ?self.config.interval,
            scopes = self.scopes.len(),
            "scanner started"
        );
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        warn!(error = %e, "scan cycle aborted");
                    }
                }
            }
        }
        info!("scanner stopped");
    }

    /// Run one complete cycle now.
    pub async fn run_cycle(&self) -> ScanResult<CycleReport> {
        let mut cycles = self.cycles.lock().await;
        *cycles += 1;
        let mut report = CycleReport::start(*cycles);
        debug!(cycle = report.cycle, "scan cycle starting");

        let listings = self.enumerate_scopes().await;

        let mut seen: BTreeMap<CanonicalPath, ObjectListing> = BTreeMap::new();
        let mut listed_ok: Vec<&StorageScope> = Vec::new();
        let mut listed_failed: Vec<&StorageScope> = Vec::new();
        for (scope, result) in self.scopes.iter().zip(listings) {
            match result {
                Ok(objects) => {
                    debug!(scope = %scope, objects = objects.len(), "scope listed");
                    listed_ok.push(scope);
                    for listing in objects {
                        seen.insert(listing.path.clone(), listing);
                    }
                }
                Err(e) => {
                    warn!(scope = %scope, error = %e, "scope listing failed; skipped this cycle");
                    listed_failed.push(scope);
                    report.scope_failures.push(ScopeFailure {
                        scope: scope.to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report.scopes_listed = listed_ok.len();
        report.objects_seen = seen.len();

        self.classify_objects(seen.values(), &mut report).await;
        self.infer_deletions(&seen, &listed_ok, &listed_failed, &mut report)?;

        report.finished_at = Utc::now();
        info!(
            cycle = report.cycle,
            scopes_ok = report.scopes_listed,
            scopes_failed = report.scope_failures.len(),
            objects = report.objects_seen,
            created = report.created,
            modified = report.modified,
            deleted = report.deleted,
            metadata_only = report.metadata_only,
            failures = report.object_failures.len(),
            "scan cycle complete"
        );
        Ok(report)
    }

    /// List every scope, at most `scope_concurrency` at a time. Returns one
    /// result per scope, in scope order, once all listings have finished.
    async fn enumerate_scopes(&self) -> Vec<SourceResult<Vec<ObjectListing>>> {
        let permits = Arc::new(Semaphore::new(self.config.scope_concurrency));
        let handles: Vec<JoinHandle<SourceResult<Vec<ObjectListing>>>> = self
            .scopes
            .iter()
            .cloned()
            .map(|scope| {
                let source = Arc::clone(&self.source);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await;
                    source.list_objects(&scope).await
                })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            results.push(handle.await.unwrap_or_else(|e| {
                Err(keeper_source::SourceError::Unavailable {
                    target: "listing task".into(),
                    reason: e.to_string(),
                })
            }));
        }
        results
    }

    /// Apply the per-path state machine to every listed object. Downloads
    /// run at most `fetch_concurrency` at a time; each object's ledger write
    /// is one atomic transition.
    async fn classify_objects<'a>(
        &self,
        listings: impl Iterator<Item = &'a ObjectListing>,
        report: &mut CycleReport,
    ) {
        let permits = Arc::new(Semaphore::new(self.config.fetch_concurrency));
        let mut handles: Vec<(CanonicalPath, JoinHandle<ScanResult<Outcome>>)> = Vec::new();

        for listing in listings {
            let existing = match self.ledger.get_file(&listing.path) {
                Ok(existing) => existing,
                Err(e) => {
                    record_failure(report, &listing.path, &ScanError::from(e));
                    continue;
                }
            };
            let expect = match action(listing, existing.as_ref()) {
                Action::Skip => {
                    report.unchanged += 1;
                    continue;
                }
                Action::Fetch(expect) => expect,
            };

            let source = Arc::clone(&self.source);
            let ledger = Arc::clone(&self.ledger);
            let permits = Arc::clone(&permits);
            let path = listing.path.clone();
            handles.push((
                listing.path.clone(),
                tokio::spawn(async move {
                    let fetched = {
                        let _permit = permits.acquire_owned().await;
                        source.fetch_object(&path).await?
                    };
                    // SQLite writes block; keep them off the async workers.
                    tokio::task::spawn_blocking(move || {
                        record(ledger.as_ref(), &transition(expect, fetched))
                    })
                    .await
                    .map_err(|e| ScanError::Task(e.to_string()))?
                }),
            ));
        }

        for (path, handle) in handles {
            let result = handle
                .await
                .unwrap_or_else(|e| Err(ScanError::Task(e.to_string())));
            match result {
                Ok(Outcome::Unchanged) => report.unchanged += 1,
                Ok(Outcome::MetadataOnly) => report.metadata_only += 1,
                Ok(Outcome::Versioned(ChangeKind::Created)) => report.created += 1,
                Ok(Outcome::Versioned(ChangeKind::Modified)) => report.modified += 1,
                Ok(Outcome::Versioned(ChangeKind::Deleted)) => report.deleted += 1,
                Err(e) => record_failure(report, &path, &e),
            }
        }
    }

    /// Tombstone live files that a complete listing no longer shows.
    ///
    /// A file is only eligible when at least one scope covering it listed
    /// successfully and no scope covering it failed.
    fn infer_deletions(
        &self,
        seen: &BTreeMap<CanonicalPath, ObjectListing>,
        listed_ok: &[&StorageScope],
        listed_failed: &[&StorageScope],
        report: &mut CycleReport,
    ) -> ScanResult<()> {
        if listed_ok.is_empty() {
            return Ok(());
        }

        for summary in self.ledger.list_files()? {
            let file = summary.file;
            if file.is_deleted || seen.contains_key(&file.path) {
                continue;
            }
            if listed_failed.iter().any(|s| s.covers(&file.path)) {
                debug!(path = %file.path, "deletion check skipped; covering scope failed");
                continue;
            }
            if !listed_ok.iter().any(|s| s.covers(&file.path)) {
                continue;
            }

            match self.ledger.apply(&Transition::Deleted {
                path: file.path.clone(),
            }) {
                Ok(Some(version)) => {
                    info!(path = %file.path, version = %version, "file deleted upstream");
                    report.deleted += 1;
                }
                Ok(None) => {}
                Err(e) => record_failure(report, &file.path, &ScanError::from(e)),
            }
        }
        Ok(())
    }
}

fn record(ledger: &dyn Ledger, transition: &Transition) -> ScanResult<Outcome> {
    let path = transition.path();
    match (ledger.apply(transition)?, transition.change()) {
        (Some(version), Some(change)) => {
            info!(path = %path, version = %version, change = %change, "version recorded");
            Ok(Outcome::Versioned(change))
        }
        (None, _) => {
            debug!(path = %path, "change token moved without a content change");
            Ok(Outcome::MetadataOnly)
        }
        (Some(_), None) => Ok(Outcome::Unchanged),
    }
}

fn record_failure(report: &mut CycleReport, path: &CanonicalPath, error: &ScanError) {
    warn!(path = %path, error = %error, "object skipped this cycle");
    report.object_failures.push(ObjectFailure {
        path: path.clone(),
        error: error.to_string(),
    });
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("scopes", &self.scopes.iter().map(|s| s.to_string()).collect::<Vec<_>>())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use keeper_ledger::{InMemoryLedger, LedgerReader, LedgerValidator, SqliteLedger};
    use keeper_source::{InMemoryObjectSource, ScopeConfig};
    use keeper_types::ContentHash;

    use super::*;

    fn path(s: &str) -> CanonicalPath {
        CanonicalPath::parse(s).unwrap()
    }

    fn scope(config: ScopeConfig) -> StorageScope {
        StorageScope::new(config).unwrap()
    }

    struct Harness {
        source: Arc<InMemoryObjectSource>,
        ledger: Arc<InMemoryLedger>,
        scanner: Scanner,
    }

    fn harness(scopes: Vec<StorageScope>) -> Harness {
        let source = Arc::new(InMemoryObjectSource::new());
        let ledger = Arc::new(InMemoryLedger::new());
        let scanner = Scanner::new(
            source.clone(),
            ledger.clone(),
            scopes,
            ScanConfig::default(),
        )
        .unwrap();
        Harness {
            source,
            ledger,
            scanner,
        }
    }

    fn config_scope() -> Harness {
        let h = harness(vec![scope(ScopeConfig::new("acct").container("config"))]);
        h.source.create_container("acct", "config");
        h
    }

    fn changes(ledger: &InMemoryLedger, p: &CanonicalPath) -> Vec<ChangeKind> {
        let mut kinds: Vec<_> = ledger
            .list_versions(p)
            .unwrap()
            .into_iter()
            .map(|v| v.change)
            .collect();
        kinds.reverse();
        kinds
    }

    #[test]
    fn construction_is_validated() {
        let source = Arc::new(InMemoryObjectSource::new());
        let ledger = Arc::new(InMemoryLedger::new());
        assert!(matches!(
            Scanner::new(source.clone(), ledger.clone(), Vec::new(), ScanConfig::default()),
            Err(ScanError::InvalidConfig(_))
        ));
        let zero = ScanConfig {
            fetch_concurrency: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(
            Scanner::new(source, ledger, vec![scope(ScopeConfig::new("acct"))], zero),
            Err(ScanError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn new_object_is_created_with_fetched_metadata() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        let token = h.source.put(&p, "x: 1\n");

        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.cycle, 1);
        assert_eq!(report.created, 1);
        assert!(report.is_clean());

        let file = h.ledger.get_file(&p).unwrap().unwrap();
        assert_eq!(file.change_token, token);
        assert_eq!(file.content_hash, ContentHash::of(b"x: 1\n"));
        let latest = h.ledger.latest_version(&p).unwrap().unwrap();
        assert_eq!(latest.change, ChangeKind::Created);
        assert_eq!(latest.content, b"x: 1\n");
        assert_eq!(latest.upstream_token, Some(token));
    }

    #[tokio::test]
    async fn unchanged_token_skips_the_download() {
        let h = config_scope();
        h.source.put(&path("acct/config/a.yaml"), "x: 1\n");
        h.source.put(&path("acct/config/b.yaml"), "y: 1\n");

        h.scanner.run_cycle().await.unwrap();
        assert_eq!(h.source.fetch_count(), 2);

        let second = h.scanner.run_cycle().await.unwrap();
        assert_eq!(second.unchanged, 2);
        assert_eq!(second.versions_appended(), 0);
        assert_eq!(h.source.fetch_count(), 2);
        assert_eq!(h.ledger.version_count(), 2);
    }

    #[tokio::test]
    async fn content_change_appends_modified_version() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();

        h.source.put(&p, "x: 2\n");
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.modified, 1);
        assert_eq!(changes(&h.ledger, &p), vec![ChangeKind::Created, ChangeKind::Modified]);
        assert_eq!(
            h.ledger.get_file(&p).unwrap().unwrap().content_hash,
            ContentHash::of(b"x: 2\n")
        );
    }

    #[tokio::test]
    async fn token_change_without_content_change_is_metadata_only() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();

        let token = h.source.touch(&p).unwrap();
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.metadata_only, 1);
        assert_eq!(report.versions_appended(), 0);
        assert_eq!(h.ledger.get_file(&p).unwrap().unwrap().change_token, token);
        assert_eq!(h.ledger.version_count(), 1);

        // The new token is now recorded, so the next cycle skips the fetch.
        let fetched = h.source.fetch_count();
        h.scanner.run_cycle().await.unwrap();
        assert_eq!(h.source.fetch_count(), fetched);
    }

    #[tokio::test]
    async fn disappearance_tombstones_and_reappearance_recreates() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();

        h.source.remove(&p);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.deleted, 1);
        let file = h.ledger.get_file(&p).unwrap().unwrap();
        assert!(file.is_deleted);
        let tombstone = h.ledger.latest_version(&p).unwrap().unwrap();
        assert!(tombstone.content.is_empty());
        assert_eq!(tombstone.previous_hash, Some(ContentHash::of(b"x: 1\n")));

        // Still gone: no second tombstone.
        assert_eq!(h.scanner.run_cycle().await.unwrap().deleted, 0);

        h.source.put(&p, "x: 1\n");
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(
            changes(&h.ledger, &p),
            vec![ChangeKind::Created, ChangeKind::Deleted, ChangeKind::Created]
        );
        assert!(!h.ledger.get_file(&p).unwrap().unwrap().is_deleted);
        assert!(LedgerValidator::validate(h.ledger.as_ref()).unwrap().is_valid());
    }

    #[tokio::test]
    async fn reappearance_with_new_content_records_one_created_version() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();
        h.source.remove(&p);
        h.scanner.run_cycle().await.unwrap();

        h.source.put(&p, "x: 2\n");
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.modified, 0);
        assert_eq!(
            changes(&h.ledger, &p),
            vec![ChangeKind::Created, ChangeKind::Deleted, ChangeKind::Created]
        );

        let latest = h.ledger.latest_version(&p).unwrap().unwrap();
        assert_eq!(latest.content, b"x: 2\n");
        assert_eq!(latest.content_hash, ContentHash::of(b"x: 2\n"));
        let file = h.ledger.get_file(&p).unwrap().unwrap();
        assert!(!file.is_deleted);
        assert_eq!(file.content_hash, ContentHash::of(b"x: 2\n"));
        assert!(LedgerValidator::validate(h.ledger.as_ref()).unwrap().is_valid());
    }

    #[tokio::test]
    async fn failed_listing_never_infers_deletions() {
        let h = harness(vec![scope(ScopeConfig::new("acct"))]);
        let a = path("acct/one/a.yaml");
        let b = path("acct/two/b.yaml");
        h.source.put(&a, "1");
        h.source.put(&b, "2");
        h.scanner.run_cycle().await.unwrap();

        h.source.fail_listing("acct", "two", true);
        h.source.remove(&a);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.scope_failures.len(), 1);
        assert_eq!(report.scopes_listed, 0);
        assert_eq!(report.deleted, 0);
        assert!(!h.ledger.get_file(&a).unwrap().unwrap().is_deleted);
        assert!(!h.ledger.get_file(&b).unwrap().unwrap().is_deleted);

        h.source.fail_listing("acct", "two", false);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.deleted, 1);
        assert!(h.ledger.get_file(&a).unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn healthy_scope_still_processes_when_another_fails() {
        let h = harness(vec![
            scope(ScopeConfig::new("acct").container("one")),
            scope(ScopeConfig::new("acct").container("two")),
        ]);
        let a = path("acct/one/a.yaml");
        let b = path("acct/two/b.yaml");
        h.source.put(&a, "1");
        h.source.put(&b, "2");
        h.scanner.run_cycle().await.unwrap();

        h.source.fail_listing("acct", "two", true);
        h.source.remove(&a);
        h.source.remove(&b);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.scopes_listed, 1);
        assert_eq!(report.deleted, 1);
        assert!(h.ledger.get_file(&a).unwrap().unwrap().is_deleted);
        assert!(!h.ledger.get_file(&b).unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn a_failed_overlapping_scope_protects_shared_files() {
        let h = harness(vec![
            scope(ScopeConfig::new("acct").container("config")),
            scope(ScopeConfig::new("acct")),
        ]);
        let b = path("acct/config/b.yaml");
        h.source.put(&b, "2");
        h.source.put(&path("acct/other/c.yaml"), "3");
        h.scanner.run_cycle().await.unwrap();

        // The wildcard scope fails, the narrow one lists fine.
        h.source.remove(&b);
        h.source.fail_listing("acct", "other", true);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.scopes_listed, 1);
        assert_eq!(report.scope_failures.len(), 1);
        assert_eq!(report.deleted, 0);
        assert!(!h.ledger.get_file(&b).unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn files_outside_every_scope_are_left_alone() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();

        // A narrower configuration no longer covers the file.
        let narrowed = Scanner::new(
            h.source.clone(),
            h.ledger.clone(),
            vec![scope(ScopeConfig::new("acct").container("other"))],
            ScanConfig::default(),
        )
        .unwrap();
        h.source.create_container("acct", "other");
        let report = narrowed.run_cycle().await.unwrap();
        assert_eq!(report.deleted, 0);
        assert!(!h.ledger.get_file(&p).unwrap().unwrap().is_deleted);
    }

    #[tokio::test]
    async fn failed_fetch_is_retried_next_cycle() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.source.fail_fetch(&p, true);

        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.object_failures.len(), 1);
        assert_eq!(report.object_failures[0].path, p);
        assert!(h.ledger.get_file(&p).unwrap().is_none());

        h.source.fail_fetch(&p, false);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.created, 1);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn failed_fetch_of_a_tracked_file_is_not_a_deletion() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();

        h.source.put(&p, "x: 2\n");
        h.source.fail_fetch(&p, true);
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.deleted, 0);
        let file = h.ledger.get_file(&p).unwrap().unwrap();
        assert!(!file.is_deleted);
        assert_eq!(file.content_hash, ContentHash::of(b"x: 1\n"));
    }

    #[tokio::test]
    async fn restored_content_is_picked_up_as_a_modification() {
        let h = config_scope();
        let p = path("acct/config/a.yaml");
        h.source.put(&p, "x: 1\n");
        h.scanner.run_cycle().await.unwrap();
        h.source.put(&p, "x: 2\n");
        h.scanner.run_cycle().await.unwrap();

        let first = h.ledger.list_versions(&p).unwrap().pop().unwrap();
        h.source.upload_object(&p, &first.content).await.unwrap();
        let report = h.scanner.run_cycle().await.unwrap();
        assert_eq!(report.modified, 1);

        let latest = h.ledger.latest_version(&p).unwrap().unwrap();
        assert_eq!(latest.content_hash, first.content_hash);
        assert_eq!(h.ledger.version_count(), 3);
    }

    #[tokio::test]
    async fn concurrent_cycles_do_not_overlap() {
        let h = config_scope();
        for i in 0..20 {
            h.source
                .put(&path(&format!("acct/config/f{i}.yaml")), format!("n: {i}\n"));
        }

        let (first, second) = tokio::join!(h.scanner.run_cycle(), h.scanner.run_cycle());
        let (first, second) = (first.unwrap(), second.unwrap());
        assert_ne!(first.cycle, second.cycle);
        assert_eq!(first.created + second.created, 20);
        assert_eq!(h.ledger.version_count(), 20);
        assert!(first.is_clean() && second.is_clean());
    }

    #[tokio::test]
    async fn run_until_stops_on_shutdown() {
        let source = Arc::new(InMemoryObjectSource::new());
        let ledger = Arc::new(InMemoryLedger::new());
        source.put(&path("acct/config/a.yaml"), "x: 1\n");
        let scanner = Scanner::new(
            source,
            ledger.clone(),
            vec![scope(ScopeConfig::new("acct").container("config"))],
            ScanConfig {
                interval: Duration::from_millis(10),
                ..ScanConfig::default()
            },
        )
        .unwrap();

        scanner
            .run_until(tokio::time::sleep(Duration::from_millis(50)))
            .await;
        assert_eq!(ledger.version_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn scans_into_a_sqlite_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(SqliteLedger::open(dir.path().join("keeper.db")).unwrap());
        let source = Arc::new(InMemoryObjectSource::new());
        let scanner = Scanner::new(
            source.clone(),
            ledger.clone(),
            vec![scope(ScopeConfig::new("acct").container("config"))],
            ScanConfig::default(),
        )
        .unwrap();

        let p = path("acct/config/a.yaml");
        source.put(&p, "x: 1\n");
        scanner.run_cycle().await.unwrap();
        source.put(&p, "x: 2\n");
        scanner.run_cycle().await.unwrap();
        source.remove(&p);
        scanner.run_cycle().await.unwrap();

        let kinds: Vec<_> = ledger
            .list_versions(&p)
            .unwrap()
            .into_iter()
            .map(|v| v.change)
            .collect();
        assert_eq!(
            kinds,
            vec![ChangeKind::Deleted, ChangeKind::Modified, ChangeKind::Created]
        );
        assert!(LedgerValidator::validate(ledger.as_ref()).unwrap().is_valid());
    }
}
