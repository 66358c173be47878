//! Behaviour every ledger backend must share. Each backend's test module
//! runs these against a fresh instance.

use chrono::Utc;
use keeper_types::{CanonicalPath, ChangeKind, ChangeToken, ContentHash, VersionId};

use crate::error::LedgerError;
use crate::records::{FileRecord, NewVersion, Snapshot, Transition};
use crate::traits::Ledger;
use crate::validation::LedgerValidator;

pub(crate) fn path(name: &str) -> CanonicalPath {
    CanonicalPath::new("acct", "config", name).unwrap()
}

pub(crate) fn snapshot(path: &CanonicalPath, content: &[u8], token: &str) -> Snapshot {
    Snapshot {
        path: path.clone(),
        content: content.to_vec(),
        change_token: ChangeToken::new(token),
        last_modified: Utc::now(),
    }
}

pub(crate) fn record(path: &CanonicalPath, content: &[u8]) -> FileRecord {
    FileRecord {
        path: path.clone(),
        change_token: ChangeToken::new("0x1"),
        content_hash: ContentHash::of(content),
        last_modified: Utc::now(),
        is_deleted: false,
    }
}

pub(crate) fn lookups_of_unknown_keys_are_absent(ledger: &impl Ledger) {
    let p = path("missing.yaml");
    assert!(ledger.get_file(&p).unwrap().is_none());
    assert!(ledger.get_version(VersionId::new(42)).unwrap().is_none());
    assert!(ledger.list_versions(&p).unwrap().is_empty());
    assert!(ledger.latest_version(&p).unwrap().is_none());
    assert!(ledger.list_files().unwrap().is_empty());
    assert!(!ledger.mark_deleted(&p).unwrap());
}

pub(crate) fn upsert_is_idempotent(ledger: &impl Ledger) {
    let p = path("a.yaml");
    let first = ledger.upsert_file(&record(&p, b"x")).unwrap();
    let second = ledger.upsert_file(&record(&p, b"x")).unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(ledger.list_files().unwrap().len(), 1);

    let updated = ledger.upsert_file(&record(&p, b"y")).unwrap();
    assert_eq!(updated.id, first.id);
    assert_eq!(updated.content_hash, ContentHash::of(b"y"));
}

pub(crate) fn append_requires_existing_file(ledger: &impl Ledger) {
    let p = path("orphan.yaml");
    let error = ledger
        .append_version(&NewVersion {
            path: p.clone(),
            content: b"x".to_vec(),
            previous_hash: None,
            change: ChangeKind::Created,
            upstream_token: None,
            upstream_modified: None,
        })
        .unwrap_err();
    assert_eq!(error, LedgerError::UnknownFile(p));
}

pub(crate) fn version_ids_increase(ledger: &impl Ledger) {
    let a = path("a.yaml");
    let b = path("b.yaml");
    let v1 = ledger.apply(&Transition::Created(snapshot(&a, b"1", "t1"))).unwrap();
    let v2 = ledger.apply(&Transition::Created(snapshot(&b, b"1", "t1"))).unwrap();
    let v3 = ledger.apply(&Transition::Modified(snapshot(&a, b"2", "t2"))).unwrap();
    assert!(v1 < v2 && v2 < v3, "{v1:?} {v2:?} {v3:?}");
}

pub(crate) fn full_lifecycle(ledger: &impl Ledger) {
    let p = path("a.yaml");

    let v1 = ledger
        .apply(&Transition::Created(snapshot(&p, b"x: 1\n", "t1")))
        .unwrap()
        .unwrap();
    let touched = ledger
        .apply(&Transition::Touched {
            path: p.clone(),
            change_token: ChangeToken::new("t2"),
            last_modified: Utc::now(),
        })
        .unwrap();
    assert!(touched.is_none());
    assert_eq!(
        ledger.get_file(&p).unwrap().unwrap().change_token,
        ChangeToken::new("t2")
    );

    let v2 = ledger
        .apply(&Transition::Modified(snapshot(&p, b"x: 2\n", "t3")))
        .unwrap()
        .unwrap();
    let ids: Vec<_> = ledger.list_versions(&p).unwrap().iter().map(|v| v.id).collect();
    assert_eq!(ids, vec![v2, v1]);

    let v3 = ledger.apply(&Transition::Deleted { path: p.clone() }).unwrap().unwrap();
    let file = ledger.get_file(&p).unwrap().unwrap();
    assert!(file.is_deleted);
    assert_eq!(file.content_hash, ContentHash::of(b"x: 2\n"));
    let tombstone = ledger.get_version(v3).unwrap().unwrap();
    assert_eq!(tombstone.change, ChangeKind::Deleted);
    assert!(tombstone.content.is_empty());
    assert_eq!(tombstone.previous_hash, Some(ContentHash::of(b"x: 2\n")));
    assert!(tombstone.verify());

    let v4 = ledger
        .apply(&Transition::Created(snapshot(&p, b"x: 1\n", "t4")))
        .unwrap()
        .unwrap();
    let file = ledger.get_file(&p).unwrap().unwrap();
    assert!(!file.is_deleted);
    let latest = ledger.latest_version(&p).unwrap().unwrap();
    assert_eq!(latest.id, v4);
    assert_eq!(latest.change, ChangeKind::Created);
    assert_eq!(latest.content, b"x: 1\n");

    let versions = ledger.list_versions(&p).unwrap();
    assert_eq!(versions.len(), 4);
    for pair in versions.windows(2) {
        assert!(pair[0].captured_at > pair[1].captured_at);
    }

    let report = LedgerValidator::validate(ledger).unwrap();
    assert!(report.is_valid(), "{:?}", report.violations);
    assert_eq!(report.versions_checked, 4);
}

pub(crate) fn rejected_transition_leaves_no_trace(ledger: &impl Ledger) {
    let p = path("a.yaml");
    ledger.apply(&Transition::Created(snapshot(&p, b"same", "t1"))).unwrap();

    let error = ledger
        .apply(&Transition::Modified(snapshot(&p, b"same", "t2")))
        .unwrap_err();
    assert!(matches!(error, LedgerError::InvalidTransition { .. }));
    assert!(matches!(
        ledger.apply(&Transition::Created(snapshot(&p, b"again", "t3"))),
        Err(LedgerError::InvalidTransition { .. })
    ));

    let file = ledger.get_file(&p).unwrap().unwrap();
    assert_eq!(file.change_token, ChangeToken::new("t1"));
    assert_eq!(ledger.list_versions(&p).unwrap().len(), 1);
}

pub(crate) fn mark_deleted_keeps_versions(ledger: &impl Ledger) {
    let p = path("a.yaml");
    ledger.apply(&Transition::Created(snapshot(&p, b"x", "t1"))).unwrap();
    assert!(ledger.mark_deleted(&p).unwrap());
    assert!(ledger.get_file(&p).unwrap().unwrap().is_deleted);
    assert_eq!(ledger.list_versions(&p).unwrap().len(), 1);
}

pub(crate) fn list_files_aggregates(ledger: &impl Ledger) {
    let b = path("b.yaml");
    let a = path("a.yaml");
    ledger.apply(&Transition::Created(snapshot(&b, b"1", "t1"))).unwrap();
    ledger.apply(&Transition::Created(snapshot(&a, b"1", "t1"))).unwrap();
    ledger.apply(&Transition::Modified(snapshot(&a, b"2", "t2"))).unwrap();
    ledger.apply(&Transition::Deleted { path: b.clone() }).unwrap();

    let files = ledger.list_files().unwrap();
    let paths: Vec<_> = files.iter().map(|f| f.file.path.clone()).collect();
    assert_eq!(paths, vec![a.clone(), b.clone()]);

    assert_eq!(files[0].version_count, 2);
    assert_eq!(files[0].latest_change_type, Some(ChangeKind::Modified));
    assert_eq!(
        files[0].latest_change,
        ledger.latest_version(&a).unwrap().unwrap().captured_at
    );
    assert_eq!(files[1].version_count, 2);
    assert_eq!(files[1].latest_change_type, Some(ChangeKind::Deleted));
    assert!(files[1].file.is_deleted);
}
