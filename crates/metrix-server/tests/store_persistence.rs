//! Snapshot save/restore behavior of the metrics store.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;
use std::path::Path;

use metrix_core::{Metric, MetricType, Signer};
use metrix_server::store::{MetricsStore, SnapshotFile, StoreConfig};

fn sync_store(path: &Path) -> MetricsStore {
    MetricsStore::new(StoreConfig::default().with_file(path))
}

#[test]
fn sync_mode_flushes_every_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    let st = sync_store(&path);

    st.add_counter("hits", 5).unwrap();
    assert_eq!(SnapshotFile::new(&path).read().unwrap(), vec![Metric::counter("hits", 5)]);

    st.set_gauge("temp", 10.5).unwrap();
    st.add_counter("hits", 3).unwrap();
    assert_eq!(
        SnapshotFile::new(&path).read().unwrap(),
        vec![Metric::gauge("temp", 10.5), Metric::counter("hits", 8)]
    );
}

#[test]
fn sync_flush_failure_reaches_caller_but_update_stays() {
    let dir = tempfile::tempdir().unwrap();
    // Directory path: opening it for write fails.
    let st = sync_store(dir.path());

    let err = st.add_counter("hits", 5).unwrap_err();
    assert_eq!(err.client_code().as_str(), "INTERNAL");
    assert_eq!(st.get("counter", "hits").unwrap(), "5");
}

#[test]
fn restore_into_fresh_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    {
        let st = sync_store(&path);
        st.add_counter("hits", 8).unwrap();
        st.set_gauge("temp", 11.0).unwrap();
    }

    let st = sync_store(&path);
    assert_eq!(st.restore().unwrap(), 2);
    assert_eq!(st.get("counter", "hits").unwrap(), "8");
    assert_eq!(st.get("gauge", "temp").unwrap(), "11");
}

#[test]
fn restore_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    SnapshotFile::new(&path)
        .write(&[Metric::counter("hits", 8), Metric::gauge("temp", 1.25)])
        .unwrap();

    let once = MetricsStore::new(StoreConfig::default().with_file(&path));
    once.restore().unwrap();

    let twice = MetricsStore::new(StoreConfig::default().with_file(&path));
    twice.restore().unwrap();
    twice.restore().unwrap();

    assert_eq!(once.snapshot().unwrap(), twice.snapshot().unwrap());
    assert_eq!(twice.count(MetricType::Counter).unwrap(), 1);
}

#[test]
fn restore_merges_into_existing_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    SnapshotFile::new(&path).write(&[Metric::gauge("x", 2.0)]).unwrap();

    let st = MetricsStore::new(StoreConfig::default().with_file(&path).with_interval(std::time::Duration::from_secs(60)));
    st.set_gauge("x", 1.0).unwrap();
    st.add_counter("seeded", 1).unwrap();
    st.restore().unwrap();

    assert_eq!(st.get("gauge", "x").unwrap(), "2");
    assert_eq!(st.count(MetricType::Gauge).unwrap(), 1);
    assert_eq!(st.get("counter", "seeded").unwrap(), "1");
}

#[test]
fn restore_keeps_lines_before_a_torn_tail() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    fs::write(
        &path,
        "{\"id\":\"hits\",\"type\":\"counter\",\"delta\":8}\n{\"id\":\"\",\"type\":\"gauge\",\"value\":1}\n{\"id\":\"temp\",\"ty",
    )
    .unwrap();

    let st = sync_store(&path);
    assert_eq!(st.restore().unwrap(), 1);
    assert_eq!(st.get("counter", "hits").unwrap(), "8");
    assert!(st.get("gauge", "temp").is_err());
}

#[test]
fn restore_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let st = sync_store(&dir.path().join("absent.json"));
    assert!(st.restore().unwrap_err().is_missing_file());
}

#[test]
fn restored_metrics_are_signed_with_current_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("metrics.json");
    let mut stale = Metric::counter("hits", 8);
    stale.hash = Some("00".into());
    SnapshotFile::new(&path).write(&[stale]).unwrap();

    let st = MetricsStore::new(StoreConfig::default().with_file(&path).with_key("k"));
    st.restore().unwrap();
    let m = st.fetch(MetricType::Counter, "hits").unwrap();
    Signer::new("k").verify(&m).unwrap();
}
