//! Metrics store: the authoritative `(type, name) -> Metric` mapping.
//!
//! - Gauges are overwritten, counters accumulate.
//! - One mutex guards the whole mapping; every read and write holds it for
//!   its full duration. In synchronous persistence mode the snapshot is
//!   written while the lock is still held, so disk latency throttles writers.
//! - Updates are computed on a copy of the entry and committed only when
//!   conversion and signing succeeded (no partial writes).

pub mod flush;
pub mod persist;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use metrix_core::error::{MetricsError, Result};
use metrix_core::{Metric, MetricInput, MetricKey, MetricType, Signer};

pub use flush::FlushScheduler;
pub use persist::SnapshotFile;

/// Immutable store configuration, supplied once at construction.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Snapshot path; `None` disables persistence.
    pub store_file: Option<PathBuf>,
    /// Zero means synchronous persistence.
    pub store_interval: Duration,
    /// Empty disables signing.
    pub secret_key: String,
    /// Check signatures of inbound signed updates.
    pub verify_on_update: bool,
    /// Restore the snapshot at startup.
    pub restore: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            store_file: None,
            store_interval: Duration::ZERO,
            secret_key: String::new(),
            verify_on_update: true,
            restore: true,
        }
    }
}

impl StoreConfig {
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_file = Some(path.into());
        self
    }

    pub fn with_interval(mut self, every: Duration) -> Self {
        self.store_interval = every;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = key.into();
        self
    }

    pub fn with_verify_on_update(mut self, verify: bool) -> Self {
        self.verify_on_update = verify;
        self
    }
}

/// How the store externalizes its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// No snapshot file configured.
    Disabled,
    /// Every write flushes the full snapshot before returning.
    Sync,
    /// A background scheduler flushes on a fixed period.
    Periodic(Duration),
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Set,
    Add,
}

impl Op {
    /// The update rule tied to a metric kind.
    fn for_type(mtype: MetricType) -> Self {
        match mtype {
            MetricType::Gauge => Op::Set,
            MetricType::Counter => Op::Add,
        }
    }
}

type Metrics = HashMap<MetricKey, Metric>;

pub struct MetricsStore {
    metrics: Mutex<Metrics>,
    signer: Signer,
    snapshot: Option<SnapshotFile>,
    mode: PersistMode,
    cfg: StoreConfig,
    last_flush_ok: AtomicBool,
    flusher_started: AtomicBool,
}

impl MetricsStore {
    pub fn new(cfg: StoreConfig) -> Self {
        let snapshot = cfg
            .store_file
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .map(SnapshotFile::new);

        let mode = match (&snapshot, cfg.store_interval) {
            (None, _) => PersistMode::Disabled,
            (Some(_), every) if every.is_zero() => PersistMode::Sync,
            (Some(_), every) => PersistMode::Periodic(every),
        };

        Self {
            metrics: Mutex::new(HashMap::new()),
            signer: Signer::new(cfg.secret_key.as_bytes()),
            snapshot,
            mode,
            cfg,
            last_flush_ok: AtomicBool::new(true),
            flusher_started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    fn lock(&self) -> Result<MutexGuard<'_, Metrics>> {
        // Poisoned mutex means a writer panicked; report instead of panicking again.
        self.metrics
            .lock()
            .map_err(|_| MetricsError::Internal("metrics lock poisoned".into()))
    }

    /// Start the periodic flush task (first call only, periodic mode only).
    /// Must run inside a tokio runtime.
    pub fn start_flusher(self: &Arc<Self>) -> Result<Option<FlushScheduler>> {
        let PersistMode::Periodic(every) = self.mode else {
            return Ok(None);
        };
        if self.flusher_started.swap(true, Ordering::SeqCst) {
            return Ok(None);
        }
        FlushScheduler::spawn(Arc::clone(self), every).map(Some)
    }

    // --------------------
    // Write path
    // --------------------

    /// Apply the rule tied to `mtype`: gauge overwrites, counter accumulates.
    pub fn update(&self, mtype: &str, name: &str, input: impl Into<MetricInput>) -> Result<()> {
        if name.is_empty() {
            return Err(MetricsError::InvalidName);
        }
        let mtype: MetricType = mtype.parse()?;
        self.write(mtype, name, Op::for_type(mtype), input.into())
    }

    /// Overwrite the measurement (creating the metric when unseen).
    pub fn set(&self, mtype: MetricType, name: &str, input: impl Into<MetricInput>) -> Result<()> {
        self.write(mtype, name, Op::Set, input.into())
    }

    /// Accumulate into the measurement (an absent prior counts as zero).
    pub fn add(&self, mtype: MetricType, name: &str, input: impl Into<MetricInput>) -> Result<()> {
        self.write(mtype, name, Op::Add, input.into())
    }

    pub fn set_gauge(&self, name: &str, value: f64) -> Result<()> {
        self.set(MetricType::Gauge, name, value)
    }

    pub fn add_counter(&self, name: &str, delta: i64) -> Result<()> {
        self.add(MetricType::Counter, name, delta)
    }

    /// Decode a JSON metric and apply it as a signed update.
    pub fn update_json(&self, data: &[u8]) -> Result<()> {
        let metric = Metric::from_json(data)?;
        self.update_from_signed(&metric)
    }

    /// Verify (when signing and verification are enabled) then apply.
    /// Nothing is mutated if the check fails.
    pub fn update_from_signed(&self, metric: &Metric) -> Result<()> {
        self.check_inbound(metric)?;
        self.write(metric.mtype, &metric.id, Op::for_type(metric.mtype), metric.input()?)
    }

    /// Validate and verify a whole batch, then apply it atomically.
    pub fn update_batch(&self, batch: &[Metric]) -> Result<()> {
        for metric in batch {
            self.check_inbound(metric)?;
        }

        let mut metrics = self.lock()?;
        let mut staged: Metrics = HashMap::new();
        for metric in batch {
            let key = metric.key();
            let mut next = match staged.remove(&key) {
                Some(m) => m,
                None => metrics
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Metric::new(metric.mtype, metric.id.clone())),
            };
            apply_op(&mut next, Op::for_type(metric.mtype), &metric.input()?)?;
            staged.insert(key, next);
        }
        for m in staged.values_mut() {
            self.signer.apply(m)?;
        }
        metrics.extend(staged);

        if self.mode == PersistMode::Sync {
            self.save_locked(&metrics)?;
        }
        Ok(())
    }

    fn check_inbound(&self, metric: &Metric) -> Result<()> {
        metric.validate()?;
        if self.cfg.verify_on_update {
            self.signer.verify(metric)?;
        }
        Ok(())
    }

    fn write(&self, mtype: MetricType, name: &str, op: Op, input: MetricInput) -> Result<()> {
        if name.is_empty() {
            return Err(MetricsError::InvalidName);
        }

        let mut metrics = self.lock()?;
        let key = (mtype, name.to_string());
        let mut next = metrics
            .get(&key)
            .cloned()
            .unwrap_or_else(|| Metric::new(mtype, name));
        apply_op(&mut next, op, &input)?;
        self.signer.apply(&mut next)?;
        metrics.insert(key, next);

        // The update stays applied even if the flush fails.
        if self.mode == PersistMode::Sync {
            self.save_locked(&metrics)?;
        }
        Ok(())
    }

    // --------------------
    // Read path
    // --------------------

    /// Formatted measurement: gauge as shortest decimal, counter as integer.
    pub fn get(&self, mtype: &str, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(MetricsError::InvalidName);
        }
        let mtype: MetricType = mtype.parse()?;
        let metrics = self.lock()?;
        metrics
            .get(&(mtype, name.to_string()))
            .ok_or(MetricsError::NotFound)?
            .formatted_value()
    }

    pub fn fetch(&self, mtype: MetricType, name: &str) -> Result<Metric> {
        if name.is_empty() {
            return Err(MetricsError::InvalidName);
        }
        let metrics = self.lock()?;
        metrics
            .get(&(mtype, name.to_string()))
            .cloned()
            .ok_or(MetricsError::NotFound)
    }

    /// Decode a `{id, type}` lookup and return the stored metric as JSON.
    pub fn fetch_json(&self, data: &[u8]) -> Result<Vec<u8>> {
        let query = Metric::from_json(data)?;
        self.fetch(query.mtype, &query.id)?.to_json()
    }

    /// Names of one kind, sorted.
    pub fn names(&self, mtype: MetricType) -> Result<Vec<String>> {
        let metrics = self.lock()?;
        let mut names: Vec<String> = metrics
            .keys()
            .filter(|(t, _)| *t == mtype)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    pub fn count(&self, mtype: MetricType) -> Result<usize> {
        let metrics = self.lock()?;
        Ok(metrics.keys().filter(|(t, _)| *t == mtype).count())
    }

    /// All metrics ordered by `(type, name)`.
    pub fn snapshot(&self) -> Result<Vec<Metric>> {
        let metrics = self.lock()?;
        Ok(sorted(&metrics).into_iter().cloned().collect())
    }

    /// `type/name/value` lines, one per metric.
    pub fn render_text(&self) -> Result<String> {
        let mut out = String::new();
        for m in self.snapshot()? {
            if let Ok(v) = m.formatted_value() {
                out.push_str(&format!("{}/{}/{}\n", m.mtype, m.id, v));
            }
        }
        Ok(out)
    }

    pub fn delete(&self, mtype: MetricType, name: &str) -> Result<Metric> {
        if name.is_empty() {
            return Err(MetricsError::InvalidName);
        }
        let mut metrics = self.lock()?;
        metrics
            .remove(&(mtype, name.to_string()))
            .ok_or(MetricsError::NotFound)
    }

    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    // --------------------
    // Persistence
    // --------------------

    /// Write the full snapshot (truncating the file).
    pub fn save(&self) -> Result<()> {
        let metrics = self.lock()?;
        self.save_locked(&metrics)
    }

    fn save_locked(&self, metrics: &Metrics) -> Result<()> {
        let file = self
            .snapshot
            .as_ref()
            .ok_or_else(|| MetricsError::Internal("store file is not configured".into()))?;
        file.write(sorted(metrics))?;
        Ok(())
    }

    /// Merge the snapshot into the mapping. Existing entries only take the
    /// persisted measurement; unseen ones are inserted. Returns the number of
    /// records applied.
    pub fn restore(&self) -> Result<usize> {
        let file = self
            .snapshot
            .as_ref()
            .ok_or_else(|| MetricsError::Internal("store file is not configured".into()))?;

        let mut metrics = self.lock()?;
        let records = file.read()?;
        let mut applied = 0;
        for record in records {
            if let Err(e) = record.validate() {
                tracing::warn!(metric = %record, error = %e, "skipping invalid snapshot record");
                continue;
            }
            let key = record.key();
            let mut next = metrics
                .get(&key)
                .cloned()
                .unwrap_or_else(|| Metric::new(record.mtype, record.id.clone()));
            match record.mtype {
                MetricType::Gauge => next.value = record.value,
                MetricType::Counter => next.delta = record.delta,
            }
            // Re-sign with the current key; the persisted hash may predate it.
            if let Err(e) = self.signer.apply(&mut next) {
                tracing::warn!(metric = %record, error = %e, "skipping unsignable snapshot record");
                continue;
            }
            metrics.insert(key, next);
            applied += 1;
        }
        Ok(applied)
    }

    // --------------------
    // Health
    // --------------------

    pub(crate) fn record_flush(&self, ok: bool) {
        self.last_flush_ok.store(ok, Ordering::Relaxed);
    }

    /// False after a failed periodic flush (until the next success) or once
    /// the lock is poisoned.
    pub fn is_healthy(&self) -> bool {
        self.last_flush_ok.load(Ordering::Relaxed) && !self.metrics.is_poisoned()
    }
}

fn sorted(metrics: &Metrics) -> Vec<&Metric> {
    let mut out: Vec<&Metric> = metrics.values().collect();
    out.sort_by(|a, b| (a.mtype, &a.id).cmp(&(b.mtype, &b.id)));
    out
}

fn apply_op(metric: &mut Metric, op: Op, input: &MetricInput) -> Result<()> {
    match metric.mtype {
        MetricType::Gauge => {
            let v = input.to_f64()?;
            let next = match (op, metric.value) {
                (Op::Add, Some(prev)) => prev + v,
                _ => v,
            };
            if !next.is_finite() {
                return Err(MetricsError::InvalidValue(format!("gauge {} overflows", metric.id)));
            }
            metric.value = Some(next);
        }
        MetricType::Counter => {
            let d = input.to_i64()?;
            let next = match (op, metric.delta) {
                (Op::Add, Some(prev)) => prev
                    .checked_add(d)
                    .ok_or_else(|| MetricsError::InvalidValue(format!("counter {} overflows", metric.id)))?,
                _ => d,
            };
            metric.delta = Some(next);
        }
    }
    Ok(())
}
