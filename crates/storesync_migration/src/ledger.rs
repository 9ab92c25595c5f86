//! Immigrant version ledger.
//!
//! When content migrates, the versions it carried at the source are
//! re-issued at the destination under new ticks owned by the local device.
//! The ledger keeps one row per carried `(device, tick)` so a remote version
//! that arrives later can be recognised as already applied, and so peers
//! can be fed the re-issued history.
//!
//! ## Log format
//!
//! Rows recorded in one transaction are appended as one frame at commit:
//!
//! ```text
//! | magic "SSIL" (4) | version (2) | length (4) | CBOR rows (N) | checksum (4) |
//! ```
//!
//! The checksum is the first four bytes of the SHA-256 digest of header and
//! payload.
//!
//! ## Recovery
//!
//! - **Short trailing frame**: a write torn by a crash. Logged, truncated,
//!   and replay ends there.
//! - **Checksum, magic or version mismatch on a complete frame**: the log is
//!   damaged and the ledger refuses to open.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use storesync_core::{
    CausalVersion, CoreError, CoreResult, DeviceId, MigrationConfig, Socid, StoreIndex, Tick,
    Transaction, TransactionId,
};
use storesync_storage::StorageBackend;
use tracing::{debug, info, warn};

/// Magic bytes opening every ledger frame.
pub const LEDGER_MAGIC: [u8; 4] = *b"SSIL";

/// Current ledger frame version.
pub const LEDGER_VERSION: u16 = 1;

const HEADER_SIZE: usize = 4 + 2 + 4;
const CHECKSUM_SIZE: usize = 4;

/// One carried `(device, tick)` of a migrated component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImmigrantTickRow {
    /// Destination component.
    pub socid: Socid,
    /// Device that issued the version at the source.
    pub origin_device: DeviceId,
    /// Tick issued at the source.
    pub origin_tick: Tick,
    /// Device that re-issued the version at the destination.
    pub immigrant_device: DeviceId,
    /// Tick re-issued at the destination.
    pub immigrant_tick: Tick,
}

/// Result of scanning a ledger log.
#[derive(Debug, Clone, Default)]
pub struct LedgerScan {
    /// Rows of every complete frame, in log order.
    pub rows: Vec<ImmigrantTickRow>,
    /// Number of complete frames.
    pub frames: usize,
    /// Length of the valid prefix.
    pub valid_len: u64,
    /// Bytes after the valid prefix (a torn trailing frame).
    pub torn_bytes: u64,
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_SIZE] {
    let digest = Sha256::digest(bytes);
    [digest[0], digest[1], digest[2], digest[3]]
}

fn encode_frame(rows: &[ImmigrantTickRow]) -> CoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(rows, &mut payload).map_err(|e| CoreError::codec(e.to_string()))?;
    let len = u32::try_from(payload.len())
        .map_err(|_| CoreError::codec(format!("ledger frame of {} bytes", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len() + CHECKSUM_SIZE);
    frame.extend_from_slice(&LEDGER_MAGIC);
    frame.extend_from_slice(&LEDGER_VERSION.to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    let sum = checksum(&frame);
    frame.extend_from_slice(&sum);
    Ok(frame)
}

/// Parses a ledger log.
///
/// A short trailing frame is reported in [`LedgerScan::torn_bytes`];
/// damage to a complete frame is an error.
pub fn scan(bytes: &[u8]) -> CoreResult<LedgerScan> {
    let mut result = LedgerScan::default();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < HEADER_SIZE {
            break;
        }
        let corrupt = |message: String| CoreError::LedgerCorruption {
            offset: offset as u64,
            message,
        };
        if rest[0..4] != LEDGER_MAGIC {
            return Err(corrupt("invalid magic".to_string()));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version != LEDGER_VERSION {
            return Err(corrupt(format!("unsupported frame version {version}")));
        }
        let len = u32::from_le_bytes([rest[6], rest[7], rest[8], rest[9]]) as usize;
        let total = HEADER_SIZE + len + CHECKSUM_SIZE;
        if rest.len() < total {
            break;
        }
        let body = &rest[..HEADER_SIZE + len];
        if checksum(body) != rest[HEADER_SIZE + len..total] {
            return Err(corrupt("checksum mismatch".to_string()));
        }
        let rows: Vec<ImmigrantTickRow> = ciborium::from_reader(&body[HEADER_SIZE..])
            .map_err(|e| corrupt(format!("undecodable rows: {e}")))?;
        result.rows.extend(rows);
        result.frames += 1;
        offset += total;
    }

    result.valid_len = offset as u64;
    result.torn_bytes = (bytes.len() - offset) as u64;
    Ok(result)
}

#[derive(Default)]
struct LedgerState {
    rows: Vec<ImmigrantTickRow>,
    by_origin: HashMap<(Socid, DeviceId, Tick), usize>,
    last_tick: HashMap<StoreIndex, Tick>,
}

impl LedgerState {
    fn insert(&mut self, row: ImmigrantTickRow) {
        self.by_origin
            .insert((row.socid, row.origin_device, row.origin_tick), self.rows.len());
        let last = self.last_tick.entry(row.socid.soid.sidx).or_insert(Tick::ZERO);
        if *last < row.immigrant_tick {
            *last = row.immigrant_tick;
        }
        self.rows.push(row);
    }

    fn truncate(&mut self, len: usize, last_tick: HashMap<StoreIndex, Tick>) {
        for row in self.rows.drain(len..) {
            self.by_origin
                .remove(&(row.socid, row.origin_device, row.origin_tick));
        }
        self.last_tick = last_tick;
    }
}

/// Rows of the open transaction, written as one frame when it commits.
struct PendingFrame {
    txn: TransactionId,
    rows: Vec<ImmigrantTickRow>,
}

type SharedLog = Arc<Mutex<Box<dyn StorageBackend>>>;

/// Durable map from migrated source versions to re-issued ticks.
pub struct ImmigrantVersionLedger {
    state: Arc<RwLock<LedgerState>>,
    log: SharedLog,
    pending: Arc<Mutex<Option<PendingFrame>>>,
    local_device: DeviceId,
    sync_on_commit: bool,
}

impl ImmigrantVersionLedger {
    /// Opens a ledger on `backend`, replaying what it holds.
    ///
    /// A torn trailing frame is dropped from the log.
    pub fn open(backend: impl StorageBackend + 'static, config: &MigrationConfig) -> CoreResult<Self> {
        let mut backend: Box<dyn StorageBackend> = Box::new(backend);
        let scanned = scan(&backend.read_all()?)?;
        if scanned.torn_bytes > 0 {
            warn!(
                offset = scanned.valid_len,
                bytes = scanned.torn_bytes,
                "dropping torn ledger frame"
            );
            backend.truncate(scanned.valid_len)?;
        }

        let mut state = LedgerState::default();
        for row in scanned.rows {
            state.insert(row);
        }
        debug!(rows = state.rows.len(), frames = scanned.frames, "replayed immigrant ledger");

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            log: Arc::new(Mutex::new(backend)),
            pending: Arc::new(Mutex::new(None)),
            local_device: config.local_device,
            sync_on_commit: config.sync_ledger_on_commit,
        })
    }

    /// Records that `version` arrived at `socid` by migration.
    ///
    /// Each `(device, tick)` not already recorded for `socid` gets the next
    /// immigrant tick of the destination store. Rows become visible at once
    /// and are appended to the log when `txn` commits; a rollback forgets
    /// them. Returns the rows added by this call.
    pub fn record(
        &self,
        txn: &mut Transaction<'_>,
        socid: Socid,
        version: &CausalVersion,
    ) -> CoreResult<Vec<ImmigrantTickRow>> {
        let mut state = self.state.write();
        let restore_len = state.rows.len();
        let restore_ticks = state.last_tick.clone();

        let mut added = Vec::new();
        for (device, tick) in version.iter() {
            if state.by_origin.contains_key(&(socid, device, tick)) {
                continue;
            }
            let last = state
                .last_tick
                .get(&socid.soid.sidx)
                .copied()
                .unwrap_or(Tick::ZERO);
            let row = ImmigrantTickRow {
                socid,
                origin_device: device,
                origin_tick: tick,
                immigrant_device: self.local_device,
                immigrant_tick: last.next(),
            };
            state.insert(row);
            added.push(row);
        }
        drop(state);

        if added.is_empty() {
            return Ok(added);
        }

        let state = Arc::clone(&self.state);
        txn.on_rollback(move || state.write().truncate(restore_len, restore_ticks))?;
        self.stage(txn, &added)?;

        info!(socid = %socid, rows = added.len(), "recorded immigrant versions");
        Ok(added)
    }

    /// Adds `rows` to the frame of `txn`, opening it on first use.
    ///
    /// The frame is appended by a single commit action. If the transaction
    /// unwinds after the append started, the log is cut back to its size
    /// before the frame.
    fn stage(&self, txn: &mut Transaction<'_>, rows: &[ImmigrantTickRow]) -> CoreResult<()> {
        let mut pending = self.pending.lock();
        if let Some(frame) = pending.as_mut().filter(|frame| frame.txn == txn.id()) {
            frame.rows.extend_from_slice(rows);
            return Ok(());
        }
        *pending = Some(PendingFrame {
            txn: txn.id(),
            rows: rows.to_vec(),
        });
        drop(pending);

        let written_from: Arc<Mutex<Option<u64>>> = Arc::new(Mutex::new(None));

        let frame_slot = Arc::clone(&self.pending);
        let log = Arc::clone(&self.log);
        let start = Arc::clone(&written_from);
        txn.on_rollback(move || {
            frame_slot.lock().take();
            if let Some(size) = start.lock().take() {
                if let Err(err) = log.lock().truncate(size) {
                    warn!(size, error = %err, "failed to cut back ledger after rollback");
                }
            }
        })?;

        let frame_slot = Arc::clone(&self.pending);
        let log = Arc::clone(&self.log);
        let sync = self.sync_on_commit;
        txn.on_commit(move || {
            let Some(frame) = frame_slot.lock().take() else {
                return Ok(());
            };
            let bytes = encode_frame(&frame.rows)?;
            let mut log = log.lock();
            *written_from.lock() = Some(log.size()?);
            let offset = log.append(&bytes)?;
            if sync {
                log.sync()?;
            } else {
                log.flush()?;
            }
            debug!(txn = %frame.txn, offset, rows = frame.rows.len(), "appended ledger frame");
            Ok(())
        })
    }

    /// Returns every row of `socid` in recording order.
    #[must_use]
    pub fn rows_for(&self, socid: Socid) -> Vec<ImmigrantTickRow> {
        self.state
            .read()
            .rows
            .iter()
            .filter(|row| row.socid == socid)
            .copied()
            .collect()
    }

    /// Returns the re-issued version of `socid`.
    #[must_use]
    pub fn immigrant_version(&self, socid: Socid) -> CausalVersion {
        self.state
            .read()
            .rows
            .iter()
            .filter(|row| row.socid == socid)
            .map(|row| (row.immigrant_device, row.immigrant_tick))
            .collect()
    }

    /// Returns the part of `remote` that `socid` already received by migration.
    ///
    /// An entry `(d, t)` of `remote` is covered when some row of `socid`
    /// carried a tick of `d` at least `t`.
    #[must_use]
    pub fn already_applied(&self, socid: Socid, remote: &CausalVersion) -> CausalVersion {
        let state = self.state.read();
        let mut carried: BTreeMap<DeviceId, Tick> = BTreeMap::new();
        for row in state.rows.iter().filter(|row| row.socid == socid) {
            let max = carried.entry(row.origin_device).or_insert(Tick::ZERO);
            if *max < row.origin_tick {
                *max = row.origin_tick;
            }
        }
        remote
            .iter()
            .filter(|(device, tick)| carried.get(device).is_some_and(|max| tick <= max))
            .collect()
    }

    /// Returns rows of store `sidx` with an immigrant tick after `after`,
    /// in tick order.
    #[must_use]
    pub fn rows_since(&self, sidx: StoreIndex, after: Tick) -> Vec<ImmigrantTickRow> {
        let mut rows: Vec<_> = self
            .state
            .read()
            .rows
            .iter()
            .filter(|row| row.socid.soid.sidx == sidx && row.immigrant_tick > after)
            .copied()
            .collect();
        rows.sort_by_key(|row| row.immigrant_tick);
        rows
    }

    /// Returns the last immigrant tick issued in store `sidx`.
    #[must_use]
    pub fn last_tick(&self, sidx: StoreIndex) -> Tick {
        self.state
            .read()
            .last_tick
            .get(&sidx)
            .copied()
            .unwrap_or(Tick::ZERO)
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().rows.len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for ImmigrantVersionLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImmigrantVersionLedger")
            .field("rows", &self.len())
            .field("local_device", &self.local_device)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storesync_core::{ObjectId, Soid, TransactionManager};
    use storesync_storage::{InMemoryBackend, StorageError, StorageResult};

    fn dev(n: u8) -> DeviceId {
        DeviceId::from_bytes([n; 16])
    }

    fn content(sidx: u32) -> Socid {
        Socid::content(Soid::new(StoreIndex::new(sidx), ObjectId::from_bytes([9; 16])))
    }

    fn config() -> MigrationConfig {
        MigrationConfig::new(dev(0xAA))
    }

    #[test]
    fn rows_are_written_at_commit() {
        let backend = InMemoryBackend::new();
        let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
        let tm = TransactionManager::new();

        let mut txn = tm.begin();
        let version = CausalVersion::new().with(dev(1), Tick::new(5));
        let rows = ledger.record(&mut txn, content(2), &version).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].immigrant_device, dev(0xAA));
        assert_eq!(rows[0].immigrant_tick, Tick::new(1));
        assert!(backend.data().is_empty());

        txn.commit().unwrap();
        let scanned = scan(&backend.data()).unwrap();
        assert_eq!(scanned.frames, 1);
        assert_eq!(scanned.rows, rows);
    }

    #[test]
    fn rollback_forgets_rows_and_ticks() {
        let backend = InMemoryBackend::new();
        let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
        let tm = TransactionManager::new();
        {
            let mut txn = tm.begin();
            let version = CausalVersion::new().with(dev(1), Tick::new(5));
            ledger.record(&mut txn, content(2), &version).unwrap();
            txn.rollback();
        }
        assert!(ledger.is_empty());
        assert_eq!(ledger.last_tick(StoreIndex::new(2)), Tick::ZERO);
        assert!(backend.data().is_empty());
    }

    #[test]
    fn recording_is_idempotent() {
        let ledger = ImmigrantVersionLedger::open(InMemoryBackend::new(), &config()).unwrap();
        let tm = TransactionManager::new();
        let version = CausalVersion::new().with(dev(1), Tick::new(5));

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(2), &version).unwrap();
        txn.commit().unwrap();

        let mut txn = tm.begin();
        let again = ledger
            .record(&mut txn, content(2), &version.clone().with(dev(2), Tick::new(3)))
            .unwrap();
        txn.commit().unwrap();

        assert_eq!(again.len(), 1);
        assert_eq!(again[0].origin_device, dev(2));
        assert_eq!(again[0].immigrant_tick, Tick::new(2));
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn ticks_are_per_destination_store() {
        let ledger = ImmigrantVersionLedger::open(InMemoryBackend::new(), &config()).unwrap();
        let tm = TransactionManager::new();
        let version = CausalVersion::new().with(dev(1), Tick::new(5)).with(dev(2), Tick::new(7));

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(2), &version).unwrap();
        ledger.record(&mut txn, content(3), &version).unwrap();
        txn.commit().unwrap();

        assert_eq!(ledger.last_tick(StoreIndex::new(2)), Tick::new(2));
        assert_eq!(ledger.last_tick(StoreIndex::new(3)), Tick::new(2));
        let since = ledger.rows_since(StoreIndex::new(2), Tick::new(1));
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].immigrant_tick, Tick::new(2));
    }

    #[test]
    fn already_applied_uses_carried_ticks() {
        let ledger = ImmigrantVersionLedger::open(InMemoryBackend::new(), &config()).unwrap();
        let tm = TransactionManager::new();
        let mut txn = tm.begin();
        ledger
            .record(&mut txn, content(2), &CausalVersion::new().with(dev(1), Tick::new(5)))
            .unwrap();
        txn.commit().unwrap();

        let remote = CausalVersion::new()
            .with(dev(1), Tick::new(4))
            .with(dev(2), Tick::new(1));
        let covered = ledger.already_applied(content(2), &remote);
        assert_eq!(covered, CausalVersion::new().with(dev(1), Tick::new(4)));

        let newer = CausalVersion::new().with(dev(1), Tick::new(6));
        assert!(ledger.already_applied(content(2), &newer).is_zero());
        assert!(ledger.already_applied(content(3), &remote).is_zero());
        assert_eq!(
            ledger.immigrant_version(content(2)),
            CausalVersion::new().with(dev(0xAA), Tick::new(1))
        );
    }

    #[test]
    fn torn_tail_is_truncated_on_open() {
        let backend = InMemoryBackend::new();
        {
            let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
            let tm = TransactionManager::new();
            let mut txn = tm.begin();
            ledger
                .record(&mut txn, content(2), &CausalVersion::new().with(dev(1), Tick::new(5)))
                .unwrap();
            txn.commit().unwrap();
        }
        let good_len = backend.data().len();
        let mut torn = backend.data();
        let frame = encode_frame(&[ImmigrantTickRow {
            socid: content(2),
            origin_device: dev(3),
            origin_tick: Tick::new(1),
            immigrant_device: dev(0xAA),
            immigrant_tick: Tick::new(2),
        }])
        .unwrap();
        torn.extend_from_slice(&frame[..frame.len() - 3]);

        let backend = InMemoryBackend::with_data(torn);
        let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(backend.data().len(), good_len);
        assert_eq!(ledger.last_tick(StoreIndex::new(2)), Tick::new(1));
    }

    #[test]
    fn damaged_frame_refuses_to_open() {
        let backend = InMemoryBackend::new();
        {
            let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
            let tm = TransactionManager::new();
            for tick in 1..=2 {
                let mut txn = tm.begin();
                ledger
                    .record(&mut txn, content(2), &CausalVersion::new().with(dev(1), Tick::new(tick)))
                    .unwrap();
                txn.commit().unwrap();
            }
        }
        let mut bytes = backend.data();
        bytes[HEADER_SIZE + 1] ^= 0xFF;

        let err = ImmigrantVersionLedger::open(InMemoryBackend::with_data(bytes), &config())
            .unwrap_err();
        assert!(matches!(err, CoreError::LedgerCorruption { offset: 0, .. }));
    }

    /// Shares an in-memory log and fails appends or syncs on demand.
    #[derive(Debug, Clone)]
    struct FlakyBackend {
        inner: InMemoryBackend,
        appends_left: Arc<Mutex<usize>>,
        fail_sync: bool,
    }

    impl FlakyBackend {
        fn new(appends: usize, fail_sync: bool) -> Self {
            Self {
                inner: InMemoryBackend::new(),
                appends_left: Arc::new(Mutex::new(appends)),
                fail_sync,
            }
        }
    }

    impl StorageBackend for FlakyBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            self.inner.read_at(offset, len)
        }
        fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
            let mut left = self.appends_left.lock();
            if *left == 0 {
                return Err(StorageError::ReadOnly);
            }
            *left -= 1;
            self.inner.append(data)
        }
        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }
        fn sync(&mut self) -> StorageResult<()> {
            if self.fail_sync {
                return Err(StorageError::Io(std::io::Error::other("disk gone")));
            }
            Ok(())
        }
        fn size(&self) -> StorageResult<u64> {
            self.inner.size()
        }
        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.inner.truncate(new_size)
        }
    }

    #[test]
    fn failed_append_rolls_back() {
        let ledger = ImmigrantVersionLedger::open(FlakyBackend::new(0, false), &config()).unwrap();
        let tm = TransactionManager::new();
        let mut txn = tm.begin();
        ledger
            .record(&mut txn, content(2), &CausalVersion::new().with(dev(1), Tick::new(5)))
            .unwrap();
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn one_frame_per_transaction() {
        let backend = InMemoryBackend::new();
        let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
        let tm = TransactionManager::new();
        let version = CausalVersion::new().with(dev(1), Tick::new(5));

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(2), &version).unwrap();
        ledger.record(&mut txn, content(3), &version).unwrap();
        txn.commit().unwrap();

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(4), &version).unwrap();
        txn.commit().unwrap();

        let scanned = scan(&backend.data()).unwrap();
        assert_eq!(scanned.frames, 2);
        assert_eq!(scanned.rows.len(), 3);
    }

    #[test]
    fn multi_component_commit_is_all_or_nothing() {
        // Room for exactly one frame.
        let backend = FlakyBackend::new(1, false);
        let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
        let tm = TransactionManager::new();
        let version = CausalVersion::new().with(dev(1), Tick::new(5));

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(2), &version).unwrap();
        ledger.record(&mut txn, content(3), &version).unwrap();
        txn.commit().unwrap();

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(4), &version).unwrap();
        ledger.record(&mut txn, content(5), &version).unwrap();
        assert!(txn.commit().is_err());
        assert_eq!(ledger.len(), 2);
        drop(ledger);

        let reopened =
            ImmigrantVersionLedger::open(InMemoryBackend::with_data(backend.inner.data()), &config())
                .unwrap();
        assert_eq!(reopened.len(), 2);
        assert!(reopened.rows_for(content(4)).is_empty());
        assert!(reopened.rows_for(content(5)).is_empty());
        assert_eq!(reopened.last_tick(StoreIndex::new(2)), Tick::new(1));
    }

    #[test]
    fn failed_sync_cuts_the_frame_back() {
        let backend = FlakyBackend::new(usize::MAX, true);
        let ledger = ImmigrantVersionLedger::open(backend.clone(), &config()).unwrap();
        let tm = TransactionManager::new();
        let version = CausalVersion::new().with(dev(1), Tick::new(5));

        let mut txn = tm.begin();
        ledger.record(&mut txn, content(2), &version).unwrap();
        ledger.record(&mut txn, content(3), &version).unwrap();
        let err = txn.commit().unwrap_err();
        assert!(matches!(err, CoreError::Storage(_) | CoreError::Io(_)));
        assert_eq!(tm.rolled_back_count(), 1);

        assert!(ledger.is_empty());
        assert!(backend.inner.data().is_empty());

        // The next transaction opens a fresh frame.
        let mut txn = tm.begin();
        let rows = ledger.record(&mut txn, content(2), &version).unwrap();
        assert_eq!(rows[0].immigrant_tick, Tick::new(1));
    }
}
