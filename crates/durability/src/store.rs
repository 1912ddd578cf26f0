//! Log-backed durable store
//!
//! [`FileStore`] implements both [`RecordStore`] and [`QueueStore`] on top of
//! one append-only log. Every mutation is appended to the log first and
//! applied to the in-memory view second, so the view never runs ahead of what
//! a restart would rebuild.
//!
//! ## Recovery
//!
//! [`FileStore::open`] replays the log from the start:
//!
//! 1. Decode frames in order and apply them to the in-memory view
//! 2. A damaged final frame (crash during append) is cut off and logged
//! 3. Damage anywhere before the final frame fails the open with
//!    [`Error::Corruption`]; the log is left untouched for inspection
//!
//! ## Failed appends
//!
//! A write or sync error cuts the log back to its last whole frame before
//! the error is returned, so later appends never land behind a torn frame.
//! If that cut fails too, the store refuses every further write until
//! [`FileStore::compact`] rebuilds the log from the in-memory view.
//!
//! ## Compaction
//!
//! Deleted records and queues stay in the log until [`FileStore::compact`]
//! rewrites it with live state only.

use crate::encoding::{decode_entry, encode_entry, DecodeError, FRAME_HEADER_SIZE};
use crate::mode::DurabilityMode;
use crate::wal::WalEntry;
use byteorder::{ByteOrder, LittleEndian};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tcc_core::{Error, Participant, Result, TransactionId, TransactionRecord};
use tcc_storage::{QueueStore, RecordStore};
use tracing::{debug, error, info, warn};

/// Log file name inside the store directory
pub const LOG_FILENAME: &str = "tcc.log";

const COMPACT_FILENAME: &str = "tcc.log.compact";

/// Statistics from replaying the log at open time
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryStats {
    /// Log entries replayed
    pub entries_replayed: u64,
    /// Transaction records present after replay
    pub records_recovered: usize,
    /// Participant queues present after replay
    pub queues_recovered: usize,
    /// Bytes cut off the tail of the log (torn final write)
    pub truncated_bytes: u64,
}

impl RecoveryStats {
    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Recovery complete: {} entries replayed, {} records, {} queues, {} bytes truncated",
            self.entries_replayed,
            self.records_recovered,
            self.queues_recovered,
            self.truncated_bytes
        )
    }

    /// Check if recovery had to discard anything
    pub fn has_issues(&self) -> bool {
        self.truncated_bytes > 0
    }
}

/// Materialized state of both stores
#[derive(Debug, Default)]
struct State {
    records: HashMap<TransactionId, TransactionRecord>,
    queues: HashMap<String, Vec<Vec<u8>>>,
}

impl State {
    fn apply(&mut self, entry: WalEntry) {
        match entry {
            WalEntry::SaveRecord(record) => {
                self.records.insert(record.id, record);
            }
            WalEntry::DeleteRecord { id } => {
                self.records.remove(&id);
            }
            WalEntry::PushParticipant { key, participant } => {
                self.queues.entry(key).or_default().push(participant);
            }
            WalEntry::DeleteQueue { key } => {
                self.queues.remove(&key);
            }
        }
    }

    /// Entries that rebuild this state from an empty log
    fn snapshot_entries(&self) -> Vec<WalEntry> {
        let mut records: Vec<_> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let mut keys: Vec<_> = self.queues.keys().cloned().collect();
        keys.sort();

        let mut entries: Vec<WalEntry> = records.into_iter().map(WalEntry::SaveRecord).collect();
        for key in keys {
            for participant in &self.queues[&key] {
                entries.push(WalEntry::PushParticipant {
                    key: key.clone(),
                    participant: participant.clone(),
                });
            }
        }
        entries
    }
}

struct Inner {
    state: State,
    log: Option<File>,
    /// Length of the log up to its last whole frame
    log_len: u64,
    /// A failed append could not be cut back out of the log
    poisoned: bool,
}

impl Inner {
    /// Cut the log back to `log_len` after a failed write or sync
    fn discard_partial_append(&mut self) {
        let log = match self.log.as_ref() {
            Some(log) => log,
            None => return,
        };
        match log.set_len(self.log_len) {
            Ok(()) => warn!(len = self.log_len, "Rolled back failed append to transaction log"),
            Err(e) => {
                error!(
                    len = self.log_len,
                    error = %e,
                    "Could not roll back failed append, refusing further writes"
                );
                self.log = None;
                self.poisoned = true;
            }
        }
    }
}

/// Durable record and queue store backed by an append-only log
pub struct FileStore {
    inner: Mutex<Inner>,
    mode: DurabilityMode,
    dir: Option<PathBuf>,
    recovery: RecoveryStats,
}

impl FileStore {
    /// Open (or create) a store in `dir`, replaying any existing log
    ///
    /// With [`DurabilityMode::None`] nothing is read or written and the
    /// store behaves like [`FileStore::ephemeral`].
    pub fn open(dir: impl AsRef<Path>, mode: DurabilityMode) -> Result<Self> {
        if !mode.requires_log() {
            return Ok(Self::ephemeral());
        }

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let log_path = dir.join(LOG_FILENAME);

        info!(path = %log_path.display(), mode = ?mode, "Opening transaction log");
        let (state, recovery) = replay(&log_path)?;
        info!("{}", recovery.summary());

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        let log_len = log.metadata()?.len();

        Ok(FileStore {
            inner: Mutex::new(Inner {
                state,
                log: Some(log),
                log_len,
                poisoned: false,
            }),
            mode,
            dir: Some(dir),
            recovery,
        })
    }

    /// Create a store with no log file
    pub fn ephemeral() -> Self {
        FileStore {
            inner: Mutex::new(Inner {
                state: State::default(),
                log: None,
                log_len: 0,
                poisoned: false,
            }),
            mode: DurabilityMode::None,
            dir: None,
            recovery: RecoveryStats::default(),
        }
    }

    /// Durability mode in effect
    pub fn mode(&self) -> DurabilityMode {
        self.mode
    }

    /// Directory holding the log, if any
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// What replay found when the store was opened
    pub fn recovery_stats(&self) -> &RecoveryStats {
        &self.recovery
    }

    /// Number of live transaction records
    pub fn record_count(&self) -> usize {
        self.inner.lock().state.records.len()
    }

    /// Number of participants queued under `key`
    pub fn queue_len(&self, key: &str) -> usize {
        self.inner
            .lock()
            .state
            .queues
            .get(key)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Force everything appended so far to stable storage
    pub fn sync(&self) -> Result<()> {
        let inner = self.inner.lock();
        if let Some(log) = inner.log.as_ref() {
            log.sync_data()?;
        }
        Ok(())
    }

    /// Rewrite the log so it holds only live records and queues
    ///
    /// The new log is written beside the old one, synced, and renamed over
    /// it, so a crash mid-compaction leaves the old log intact. Returns the
    /// number of entries in the new log.
    ///
    /// Also lifts the write refusal left by an append that could not be
    /// rolled back, since the new log is rebuilt from the in-memory view.
    pub fn compact(&self) -> Result<u64> {
        let mut inner = self.inner.lock();
        let dir = match &self.dir {
            Some(dir) => dir,
            None => return Ok(0),
        };

        let log_path = dir.join(LOG_FILENAME);
        let tmp_path = dir.join(COMPACT_FILENAME);
        let entries = inner.state.snapshot_entries();

        let mut written = 0u64;
        {
            let mut tmp = File::create(&tmp_path)?;
            for entry in &entries {
                let frame = encode_entry(entry)?;
                tmp.write_all(&frame)?;
                written += frame.len() as u64;
            }
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &log_path)?;
        sync_dir(dir)?;

        inner.log = Some(OpenOptions::new().append(true).open(&log_path)?);
        inner.log_len = written;
        inner.poisoned = false;

        info!(
            entries = entries.len(),
            records = inner.state.records.len(),
            queues = inner.state.queues.len(),
            "Compacted transaction log"
        );
        Ok(entries.len() as u64)
    }

    /// Append `entry` to the log, then apply it to the in-memory view
    ///
    /// On a write or sync error the partial frame is cut off and the view is
    /// left unchanged, so the log and the view agree on what failed.
    fn append(&self, entry: WalEntry) -> Result<()> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        if inner.poisoned {
            return Err(Error::Storage(
                "transaction log refused write after an unrecoverable append failure".to_string(),
            ));
        }

        if let Some(log) = inner.log.as_mut() {
            let frame = encode_entry(&entry)?;
            let written = log.write_all(&frame).and_then(|()| {
                if self.mode.requires_immediate_fsync() {
                    log.sync_data()
                } else {
                    Ok(())
                }
            });
            if let Err(e) = written {
                inner.discard_partial_append();
                return Err(e.into());
            }
            inner.log_len += frame.len() as u64;
        }

        inner.state.apply(entry);
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("mode", &self.mode)
            .field("dir", &self.dir)
            .field("record_count", &self.record_count())
            .finish()
    }
}

impl RecordStore for FileStore {
    fn save(&self, record: &TransactionRecord) -> Result<()> {
        self.append(WalEntry::SaveRecord(record.clone()))
    }

    fn find_by_id(&self, id: &TransactionId) -> Result<Option<TransactionRecord>> {
        Ok(self.inner.lock().state.records.get(id).cloned())
    }

    fn delete_by_id(&self, id: &TransactionId) -> Result<()> {
        self.append(WalEntry::DeleteRecord { id: *id })
    }

    fn list(&self) -> Result<Vec<TransactionRecord>> {
        let mut records: Vec<_> = self.inner.lock().state.records.values().cloned().collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(records)
    }
}

impl QueueStore for FileStore {
    fn push_back(&self, key: &str, participant: &Participant) -> Result<()> {
        let encoded = participant.encode()?;
        self.append(WalEntry::PushParticipant {
            key: key.to_string(),
            participant: encoded,
        })
    }

    fn read_all(&self, key: &str) -> Result<Vec<Participant>> {
        let encoded = match self.inner.lock().state.queues.get(key) {
            Some(queue) => queue.clone(),
            None => return Ok(Vec::new()),
        };
        encoded.iter().map(|bytes| Participant::decode(bytes)).collect()
    }

    fn delete_key(&self, key: &str) -> Result<()> {
        self.append(WalEntry::DeleteQueue {
            key: key.to_string(),
        })
    }
}

/// Whether the frame starting at `buf` would run to (or past) the end of `buf`
fn reaches_end(buf: &[u8]) -> bool {
    if buf.len() < FRAME_HEADER_SIZE {
        return true;
    }
    FRAME_HEADER_SIZE + LittleEndian::read_u32(&buf[0..4]) as usize >= buf.len()
}

/// Replay the log at `path` into a fresh state
fn replay(path: &Path) -> Result<(State, RecoveryStats)> {
    let mut state = State::default();
    let mut stats = RecoveryStats::default();

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "No transaction log found, starting empty");
            return Ok((state, stats));
        }
        Err(e) => return Err(e.into()),
    };

    let mut offset = 0usize;
    while offset < bytes.len() {
        match decode_entry(&bytes[offset..], offset as u64) {
            Ok((entry, consumed)) => {
                state.apply(entry);
                stats.entries_replayed += 1;
                offset += consumed;
            }
            Err(e) if e.is_torn_write() && reaches_end(&bytes[offset..]) => {
                let cut = (bytes.len() - offset) as u64;
                warn!(
                    path = %path.display(),
                    offset = offset,
                    bytes = cut,
                    error = %e,
                    "Discarding torn entry at end of transaction log"
                );
                truncate(path, offset as u64)?;
                stats.truncated_bytes = cut;
                break;
            }
            Err(e) => return Err(corruption(path, e)),
        }
    }

    stats.records_recovered = state.records.len();
    stats.queues_recovered = state.queues.len();
    Ok((state, stats))
}

fn truncate(path: &Path, len: u64) -> Result<()> {
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_len(len)?;
    file.sync_all()?;
    Ok(())
}

/// Make a rename inside `dir` durable
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}

fn corruption(path: &Path, e: DecodeError) -> Error {
    Error::Corruption(format!("{}: {}", path.display(), e))
}
