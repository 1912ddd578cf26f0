//! Main entry point for tcc.
//!
//! This module provides the `Tcc` struct, which owns the stores, the action
//! registry, and the coordinator, and wraps them in a global-transaction API.

use crate::config::TccConfig;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tcc_core::{Participant, TransactionId, TransactionRecord, Value};
use tcc_durability::{DurabilityMode, FileStore, RecoveryStats};
use tcc_engine::{
    ActionRegistry, CoordinatorMetrics, Handler, Resolution, TccAction, TccService,
    TransactionContext, TransactionCoordinator,
};
use tcc_storage::{InMemoryQueueStore, InMemoryRecordStore, QueueStore, RecordStore};
use tracing::{error, info};

/// A Try-Confirm-Cancel coordinator with its stores and handlers.
///
/// Create one using [`Tcc::open`], [`Tcc::ephemeral`] or [`Tcc::builder`],
/// register every participant service, then run business operations through
/// [`Tcc::global_transaction`].
///
/// # Example
///
/// ```ignore
/// use tcc::prelude::*;
///
/// let tcc = Tcc::builder()
///     .path("./tcc-data")
///     .strict()
///     .service(wallet.clone())
///     .open()?;
///
/// tcc.global_transaction(|ctx| {
///     wallet.try_deduct(&tcc, ctx, "alice", dec!(100))?;
///     wallet.try_credit(&tcc, ctx, "bob", dec!(100))?;
///     Ok::<_, tcc::Error>(())
/// })?;
/// ```
pub struct Tcc {
    coordinator: TransactionCoordinator,
    store: Option<Arc<FileStore>>,
}

impl Tcc {
    /// Open a coordinator whose records and queues live in `path`.
    ///
    /// Uses default settings (buffered durability mode).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::builder().path(path).open()
    }

    /// Create a coordinator with in-memory stores and no disk I/O.
    ///
    /// Transaction records are lost when the value is dropped.
    ///
    /// # Comparison
    ///
    /// | Method | Disk Files | Survives restart |
    /// |--------|------------|------------------|
    /// | `Tcc::ephemeral()` | None | No |
    /// | `Tcc::open(path)` | `path/tcc.log` | Yes |
    pub fn ephemeral() -> Self {
        Self::from_parts(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryQueueStore::new()),
            Arc::new(ActionRegistry::new()),
            None,
        )
    }

    /// Create a builder for coordinator configuration.
    pub fn builder() -> TccBuilder {
        TccBuilder::new()
    }

    fn from_parts(
        records: Arc<dyn RecordStore>,
        queue: Arc<dyn QueueStore>,
        registry: Arc<ActionRegistry>,
        store: Option<Arc<FileStore>>,
    ) -> Self {
        Tcc {
            coordinator: TransactionCoordinator::new(records, queue, registry),
            store,
        }
    }

    /// The underlying coordinator.
    pub fn coordinator(&self) -> &TransactionCoordinator {
        &self.coordinator
    }

    /// The action registry.
    pub fn registry(&self) -> &Arc<ActionRegistry> {
        self.coordinator.registry()
    }

    /// Register a participant service under its handler name.
    pub fn register_service<S: TccService>(&self, service: Arc<S>) {
        self.registry().register_service(service);
    }

    /// Register a handler under its own name.
    pub fn register_handler(&self, handler: Handler) {
        self.registry().register(handler);
    }

    /// Run `body` as one global transaction.
    ///
    /// Begins a transaction on a fresh context, runs `body`, then commits if
    /// it returned `Ok` and rolls back if it returned `Err`. The body's error
    /// is what the caller sees; a rollback that itself fails is logged.
    /// A commit failure (a confirm action failing) is returned as `E`.
    pub fn global_transaction<T, E, F>(&self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&TransactionContext) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut ctx = TransactionContext::new();
        self.coordinator
            .begin(&mut ctx)
            .map_err(|e| E::from(Error::from(e)))?;

        match body(&ctx) {
            Ok(output) => {
                self.coordinator
                    .commit(&mut ctx)
                    .map_err(|e| E::from(Error::from(e)))?;
                Ok(output)
            }
            Err(e) => {
                if let Err(rollback_err) = self.coordinator.rollback(&mut ctx) {
                    error!(error = %rollback_err, "Rollback after failed try did not complete");
                }
                Err(e)
            }
        }
    }

    /// Start a transaction on `ctx`.
    pub fn begin(&self, ctx: &mut TransactionContext) -> Result<TransactionId> {
        Ok(self.coordinator.begin(ctx)?)
    }

    /// Append a participant to the transaction active on `ctx`.
    pub fn register_participant(
        &self,
        ctx: &TransactionContext,
        participant: Participant,
    ) -> Result<()> {
        Ok(self.coordinator.register_participant(ctx, participant)?)
    }

    /// Confirm every participant of the transaction active on `ctx`.
    pub fn commit(&self, ctx: &mut TransactionContext) -> Result<Resolution> {
        Ok(self.coordinator.commit(ctx)?)
    }

    /// Cancel every participant of the transaction active on `ctx`.
    pub fn rollback(&self, ctx: &mut TransactionContext) -> Result<Resolution> {
        Ok(self.coordinator.rollback(ctx)?)
    }

    /// Run a try body and register its participant if it succeeds.
    ///
    /// See [`TransactionCoordinator::try_action`].
    pub fn try_action<T, E, F>(
        &self,
        ctx: &TransactionContext,
        action: &TccAction,
        args: Vec<Value>,
        body: F,
    ) -> std::result::Result<T, E>
    where
        F: FnOnce() -> std::result::Result<T, E>,
        E: From<Error>,
    {
        self.coordinator
            .try_action(ctx, action, args, || body().map_err(TryFailure::Body))
            .map_err(|failure| match failure {
                TryFailure::Body(e) => e,
                TryFailure::Register(e) => E::from(Error::from(e)),
            })
    }

    /// Records of every unresolved transaction, oldest first.
    pub fn pending_transactions(&self) -> Result<Vec<TransactionRecord>> {
        Ok(self.coordinator.pending_transactions()?)
    }

    /// Participants queued for a transaction, in registration order.
    pub fn participants(&self, id: &TransactionId) -> Result<Vec<Participant>> {
        Ok(self.coordinator.participants(id)?)
    }

    /// Get coordinator metrics.
    pub fn metrics(&self) -> CoordinatorMetrics {
        self.coordinator.metrics()
    }

    /// Directory holding the transaction log, if any.
    pub fn path(&self) -> Option<&Path> {
        self.store.as_ref().and_then(|s| s.dir())
    }

    /// Get the current durability mode.
    pub fn durability_mode(&self) -> DurabilityMode {
        self.store
            .as_ref()
            .map(|s| s.mode())
            .unwrap_or(DurabilityMode::None)
    }

    /// Check if this coordinator keeps nothing on disk.
    pub fn is_ephemeral(&self) -> bool {
        self.store.is_none()
    }

    /// What replay found when the log was opened.
    pub fn recovery_stats(&self) -> Option<&RecoveryStats> {
        self.store.as_ref().map(|s| s.recovery_stats())
    }

    /// Force all log appends to stable storage.
    ///
    /// Only needed in buffered mode; a no-op when ephemeral.
    pub fn flush(&self) -> Result<()> {
        match &self.store {
            Some(store) => Ok(store.sync()?),
            None => Ok(()),
        }
    }

    /// Rewrite the log so it holds only unresolved transactions.
    pub fn compact(&self) -> Result<()> {
        if let Some(store) = &self.store {
            store.compact()?;
        }
        Ok(())
    }
}

/// Splits a try body's own error from a registration error, which the
/// caller sees converted through [`Error`]
enum TryFailure<E> {
    Body(E),
    Register(tcc_core::Error),
}

impl<E> From<tcc_core::Error> for TryFailure<E> {
    fn from(e: tcc_core::Error) -> Self {
        TryFailure::Register(e)
    }
}

impl std::fmt::Debug for Tcc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tcc")
            .field("coordinator", &self.coordinator)
            .field("path", &self.path())
            .field("durability", &self.durability_mode())
            .finish()
    }
}

/// Builder for coordinator configuration.
///
/// # Example
///
/// ```ignore
/// // Production: disk-backed, fsync on every append
/// let tcc = Tcc::builder().path("./tcc-data").strict().open()?;
///
/// // From a config file
/// let tcc = Tcc::builder().config(TccConfig::load("tcc.toml")?).open()?;
///
/// // Unit testing: no disk at all
/// let tcc = Tcc::ephemeral();
/// ```
pub struct TccBuilder {
    path: Option<PathBuf>,
    mode: DurabilityMode,
    compact_on_open: bool,
    registry: Arc<ActionRegistry>,
}

impl TccBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        TccBuilder {
            path: None,
            mode: DurabilityMode::default(),
            compact_on_open: false,
            registry: Arc::new(ActionRegistry::new()),
        }
    }

    /// Set the directory for the transaction log.
    ///
    /// Without a path the coordinator uses in-memory stores.
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// fsync after every log append.
    pub fn strict(mut self) -> Self {
        self.mode = DurabilityMode::Strict;
        self
    }

    /// Write appends to the OS without fsync (default).
    pub fn buffered(mut self) -> Self {
        self.mode = DurabilityMode::Buffered;
        self
    }

    /// Keep everything in memory even when a path is set.
    pub fn no_durability(mut self) -> Self {
        self.mode = DurabilityMode::None;
        self
    }

    /// Rewrite the log with live state only after replay.
    pub fn compact_on_open(mut self, compact: bool) -> Self {
        self.compact_on_open = compact;
        self
    }

    /// Apply a file configuration.
    ///
    /// A `data_dir` in the config replaces any path set earlier.
    pub fn config(mut self, config: TccConfig) -> Self {
        if let Some(dir) = config.data_dir {
            self.path = Some(dir);
        }
        self.mode = config.durability;
        self.compact_on_open = config.compact_on_open;
        self
    }

    /// Register a participant service.
    pub fn service<S: TccService>(self, service: Arc<S>) -> Self {
        self.registry.register_service(service);
        self
    }

    /// Register a handler.
    pub fn handler(self, handler: Handler) -> Self {
        self.registry.register(handler);
        self
    }

    /// Open the coordinator.
    ///
    /// With a path and a logging durability mode this replays the existing
    /// log, so transactions left unresolved by a previous process show up in
    /// [`Tcc::pending_transactions`].
    pub fn open(self) -> Result<Tcc> {
        let path = match self.path {
            Some(path) if self.mode.requires_log() => path,
            _ => {
                info!("Opening ephemeral transaction coordinator");
                return Ok(Tcc::from_parts(
                    Arc::new(InMemoryRecordStore::new()),
                    Arc::new(InMemoryQueueStore::new()),
                    self.registry,
                    None,
                ));
            }
        };

        let store = Arc::new(FileStore::open(&path, self.mode)?);
        if self.compact_on_open {
            store.compact()?;
        }

        let pending = store.record_count();
        info!(
            path = %path.display(),
            mode = self.mode.description(),
            pending = pending,
            "Opened transaction coordinator"
        );

        Ok(Tcc::from_parts(
            store.clone(),
            store.clone(),
            self.registry,
            Some(store),
        ))
    }
}

impl Default for TccBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<TccConfig> for TccBuilder {
    fn from(config: TccConfig) -> Self {
        TccBuilder::new().config(config)
    }
}
