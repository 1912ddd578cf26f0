//! Durability mode for log appends.
//!
//! Defines when appended log entries reach stable storage.

use serde::{Deserialize, Serialize};

/// Durability mode for the transaction log.
///
/// # Mode Comparison
///
/// | Mode | Log file | fsync | Survives |
/// |------|----------|-------|----------|
/// | None | no | never | nothing |
/// | Buffered | yes | on `sync()` / compaction | process crash |
/// | Strict | yes | every append | process crash and power loss |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurabilityMode {
    /// No durability - records and queues are lost when the store is dropped.
    ///
    /// Bypasses the log entirely. Use case: tests, development.
    None,

    /// Write every entry to the OS before returning, without fsync.
    ///
    /// A crashed process loses nothing; a crashed machine may lose the
    /// most recent appends.
    #[default]
    Buffered,

    /// fsync after every append.
    ///
    /// Use when an in-flight transaction record must never be lost.
    Strict,
}

impl DurabilityMode {
    /// Check if this mode writes a log file.
    ///
    /// Returns false for None mode, true for all others.
    pub fn requires_log(&self) -> bool {
        !matches!(self, DurabilityMode::None)
    }

    /// Check if this mode requires fsync on every append.
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, DurabilityMode::Strict)
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            DurabilityMode::None => "No durability (all state lost on exit)",
            DurabilityMode::Buffered => "Buffered writes (survives process crash)",
            DurabilityMode::Strict => "fsync per append (safest, slowest)",
        }
    }
}
