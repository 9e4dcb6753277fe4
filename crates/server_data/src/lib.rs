#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

//! Sanction state handling on top of the profile and violation store.

pub mod ban_gate;
pub mod content;
pub mod recorder;
pub mod store;

#[cfg(test)]
pub(crate) mod fake;

pub use ban_gate::BanGate;
pub use content::{ContentStore, FileError};
pub use recorder::{SanctionOutcome, ViolationRecorder};
pub use store::{DataError, DatabaseSanctionStore, SanctionStore};

#[derive(thiserror::Error, Debug)]
pub enum SanctionError {
    #[error("Failed to record violation")]
    RecordViolation,
    #[error("Failed to apply sanction")]
    ApplySanction,
    #[error("Failed to read ban state")]
    ReadBanState,
    #[error("Failed to unban user")]
    Unban,
}
