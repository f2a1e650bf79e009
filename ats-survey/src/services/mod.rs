//! Survey services
//!
//! - `pool_scanner`: audio pool discovery
//! - `clip_selector`: variant collapsing and per-participant assignment
//! - `session_store`: session-scoped assignment cache
//! - `response_sink`: response persistence with local fallback

pub mod clip_selector;
pub mod pool_scanner;
pub mod response_sink;
pub mod session_store;

pub use clip_selector::{collapse_variants, ClipAssignment, ClipSelector};
pub use pool_scanner::{AudioFile, ClipPool, PoolScanner, ScanError};
pub use response_sink::{ResponseSink, SaveReceipt, StorageTarget};
pub use session_store::{ParticipantSession, SessionError, SessionStore};
