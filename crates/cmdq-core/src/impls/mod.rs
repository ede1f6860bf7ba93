//! Impls - concrete implementations of the ports.
//!
//! - **ResultHandle**: set-once `ResultSink` that submitters poll or await.

pub mod result_handle;

pub use self::result_handle::ResultHandle;
