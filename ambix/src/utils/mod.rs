//! Utility functions and supporting infrastructure.
//!
//! Provides error types and the order/channel-count arithmetic shared by the
//! reader and the writer.

pub mod errors;
pub mod order;
