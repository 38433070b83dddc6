//! Data structures of the ambix format.
//!
//! Contains the matrix type and its predefined fills, the adaptor matrix
//! chunk codec, stream information, and sample formats.

pub mod adaptor;
pub mod fuma;
pub mod info;
pub mod matrix;
pub mod sample;
