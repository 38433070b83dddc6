#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! Reader and writer for the Ambisonics Xchange (ambix) format, an ACN/SN3D
//! ambisonics layout stored in Apple CAF containers.
//!
//! ### File Formats
//!
//! - **Basic**: a full set of `(order+1)²` ambisonics channels, nothing else.
//! - **Extended**: a reduced set of stored channels plus an adaptor matrix
//!   (in a `uuid` chunk) that reconstructs the full set, followed by any
//!   number of extra non-ambisonics channels.
//!
//! Either format can be presented as the other on read. Presenting an
//! extended file as basic applies the adaptor matrix frame by frame.
//!
//! ## Quick Start
//!
//! 1. Open a file with [`process::read::AmbixReader`] or [`process::open`]
//! 2. Optionally compose a premultiply matrix with
//!    [`process::read::AmbixReader::set_premultiply_matrix`]
//! 3. Pull deinterleaved ambisonics and extra channels with
//!    [`process::read::AmbixReader::read_frames`]
//!
//! ```rust,no_run
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! use ambix::process::read::{AmbixReader, ReadOptions};
//! use ambix::structs::info::FileFormat;
//!
//! let file = BufReader::new(File::open("scene.caf")?);
//! let mut reader = AmbixReader::new(
//!     file,
//!     ReadOptions {
//!         format: FileFormat::Basic,
//!         ..Default::default()
//!     },
//! )?;
//!
//! let info = *reader.info();
//! let frames = 1024;
//! let mut ambi = vec![0f32; frames * info.ambi_channels as usize];
//! let mut extra = vec![0f32; frames * info.extra_channels as usize];
//!
//! loop {
//!     let read = reader.read_frames(&mut ambi, &mut extra, frames)?;
//!     if read == 0 {
//!         break;
//!     }
//!     // ambi now holds `read` frames of the full ambisonics set
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Byte order helpers shared by the container code and the derive macros.
pub mod byteorder;

/// Core Audio Format parsing and writing.
pub mod caf;

/// Opening, reading and writing ambix files.
///
/// 1. **Layout Resolution** ([`process`]): Decides the declared format from
///    adaptor chunks and channel counts.
///
/// 2. **Reading** ([`process::read`]): Presents a file as basic or extended.
///
/// 3. **Writing** ([`process::write`]): Validates the layout and stores the
///    adaptor matrix.
///
/// 4. **Frame Transform** ([`process::transform`]): Applies a matrix to
///    interleaved frames.
pub mod process;

/// Data structures of the ambix format.
///
/// - **Matrix** ([`structs::matrix`]): Dense matrices and pseudo-inverse
/// - **Adaptor Chunk** ([`structs::adaptor`]): `uuid` chunk codec
/// - **Furse-Malham** ([`structs::fuma`]): Legacy B-format conversion
/// - **Stream Info** ([`structs::info`]): File format and channel split
/// - **Samples** ([`structs::sample`]): Sample formats and conversion
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Error Handling** ([`utils::errors`]): Error types
/// - **Channel Arithmetic** ([`utils::order`]): Order and channel counts
pub mod utils;

pub use utils::errors::{AmbixError, Result};
