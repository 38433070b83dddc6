//! Adaptor matrix chunk codec.
//!
//! The adaptor matrix lives in a CAF `uuid` chunk. After the 16-byte
//! identifier the payload holds `rows: i32`, `cols: i32` and `rows * cols`
//! `f32` values in row-major order, all in the byte order the container
//! declares for its samples.
//!
//! Two identifiers are accepted on read. Early files used the ASCII bytes of
//! `IEM.AT/AMBIX/XML`; the current identifier is the name-based UUID (v5) of
//! `http://ambisonics.iem.at/xchange/format/1.0`. Only the current one is
//! written.

use crate::byteorder::Endianness;
use crate::caf::UuidChunk;
use crate::structs::matrix::Matrix;
use crate::utils::errors::ChunkError;
use crate::{join_bytes_be, join_bytes_le};

/// 1ad318c3-00e5-5576-be2d-0dca2460bc89
pub const AMBIX_UUID: [u8; 16] = [
    0x1a, 0xd3, 0x18, 0xc3, 0x00, 0xe5, 0x55, 0x76, 0xbe, 0x2d, 0x0d, 0xca, 0x24, 0x60, 0xbc, 0x89,
];

/// 49454d2e-4154-2f41-4d42-49582f584d4c
pub const AMBIX_UUID_DEPRECATED: [u8; 16] = *b"IEM.AT/AMBIX/XML";

const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkVersion {
    Deprecated,
    Current,
}

const RECOGNIZED: [([u8; 16], ChunkVersion); 2] = [
    (AMBIX_UUID_DEPRECATED, ChunkVersion::Deprecated),
    (AMBIX_UUID, ChunkVersion::Current),
];

/// Looks up a chunk identifier among the accepted adaptor identifiers.
pub fn recognize(uuid: &[u8; 16]) -> Option<ChunkVersion> {
    RECOGNIZED
        .iter()
        .find(|(known, _)| known == uuid)
        .map(|&(_, version)| version)
}

/// A decoded adaptor chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptorChunk {
    pub matrix: Matrix,
    pub version: ChunkVersion,
}

fn dimension(n: usize) -> Result<i32, ChunkError> {
    i32::try_from(n).map_err(|_| ChunkError::DimensionTooLarge(n))
}

/// Serializes `matrix` with the current identifier in the given byte order.
pub fn encode(matrix: &Matrix, endianness: Endianness) -> Result<UuidChunk, ChunkError> {
    let rows = dimension(matrix.rows())?;
    let cols = dimension(matrix.cols())?;
    let values = matrix.as_slice().to_vec();

    let payload = match endianness {
        Endianness::BigEndian => join_bytes_be!(rows, cols, values),
        Endianness::LittleEndian => join_bytes_le!(rows, cols, values),
    };

    Ok(UuidChunk {
        uuid: AMBIX_UUID,
        payload,
    })
}

/// Parses an adaptor chunk payload stored in `endianness`.
///
/// Bytes past the matrix values are ignored.
pub fn decode(
    uuid: &[u8; 16],
    payload: &[u8],
    endianness: Endianness,
) -> Result<AdaptorChunk, ChunkError> {
    let version = recognize(uuid).ok_or(ChunkError::UnknownUuid(*uuid))?;

    let Some((header, body)) = payload.split_first_chunk::<HEADER_LEN>() else {
        return Err(ChunkError::Truncated {
            expected: HEADER_LEN,
            actual: payload.len(),
        });
    };

    let swap = !endianness.is_native();
    let read_i32 = |bytes: [u8; 4]| {
        let v = i32::from_ne_bytes(bytes);
        if swap { v.swap_bytes() } else { v }
    };
    let rows = read_i32([header[0], header[1], header[2], header[3]]);
    let cols = read_i32([header[4], header[5], header[6], header[7]]);

    let invalid = ChunkError::InvalidDimensions { rows, cols };
    if rows <= 0 || cols <= 0 {
        return Err(invalid);
    }
    let count = (rows as usize).checked_mul(cols as usize).ok_or(invalid.clone())?;
    let data_len = count.checked_mul(4).ok_or(invalid)?;

    if body.len() < data_len {
        return Err(ChunkError::Truncated {
            expected: HEADER_LEN + data_len,
            actual: payload.len(),
        });
    }

    let words: Vec<u32> = body[..data_len]
        .chunks_exact(4)
        .map(|w| u32::from_ne_bytes([w[0], w[1], w[2], w[3]]))
        .collect();

    let mut matrix = Matrix::new(rows as usize, cols as usize);
    let filled = if swap {
        matrix.fill_swapped(&words)
    } else {
        let values: Vec<f32> = words.into_iter().map(f32::from_bits).collect();
        matrix.fill(&values)
    };
    // lengths were checked above
    filled.map_err(|_| ChunkError::Truncated {
        expected: HEADER_LEN + data_len,
        actual: payload.len(),
    })?;

    Ok(AdaptorChunk { matrix, version })
}
