//! Conversion between Furse-Malham (FuMa) sets and ambix.
//!
//! FuMa orders channels as `W X Y Z R S T U V K L M N O P Q` and scales them
//! with the MaxN convention; ambix uses ACN ordering with SN3D weights. Both
//! directions are built as `expand · weights · reduce`, where `reduce` picks
//! the FuMa channels present in a mixed-order layout and `expand` truncates
//! the third-order ambix set to the smallest full set covering them.

use crate::structs::matrix::Matrix;
use crate::utils::errors::MatrixError;

/// FuMa channel index carried by each ACN channel.
const ACN_TO_FUMA: [usize; 16] = [0, 2, 3, 1, 8, 6, 4, 5, 7, 15, 13, 11, 9, 10, 12, 14];

/// Gains applied to FuMa channels when converting to ambix, indexed by ACN.
fn fuma_weights() -> [f32; 16] {
    let sqrt2 = 2f64.sqrt();
    let sqrt3_4 = 3f64.sqrt() / 2.0;
    let sqrt5_8 = (5f64 / 2.0).sqrt() / 2.0;
    let sqrt32_45 = 4.0 * (2f64 / 5.0).sqrt() / 3.0;
    let sqrt5_9 = 5f64.sqrt() / 3.0;

    [
        sqrt2, -1.0, 1.0, -1.0, sqrt3_4, -sqrt3_4, 1.0, -sqrt3_4, sqrt3_4, -sqrt5_8, sqrt5_9,
        -sqrt32_45, 1.0, -sqrt32_45, sqrt5_9, -sqrt5_8,
    ]
    .map(|w| w as f32)
}

/// FuMa channels present in each supported layout, keyed by channel count.
fn layout(channels: usize) -> Option<(&'static [usize], usize)> {
    // (fuma channel indices, full-set size)
    let entry: (&'static [usize], usize) = match channels {
        1 => (&[0], 1),
        3 => (&[0, 1, 2], 4),
        4 => (&[0, 1, 2, 3], 4),
        5 => (&[0, 1, 2, 4, 5], 9),
        6 => (&[0, 1, 2, 3, 4, 5], 9),
        7 => (&[0, 1, 2, 4, 5, 14, 15], 16),
        8 => (&[0, 1, 2, 3, 4, 5, 14, 15], 16),
        9 => (&[0, 1, 2, 3, 4, 5, 6, 7, 8], 9),
        11 => (&[0, 1, 2, 3, 4, 5, 6, 7, 8, 14, 15], 16),
        16 => (&[0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15], 16),
        _ => return None,
    };
    Some(entry)
}

/// Third-order FuMa → ambix: `diag(w) · route`.
fn weight_order() -> Matrix {
    let weights = fuma_weights();
    let mut m = Matrix::new(16, 16);
    for (acn, &fuma) in ACN_TO_FUMA.iter().enumerate() {
        m.set(acn, fuma, weights[acn]);
    }
    m
}

/// Third-order ambix → FuMa: the exact inverse of [`weight_order`].
fn inverse_weight_order() -> Matrix {
    let weights = fuma_weights();
    let mut m = Matrix::new(16, 16);
    for (acn, &fuma) in ACN_TO_FUMA.iter().enumerate() {
        m.set(fuma, acn, 1.0 / weights[acn]);
    }
    m
}

/// Adaptor from `channels` FuMa channels to the smallest covering ambix set.
///
/// The result has the full-set channel count as rows and `channels` columns,
/// so it can be stored directly as the adaptor matrix of an extended file.
pub fn fuma_to_ambix(channels: usize) -> Result<Matrix, MatrixError> {
    let (reducer, full) = layout(channels).ok_or(MatrixError::UnsupportedLayout(channels))?;

    let mut reduce = Matrix::new(16, channels);
    for (col, &fuma) in reducer.iter().enumerate() {
        reduce.set(fuma, col, 1.0);
    }
    let expand = Matrix::identity(full, 16);

    expand.multiply(&weight_order())?.multiply(&reduce)
}

/// Encoder from the covering ambix set back to `channels` FuMa channels.
pub fn ambix_to_fuma(channels: usize) -> Result<Matrix, MatrixError> {
    let (reducer, full) = layout(channels).ok_or(MatrixError::UnsupportedLayout(channels))?;

    let mut reduce = Matrix::new(channels, 16);
    for (row, &fuma) in reducer.iter().enumerate() {
        reduce.set(row, fuma, 1.0);
    }
    let expand = Matrix::identity(16, full);

    reduce
        .multiply(&inverse_weight_order())?
        .multiply(&expand)
}
