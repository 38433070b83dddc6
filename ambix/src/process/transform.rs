//! Matrix application to interleaved sample streams.

use crate::structs::matrix::Matrix;
use crate::structs::sample::Sample;
use crate::utils::errors::MatrixError;

/// Multiplies every frame of `source` by `matrix`.
///
/// Each frame reads `matrix.cols()` samples from `source` and writes
/// `matrix.rows()` samples to `dest`. Accumulation happens in `f32`; integer
/// outputs are truncated toward zero. An empty matrix leaves `dest` untouched.
pub fn multiply_frames<S: Sample>(
    dest: &mut [S],
    matrix: &Matrix,
    source: &[S],
    frames: usize,
) -> Result<(), MatrixError> {
    if matrix.is_empty() || frames == 0 {
        return Ok(());
    }
    let (rows, cols) = (matrix.rows(), matrix.cols());

    let needed_source = frames * cols;
    if source.len() < needed_source {
        return Err(MatrixError::BufferTooShort {
            expected: needed_source,
            actual: source.len(),
        });
    }
    let needed_dest = frames * rows;
    if dest.len() < needed_dest {
        return Err(MatrixError::BufferTooShort {
            expected: needed_dest,
            actual: dest.len(),
        });
    }

    for (out, input) in dest[..needed_dest]
        .chunks_exact_mut(rows)
        .zip(source[..needed_source].chunks_exact(cols))
    {
        for (r, sample) in out.iter_mut().enumerate() {
            let sum = matrix
                .row(r)
                .iter()
                .zip(input)
                .fold(0f32, |acc, (&m, &s)| acc + m * s.to_f32());
            *sample = S::from_f32(sum);
        }
    }

    Ok(())
}
