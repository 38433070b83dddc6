//! Dense row-major matrices used for adaptor and premultiply operations.
//!
//! A [`Matrix`] owns exactly `rows * cols` single-precision values. Requesting
//! a zero dimension yields the empty 0x0 matrix without storage, and every
//! operation that produces a matrix of a different shape reallocates its
//! destination instead of failing.
//!
//! ## Pseudo-inverse
//!
//! [`Matrix::pinv`] computes the Moore–Penrose pseudo-inverse of a full-rank
//! matrix through a Householder QR decomposition carried out in `f64`.
//! Rank-deficient input is reported as [`MatrixError::RankDeficient`].

use std::ops::Index;

use crate::byteorder::swap_f32;
use crate::structs::fuma;
use crate::utils::errors::MatrixError;

/// Predefined contents for [`Matrix::fill_kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    /// All zeros.
    Zero,
    /// All ones.
    One,
    /// Ones on the main diagonal.
    Identity,
    /// Furse-Malham to ambix, sized by the current column count.
    Fuma,
    /// Ambix to Furse-Malham, sized by the current row count.
    ToFuma,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Zero-filled `rows x cols` matrix; empty if either dimension is zero.
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut m = Self::default();
        m.init(rows, cols);
        m
    }

    /// Matrix with ones where row index equals column index.
    pub fn identity(rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        m.eye();
        m
    }

    /// Builds a matrix from row-major values.
    pub fn from_rows(rows: usize, cols: usize, values: &[f32]) -> Result<Self, MatrixError> {
        let mut m = Self::new(rows, cols);
        m.fill(values)?;
        Ok(m)
    }

    /// Reshapes in place, releasing the previous storage and zero-filling.
    pub fn init(&mut self, rows: usize, cols: usize) {
        self.deinit();
        if rows == 0 || cols == 0 {
            return;
        }
        self.rows = rows;
        self.cols = cols;
        self.data = vec![0.0; rows * cols];
    }

    pub fn deinit(&mut self) {
        self.rows = 0;
        self.cols = 0;
        self.data = Vec::new();
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major view of the values.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        (row < self.rows && col < self.cols).then(|| self.data[row * self.cols + col])
    }

    /// Stores `value` at (`row`, `col`).
    ///
    /// # Panics
    ///
    /// Panics when the position lies outside the matrix.
    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        assert!(
            row < self.rows && col < self.cols,
            "position ({row}, {col}) outside {}x{} matrix",
            self.rows,
            self.cols
        );
        self.data[row * self.cols + col] = value;
    }

    fn check_length(&self, actual: usize) -> Result<usize, MatrixError> {
        let expected = self.rows * self.cols;
        if actual < expected {
            return Err(MatrixError::DataLength {
                rows: self.rows,
                cols: self.cols,
                expected,
                actual,
            });
        }
        Ok(expected)
    }

    /// Copies `rows * cols` row-major values; extra values are ignored.
    pub fn fill(&mut self, values: &[f32]) -> Result<(), MatrixError> {
        let len = self.check_length(values.len())?;
        self.data.copy_from_slice(&values[..len]);
        Ok(())
    }

    /// Like [`fill`](Self::fill), with each 32-bit word stored in the
    /// opposite byte order.
    pub fn fill_swapped(&mut self, words: &[u32]) -> Result<(), MatrixError> {
        let len = self.check_length(words.len())?;
        for (dst, &word) in self.data.iter_mut().zip(&words[..len]) {
            *dst = swap_f32(word);
        }
        Ok(())
    }

    /// Fills from frame-interleaved data where each channel becomes a row and
    /// each frame a column.
    pub fn fill_transposed(&mut self, values: &[f32], swapped: bool) -> Result<(), MatrixError> {
        self.check_length(values.len())?;
        let (rows, cols) = (self.rows, self.cols);
        for c in 0..cols {
            for r in 0..rows {
                let v = values[c * rows + r];
                self.data[r * cols + c] = if swapped {
                    swap_f32(v.to_bits())
                } else {
                    v
                };
            }
        }
        Ok(())
    }

    /// Fills with predefined content.
    ///
    /// The Furse-Malham kinds replace the matrix with the conversion matrix
    /// for the layout given by the column count ([`MatrixKind::Fuma`]) or the
    /// row count ([`MatrixKind::ToFuma`]); the other dimension follows.
    pub fn fill_kind(&mut self, kind: MatrixKind) -> Result<(), MatrixError> {
        match kind {
            MatrixKind::Zero => self.data.fill(0.0),
            MatrixKind::One => self.data.fill(1.0),
            MatrixKind::Identity => self.eye(),
            MatrixKind::Fuma => *self = fuma::fuma_to_ambix(self.cols)?,
            MatrixKind::ToFuma => *self = fuma::ambix_to_fuma(self.rows)?,
        }
        Ok(())
    }

    /// Deep copy that reshapes `self` to match `src`.
    pub fn copy_from(&mut self, src: &Matrix) {
        if self.rows != src.rows || self.cols != src.cols {
            self.init(src.rows, src.cols);
        }
        self.data.copy_from_slice(&src.data);
    }

    /// Sets ones on the main diagonal and zeros elsewhere.
    pub fn eye(&mut self) {
        self.data.fill(0.0);
        for i in 0..self.rows.min(self.cols) {
            self.data[i * self.cols + i] = 1.0;
        }
    }

    pub fn transpose(&self) -> Matrix {
        let mut t = Matrix::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                t.data[c * self.rows + r] = self.data[r * self.cols + c];
            }
        }
        t
    }

    /// `self × right`.
    pub fn multiply(&self, right: &Matrix) -> Result<Matrix, MatrixError> {
        let mut dest = Matrix::default();
        Self::multiply_into(self, right, &mut dest)?;
        Ok(dest)
    }

    /// Stores `left × right` in `dest`, reshaping it when needed.
    pub fn multiply_into(
        left: &Matrix,
        right: &Matrix,
        dest: &mut Matrix,
    ) -> Result<(), MatrixError> {
        if left.cols != right.rows {
            return Err(MatrixError::DimensionMismatch {
                left_rows: left.rows,
                left_cols: left.cols,
                right_rows: right.rows,
                right_cols: right.cols,
            });
        }
        if dest.rows != left.rows || dest.cols != right.cols {
            dest.init(left.rows, right.cols);
        }

        let inner = left.cols;
        for r in 0..left.rows {
            for c in 0..right.cols {
                let mut sum = 0f32;
                for i in 0..inner {
                    sum += left.data[r * inner + i] * right.data[i * right.cols + c];
                }
                dest.data[r * right.cols + c] = sum;
            }
        }
        Ok(())
    }

    /// Moore–Penrose pseudo-inverse of a full-rank matrix.
    ///
    /// For square input this is the ordinary inverse.
    pub fn pinv(&self) -> Result<Matrix, MatrixError> {
        if self.is_empty() {
            return Err(MatrixError::Empty);
        }
        if self.rows >= self.cols {
            Ok(Self::from_f64(
                self.cols,
                self.rows,
                &qr_pinv(self.rows, self.cols, &self.to_f64())?,
            ))
        } else {
            Ok(self.transpose().pinv()?.transpose())
        }
    }

    fn to_f64(&self) -> Vec<f64> {
        self.data.iter().map(|&v| v as f64).collect()
    }

    fn from_f64(rows: usize, cols: usize, values: &[f64]) -> Matrix {
        Matrix {
            rows,
            cols,
            data: values.iter().map(|&v| v as f32).collect(),
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        &self.data[row * self.cols + col]
    }
}

/// Pseudo-inverse `R⁻¹Qᵀ` of a row-major `m x n` matrix with `m >= n`,
/// returned row-major as `n x m`.
fn qr_pinv(m: usize, n: usize, a: &[f64]) -> Result<Vec<f64>, MatrixError> {
    let mut r = a.to_vec();
    let mut reflectors: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut diag = vec![0f64; n];

    for k in 0..n {
        let norm = (k..m).map(|i| r[i * n + k].powi(2)).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Err(MatrixError::RankDeficient);
        }
        let alpha = if r[k * n + k] >= 0.0 { -norm } else { norm };

        let mut v: Vec<f64> = (k..m).map(|i| r[i * n + k]).collect();
        v[0] -= alpha;
        let vv: f64 = v.iter().map(|x| x * x).sum();

        // H = I - 2vvᵀ/(vᵀv) applied to the trailing columns
        if vv > 0.0 {
            for j in k..n {
                let dot: f64 = (k..m).map(|i| v[i - k] * r[i * n + j]).sum();
                let scale = 2.0 * dot / vv;
                for i in k..m {
                    r[i * n + j] -= scale * v[i - k];
                }
            }
        }

        diag[k] = r[k * n + k];
        reflectors.push(v);
    }

    let largest = diag.iter().fold(0f64, |acc, d| acc.max(d.abs()));
    let tolerance = m.max(n) as f64 * f32::EPSILON as f64 * largest;
    if diag.iter().any(|d| d.abs() <= tolerance) {
        return Err(MatrixError::RankDeficient);
    }

    let mut pinv = vec![0f64; n * m];
    for j in 0..m {
        // Qᵀe_j
        let mut y = vec![0f64; m];
        y[j] = 1.0;
        for (k, v) in reflectors.iter().enumerate() {
            let vv: f64 = v.iter().map(|x| x * x).sum();
            if vv == 0.0 {
                continue;
            }
            let dot: f64 = (k..m).map(|i| v[i - k] * y[i]).sum();
            let scale = 2.0 * dot / vv;
            for i in k..m {
                y[i] -= scale * v[i - k];
            }
        }

        // back substitution against the upper triangle of R
        for i in (0..n).rev() {
            let mut x = y[i];
            for c in i + 1..n {
                x -= r[i * n + c] * pinv[c * m + j];
            }
            pinv[i * m + j] = x / r[i * n + i];
        }
    }

    Ok(pinv)
}
