//! The pluggable DFT backend interface and its in-crate reference
//! implementation.

pub mod reference;

pub use reference::NaiveDft;

use crate::complex::Complex64;

/// Row/column storage order for a 2-D buffer passed to a `Dft` batched or
/// 2-D transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Transform along rows (axis 0).
    Rows,
    /// Transform along columns (axis 1).
    Columns,
}

/// A pluggable forward/inverse DFT backend.
///
/// Forward transforms accrue no normalization; inverse transforms accrue
/// `1/n` where `n` is the transform length, per the documented contract.
pub trait Dft {
    /// In-place or out-of-place forward 1-D complex DFT of length `n`.
    fn fwd1d(&self, input: &[Complex64], output: &mut [Complex64]);
    /// In-place or out-of-place inverse 1-D complex DFT of length `n`,
    /// normalized by `1/n`.
    fn inv1d(&self, input: &[Complex64], output: &mut [Complex64]);

    /// Forward DFT applied independently to each of `nrows` rows (or
    /// columns, per `axis`) of an `nrows x ncols` row-major buffer.
    fn fwd1b(&self, input: &[Complex64], output: &mut [Complex64], nrows: usize, ncols: usize, axis: Axis) {
        batched(input, output, nrows, ncols, axis, |i, o| self.fwd1d(i, o));
    }

    /// Inverse DFT applied independently to each row/column, per `axis`.
    fn inv1b(&self, input: &[Complex64], output: &mut [Complex64], nrows: usize, ncols: usize, axis: Axis) {
        batched(input, output, nrows, ncols, axis, |i, o| self.inv1d(i, o));
    }

    /// 2-D forward DFT: rows then columns.
    fn fwd2d(&self, input: &[Complex64], output: &mut [Complex64], nrows: usize, ncols: usize) {
        let mut tmp = vec![Complex64::zero(); nrows * ncols];
        self.fwd1b(input, &mut tmp, nrows, ncols, Axis::Rows);
        self.fwd1b(&tmp, output, nrows, ncols, Axis::Columns);
    }

    /// 2-D inverse DFT: rows then columns, each normalized by `1/n`.
    fn inv2d(&self, input: &[Complex64], output: &mut [Complex64], nrows: usize, ncols: usize) {
        let mut tmp = vec![Complex64::zero(); nrows * ncols];
        self.inv1b(input, &mut tmp, nrows, ncols, Axis::Rows);
        self.inv1b(&tmp, output, nrows, ncols, Axis::Columns);
    }

    /// Forward real-to-complex DFT: zero-extends the imaginary part of
    /// `input` and delegates to `fwd1d`.
    fn fwd_r2c(&self, input: &[f64], output: &mut [Complex64]) {
        let complex_in: Vec<Complex64> = input.iter().map(|&x| Complex64::real(x)).collect();
        self.fwd1d(&complex_in, output);
    }

    /// Inverse complex-to-real DFT: Hermitian-symmetrizes `input`, runs
    /// `inv1d`, then discards the residual imaginary part.
    fn inv_c2r(&self, input: &[Complex64], output: &mut [f64]) {
        let mut sym = input.to_vec();
        crate::spectrum::hermitian_mirror_inplace(&mut sym);
        let mut complex_out = vec![Complex64::zero(); sym.len()];
        self.inv1d(&sym, &mut complex_out);
        for (o, c) in output.iter_mut().zip(&complex_out) {
            *o = c.re;
        }
    }
}

fn batched(
    input: &[Complex64],
    output: &mut [Complex64],
    nrows: usize,
    ncols: usize,
    axis: Axis,
    mut f: impl FnMut(&[Complex64], &mut [Complex64]),
) {
    match axis {
        Axis::Rows => {
            for r in 0..nrows {
                let row = &input[r * ncols..(r + 1) * ncols];
                let out_row = &mut output[r * ncols..(r + 1) * ncols];
                f(row, out_row);
            }
        }
        Axis::Columns => {
            let mut col_in = vec![Complex64::zero(); nrows];
            let mut col_out = vec![Complex64::zero(); nrows];
            for c in 0..ncols {
                for r in 0..nrows {
                    col_in[r] = input[r * ncols + c];
                }
                f(&col_in, &mut col_out);
                for r in 0..nrows {
                    output[r * ncols + c] = col_out[r];
                }
            }
        }
    }
}
