//! Hermitian-symmetry enforcement, spectrum resampling, and convenience
//! convolution/replace operations built on a `Dft` backend.

use crate::complex::Complex64;
use crate::dft::Dft;

/// Enforces Hermitian symmetry on a complex sequence in place: index 0 is
/// forced real; if the length is even, the Nyquist bin (N/2) is forced
/// real by taking its magnitude (not its real part, so amplitude from a
/// prior fluctuation step survives); the "negative" half is overwritten
/// with the conjugate of the "positive" half.
pub fn hermitian_mirror_inplace(data: &mut [Complex64]) {
    let n = data.len();
    if n == 0 {
        return;
    }
    data[0] = Complex64::real(data[0].re);
    if n % 2 == 0 {
        let nyq = n / 2;
        data[nyq] = Complex64::real(data[nyq].abs());
    }
    for k in 1..n.div_ceil(2) {
        data[n - k] = data[k].conj();
    }
}

/// Enforces Hermitian symmetry, writing the result to `out` (which may
/// alias `data`'s positive half but must have the same length).
pub fn hermitian_mirror(data: &[Complex64], out: &mut [Complex64]) {
    out.copy_from_slice(data);
    hermitian_mirror_inplace(out);
}

/// Enforces Hermitian symmetry along `axis` of a row-major `nrows x
/// ncols` buffer.
pub fn hermitian_mirror_2d(data: &mut [Complex64], nrows: usize, ncols: usize, axis: crate::dft::Axis) {
    use crate::dft::Axis;
    match axis {
        Axis::Rows => {
            for r in 0..nrows {
                hermitian_mirror_inplace(&mut data[r * ncols..(r + 1) * ncols]);
            }
        }
        Axis::Columns => {
            let mut col = vec![Complex64::zero(); nrows];
            for c in 0..ncols {
                for r in 0..nrows {
                    col[r] = data[r * ncols + c];
                }
                hermitian_mirror_inplace(&mut col);
                for r in 0..nrows {
                    data[r * ncols + c] = col[r];
                }
            }
        }
    }
}

/// Linearly interpolates a spectrum to a new length, scaling amplitudes
/// by `sqrt(new/old)` so total energy (sum of `|.|^2`) is preserved.
pub fn interp(input: &[Complex64], out_len: usize) -> Vec<Complex64> {
    let n_in = input.len();
    if n_in == 0 || out_len == 0 {
        return vec![Complex64::zero(); out_len];
    }
    let scale = (out_len as f64 / n_in as f64).sqrt();
    let mut out = Vec::with_capacity(out_len);
    for k in 0..out_len {
        let pos = k as f64 * (n_in as f64 - 1.0) / (out_len as f64 - 1.0).max(1.0);
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(n_in - 1);
        let frac = pos - lo as f64;
        let v = input[lo] * (1.0 - frac) + input[hi] * frac;
        out.push(v * scale);
    }
    out
}

/// Increases spectrum length by inserting fill-valued bins at and above
/// the old Nyquist frequency. If `fill` is `None`, the value of the
/// original Nyquist bin is used. Preserves Rayleigh resolution (bin
/// spacing); increases the Nyquist frequency.
pub fn extrap(input: &[Complex64], out_len: usize, fill: Option<Complex64>) -> Vec<Complex64> {
    let n_in = input.len();
    if out_len <= n_in {
        return input[..out_len.min(n_in)].to_vec();
    }
    let old_nyquist = n_in / 2;
    let fill_value = fill.unwrap_or_else(|| input[old_nyquist.min(n_in.saturating_sub(1))]);
    let mut out = vec![fill_value; out_len];
    // For even n_in, the old Nyquist bin (index old_nyquist) belongs to
    // neither the low nor the high copy, leaving it to `fill_value`.
    // For odd n_in there is no single Nyquist bin, so the low copy runs
    // through old_nyquist and the high copy starts right after with no
    // gap.
    let hi_start = old_nyquist + 1;
    let lo_len = if n_in % 2 == 0 { old_nyquist } else { hi_start };
    let lo = &input[..lo_len];
    out[..lo.len()].copy_from_slice(lo);
    // The negative-frequency tail of the old spectrum maps to the tail
    // of the new, longer spectrum.
    let hi_len = n_in - hi_start;
    out[out_len - hi_len..].copy_from_slice(&input[hi_start..hi_start + hi_len]);
    out
}

/// Shrinks a spectrum by summing every L-th bin into the output
/// (`L = ceil(n_in / out_len)`), normalizing by `sqrt(out_len/n_in)`, and
/// re-enforcing Hermitian symmetry.
pub fn alias(input: &[Complex64], out_len: usize) -> Vec<Complex64> {
    let n_in = input.len();
    if out_len == 0 {
        return Vec::new();
    }
    let l = n_in.div_ceil(out_len);
    let scale = (out_len as f64 / n_in as f64).sqrt();
    let mut out = vec![Complex64::zero(); out_len];
    for (i, &x) in input.iter().enumerate() {
        out[(i / l).min(out_len - 1)] = out[(i / l).min(out_len - 1)] + x;
    }
    for v in out.iter_mut() {
        *v = *v * scale;
    }
    hermitian_mirror_inplace(&mut out);
    out
}

/// Resamples a spectrum to account for a relative sample-period change:
/// `rel_period > 1` (coarser sampling) does interp-then-alias;
/// `rel_period <= 1` (finer sampling) does interp-then-extrap.
pub fn resample(input: &[Complex64], out_len: usize, rel_period: f64) -> Vec<Complex64> {
    let mid = interp(input, out_len);
    if rel_period > 1.0 {
        alias(&mid, out_len)
    } else {
        extrap(&mid, out_len, None)
    }
}

/// Linear convolution of `a` and `b`, size `|a| + |b| - 1`, with no
/// caller-side padding: both inputs are zero-padded internally to the
/// output size, forward-transformed, multiplied pointwise, and
/// inverse-transformed.
pub fn convolve(dft: &impl Dft, a: &[f64], b: &[f64]) -> Vec<f64> {
    let n = a.len() + b.len() - 1;
    let pad = |x: &[f64]| -> Vec<Complex64> {
        let mut v: Vec<Complex64> = x.iter().map(|&r| Complex64::real(r)).collect();
        v.resize(n, Complex64::zero());
        v
    };
    let fa = pad(a);
    let fb = pad(b);
    let mut sa = vec![Complex64::zero(); n];
    let mut sb = vec![Complex64::zero(); n];
    dft.fwd1d(&fa, &mut sa);
    dft.fwd1d(&fb, &mut sb);
    let product: Vec<Complex64> = sa.iter().zip(&sb).map(|(x, y)| *x * *y).collect();
    let mut time = vec![Complex64::zero(); n];
    dft.inv1d(&product, &mut time);
    time.iter().map(|c| c.re).collect()
}

/// Computes `InvDFT(DFT(m) * DFT(r2) / DFT(r1))` at a size large enough
/// to avoid circular aliasing (`m.len() + r1.len().max(r2.len()) - 1`).
pub fn replace(dft: &impl Dft, m: &[f64], r1: &[f64], r2: &[f64]) -> Vec<f64> {
    let n = m.len() + r1.len().max(r2.len()) - 1;
    let pad = |x: &[f64]| -> Vec<Complex64> {
        let mut v: Vec<Complex64> = x.iter().map(|&r| Complex64::real(r)).collect();
        v.resize(n, Complex64::zero());
        v
    };
    let (fm, fr1, fr2) = (pad(m), pad(r1), pad(r2));
    let mut sm = vec![Complex64::zero(); n];
    let mut sr1 = vec![Complex64::zero(); n];
    let mut sr2 = vec![Complex64::zero(); n];
    dft.fwd1d(&fm, &mut sm);
    dft.fwd1d(&fr1, &mut sr1);
    dft.fwd1d(&fr2, &mut sr2);
    let ratio: Vec<Complex64> = sm
        .iter()
        .zip(&sr1)
        .zip(&sr2)
        .map(|((m, r1), r2)| *m * *r2 / *r1)
        .collect();
    let mut time = vec![Complex64::zero(); n];
    dft.inv1d(&ratio, &mut time);
    time.iter().map(|c| c.re).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dft::reference::NaiveDft;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64 { re, im }
    }

    #[test]
    fn hermitian_mirror_even_length() {
        let input = vec![
            c(1.0, 11.0),
            c(2.0, 22.0),
            c(3.0, 33.0),
            c(4.0, 44.0),
            c(5.0, 55.0),
            c(6.0, 66.0),
        ];
        let mut out = input.clone();
        hermitian_mirror_inplace(&mut out);
        assert_eq!(out[0], c(1.0, 0.0));
        assert_eq!(out[1], c(2.0, 22.0));
        assert_eq!(out[2], c(3.0, 33.0));
        assert!((out[3].re - c(4.0, 44.0).abs()).abs() < 1e-12 && out[3].im == 0.0);
        assert_eq!(out[4], c(3.0, -33.0));
        assert_eq!(out[5], c(2.0, -22.0));
    }

    #[test]
    fn hermitian_mirror_odd_length_no_nyquist() {
        let input: Vec<Complex64> = (1..=5).map(|i| c(i as f64, i as f64 * 10.0)).collect();
        let mut out = input.clone();
        hermitian_mirror_inplace(&mut out);
        assert_eq!(out[0], c(1.0, 0.0));
        assert_eq!(out[3], out[2].conj());
        assert_eq!(out[4], out[1].conj());
    }

    #[test]
    fn interp_preserves_energy_roughly() {
        let input: Vec<Complex64> = (0..8).map(|i| c(i as f64, 0.0)).collect();
        let e0: f64 = input.iter().map(|c| c.norm_sqr()).sum();
        let out = interp(&input, 16);
        let e1: f64 = out.iter().map(|c| c.norm_sqr()).sum();
        assert!((e0 - e1).abs() / e0 < 0.25);
    }

    #[test]
    fn convolve_output_size() {
        let dft = NaiveDft;
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 1.0];
        let out = convolve(&dft, &a, &b);
        assert_eq!(out.len(), a.len() + b.len() - 1);
        assert!((out[0] - 1.0).abs() < 1e-9);
        assert!((out[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn alias_shrinks_and_mirrors() {
        let input: Vec<Complex64> = (0..8).map(|i| c(i as f64, 0.0)).collect();
        let out = alias(&input, 4);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].im, 0.0);
    }

    #[test]
    fn extrap_even_length_drops_stale_nyquist_under_explicit_fill() {
        let input: Vec<Complex64> = (0..6).map(|i| c(i as f64, 0.0)).collect();
        let fill = c(-1.0, 0.0);
        let out = extrap(&input, 10, Some(fill));
        assert_eq!(out.len(), 10);
        // old Nyquist index (3) must be overwritten by fill, not carried over.
        assert_eq!(out[3], fill);
        assert_eq!(&out[..3], &input[..3]);
        assert_eq!(&out[10 - 2..], &input[4..]);
    }

    #[test]
    fn extrap_odd_length_has_no_forced_nyquist_gap() {
        let input: Vec<Complex64> = (0..5).map(|i| c(i as f64, 0.0)).collect();
        let fill = c(-1.0, 0.0);
        let out = extrap(&input, 9, Some(fill));
        assert_eq!(out.len(), 9);
        assert_eq!(&out[..3], &input[..3]);
        assert_eq!(&out[9 - 2..], &input[3..]);
    }
}
