//! Peak detection utilities
//!
//! Local maxima with sub-sample refinement, used on autocorrelation functions.

/// Find local maxima within `[lo, hi]`
///
/// A point is a peak when it is strictly greater than its left neighbor and
/// at least its right neighbor, and at least `min_height`. Range bounds are
/// clamped so that both neighbors exist.
///
/// # Returns
///
/// `(index, value)` pairs sorted by value, highest first
pub fn local_maxima(signal: &[f32], lo: usize, hi: usize, min_height: f32) -> Vec<(usize, f32)> {
    if signal.len() < 3 {
        return Vec::new();
    }
    let lo = lo.max(1);
    let hi = hi.min(signal.len() - 2);
    if lo > hi {
        return Vec::new();
    }

    let mut peaks: Vec<(usize, f32)> = (lo..=hi)
        .filter(|&i| {
            let v = signal[i];
            v >= min_height && v > signal[i - 1] && v >= signal[i + 1]
        })
        .map(|i| (i, signal[i]))
        .collect();

    peaks.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    peaks
}

/// Refine a peak position by fitting a parabola through it and its neighbors
///
/// Returns the fractional index of the vertex, or `index` unchanged at the
/// edges or when the three points are collinear.
pub fn parabolic_interpolation(signal: &[f32], index: usize) -> f32 {
    if index == 0 || index + 1 >= signal.len() {
        return index as f32;
    }
    let (a, b, c) = (signal[index - 1], signal[index], signal[index + 1]);
    let denom = a - 2.0 * b + c;
    if denom.abs() < 1e-12 {
        return index as f32;
    }
    let offset = 0.5 * (a - c) / denom;
    index as f32 + offset.clamp(-0.5, 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_maxima() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        let peaks = local_maxima(&signal, 0, signal.len(), 0.0);
        assert_eq!(peaks, vec![(2, 1.0), (5, 0.9)]);
    }

    #[test]
    fn test_range_and_height() {
        let signal = vec![0.0, 0.5, 1.0, 0.7, 0.3, 0.9, 0.2];
        assert_eq!(local_maxima(&signal, 3, 6, 0.0), vec![(5, 0.9)]);
        assert!(local_maxima(&signal, 0, 6, 1.5).is_empty());
        assert!(local_maxima(&[1.0, 2.0], 0, 1, 0.0).is_empty());
    }

    #[test]
    fn test_parabolic_interpolation() {
        // Samples of -(x - 2.25)^2
        let signal: Vec<f32> = (0..5).map(|x| -((x as f32 - 2.25).powi(2))).collect();
        let refined = parabolic_interpolation(&signal, 2);
        assert!((refined - 2.25).abs() < 1e-4);
        assert_eq!(parabolic_interpolation(&signal, 0), 0.0);
    }
}
