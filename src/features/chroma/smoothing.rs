//! Temporal chroma smoothing

use super::normalization::l2_normalize;
use super::ChromaFrame;

/// Smooth chroma frames over time with a per-bin median filter
///
/// The window is centered and shrinks at the edges. Each output frame is
/// re-normalized (L2); frame times are preserved. A window of 0 or 1 returns
/// the input unchanged.
pub fn smooth_chroma(frames: &[ChromaFrame], window_size: usize) -> Vec<ChromaFrame> {
    if window_size <= 1 || frames.len() < 2 {
        return frames.to_vec();
    }

    log::debug!(
        "Smoothing {} chroma frames with median window {}",
        frames.len(),
        window_size
    );

    let half = window_size / 2;
    let mut scratch: Vec<f32> = Vec::with_capacity(window_size);

    frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(frames.len());
            let mut energies = [0.0f32; 12];
            for (bin, out) in energies.iter_mut().enumerate() {
                scratch.clear();
                scratch.extend(frames[lo..hi].iter().map(|f| f.energies[bin]));
                scratch.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                *out = scratch[scratch.len() / 2];
            }
            l2_normalize(&mut energies);
            ChromaFrame::new(frame.time, energies)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time: f32, bins: &[usize]) -> ChromaFrame {
        let mut energies = [0.0f32; 12];
        for &b in bins {
            energies[b] = 1.0;
        }
        l2_normalize(&mut energies);
        ChromaFrame::new(time, energies)
    }

    #[test]
    fn test_median_removes_single_outlier() {
        let mut frames: Vec<ChromaFrame> =
            (0..7).map(|i| frame(i as f32 * 0.1, &[0, 4, 7])).collect();
        frames[3] = frame(0.3, &[2, 7, 11]);

        let smoothed = smooth_chroma(&frames, 5);
        assert_eq!(smoothed.len(), frames.len());
        assert!(smoothed[3].energies[0] > 0.5);
        assert!(smoothed[3].energies[11] < 1e-6);
        assert!((smoothed[3].time - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_window_one_is_identity() {
        let frames = vec![frame(0.0, &[0]), frame(0.1, &[5])];
        assert_eq!(smooth_chroma(&frames, 1), frames);
    }

    #[test]
    fn test_silent_frames_stay_silent() {
        let frames: Vec<ChromaFrame> = (0..5).map(|i| ChromaFrame::silent(i as f32)).collect();
        let smoothed = smooth_chroma(&frames, 3);
        assert!(smoothed.iter().all(|f| f.is_silent()));
    }
}
