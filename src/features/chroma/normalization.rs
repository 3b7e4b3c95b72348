//! Chroma normalization strategies

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Euclidean norm of a chroma vector
pub fn l2_norm(chroma: &[f32; 12]) -> f32 {
    chroma.iter().map(|&x| x * x).sum::<f32>().sqrt()
}

/// L2-normalize in place, returning the original norm
///
/// Vectors with (near) zero energy are set to all zeros.
pub fn l2_normalize(chroma: &mut [f32; 12]) -> f32 {
    let norm = l2_norm(chroma);
    if norm > EPSILON {
        for x in chroma.iter_mut() {
            *x /= norm;
        }
    } else {
        *chroma = [0.0; 12];
    }
    norm
}

/// Cosine similarity between two 12-bin vectors, 0.0 if either is silent
pub fn cosine_similarity(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na <= EPSILON || nb <= EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (na * nb)).clamp(-1.0, 1.0)
}

/// Sharpen chroma vector to emphasize prominent semitones
///
/// Raises each bin to `power` and re-normalizes (L2). A power of 1.0 only
/// normalizes.
pub fn sharpen_chroma(chroma: &[f32; 12], power: f32) -> [f32; 12] {
    let mut out = *chroma;
    if power > 0.0 && (power - 1.0).abs() > f32::EPSILON {
        for x in out.iter_mut() {
            *x = x.max(0.0).powf(power);
        }
    }
    l2_normalize(&mut out);
    out
}
