use rand::Rng;

/// The dimensionality of the simulated face embedding.
pub const FACE_VECTOR_DIMS: usize = 128;

/// Compares two face vectors and returns a similarity percentage in [0, 100].
///
/// Defined as the mean over all dimensions of `1 - |a[i] - b[i]|`, scaled to
/// a percentage. Per-dimension values outside [0, 1] are not clamped; inputs
/// are simulated embeddings, not real ones. Missing or length-mismatched
/// vectors score 0 so the face factor fails closed instead of erroring.
pub fn compare_face_vectors(stored: Option<&[f64]>, submitted: Option<&[f64]>) -> f64 {
    let (a, b) = match (stored, submitted) {
        (Some(a), Some(b)) if !a.is_empty() && a.len() == b.len() => (a, b),
        _ => return 0.0,
    };

    let score: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| 1.0 - (x - y).abs())
        .sum();

    score / a.len() as f64 * 100.0
}

/// Generates a simulated face embedding for a newly registered student.
pub fn generate_face_vector<R: Rng>(rng: &mut R) -> Vec<f64> {
    (0..FACE_VECTOR_DIMS).map(|_| rng.gen::<f64>()).collect()
}
