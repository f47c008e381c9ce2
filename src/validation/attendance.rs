use crate::engine::similarity::FACE_VECTOR_DIMS;
use crate::error::{AppError, Result};

/// Validates a submitted face capture.
///
/// Only the shape is checked here; similarity scoring fails closed on its
/// own for anything else.
pub fn validate_face_vector(vector: &[f64]) -> Result<()> {
    if vector.len() != FACE_VECTOR_DIMS {
        return Err(AppError::Validation(format!(
            "Face vector must have {} dimensions",
            FACE_VECTOR_DIMS
        )));
    }

    if vector.iter().any(|v| !v.is_finite()) {
        return Err(AppError::Validation(
            "Face vector must contain finite values".to_string(),
        ));
    }

    Ok(())
}

/// Validates a submitted blink count.
pub fn validate_blink_count(blinks: i32) -> Result<()> {
    if !(0..=100).contains(&blinks) {
        return Err(AppError::Validation(
            "Blink count out of range".to_string(),
        ));
    }

    Ok(())
}
