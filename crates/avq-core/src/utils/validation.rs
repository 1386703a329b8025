//! Input validation utilities for coding operations

use crate::error::{AvqError, Result};
use crate::types::SWB_COEFS;

/// Validate a block of transform coefficients
///
/// # Errors
///
/// Returns an error if the block does not hold exactly 64 coefficients or a
/// coefficient is not finite.
pub fn validate_coefficients(coefs: &[f32]) -> Result<()> {
    if coefs.len() != SWB_COEFS {
        return Err(AvqError::InvalidFrameSize {
            expected: SWB_COEFS,
            actual: coefs.len(),
        });
    }

    if let Some((i, value)) = coefs.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(AvqError::invalid_input(format!(
            "Coefficient at index {} is not finite: {}",
            i, value
        )));
    }

    Ok(())
}

/// Validate that a buffer holds at least `needed` elements
pub fn validate_buffer_size(actual: usize, needed: usize) -> Result<()> {
    if actual < needed {
        return Err(AvqError::BufferTooSmall { needed, actual });
    }
    Ok(())
}
