use chrono::Utc;
use thiserror::Error;

/// Upper bound (exclusive) for the random identifier suffix.
const DEFAULT_ID_BOUND: u64 = 10_000;

#[derive(Debug, Error)]
pub enum IdentError {
    #[error("drawing random id suffix: {0}")]
    RandomSource(#[from] getrandom::Error),
}

/// Returns an identifier of the form `analysis_<DD_MM_YYYY_HH_MM>_<n>`,
/// where the timestamp is UTC at the time of the call and `n` is drawn
/// from the OS random source, `0 <= n < 10000`.
///
/// Two runs within the same minute collide with probability 1/10000;
/// identifiers are for human and log correlation, not primary keys.
pub fn new_analysis_id() -> Result<String, IdentError> {
    let date = Utc::now().format("%d_%m_%Y_%H_%M");
    let suffix = random_below(DEFAULT_ID_BOUND)?;

    Ok(format!("analysis_{date}_{suffix}"))
}

/// Like [`new_analysis_id`], with a caller-supplied label (trimmed of
/// surrounding whitespace) prepended to the generated identifier.
pub fn new_analysis_id_with_suffix(suffix: &str) -> Result<String, IdentError> {
    let id = new_analysis_id()?;

    Ok(format!("{}_{}", suffix.trim(), id))
}

// A zero bound falls back to the default. Failure of the random source is
// fatal to the call; it is never retried here.
fn random_below(bound: u64) -> Result<u64, IdentError> {
    let bound = if bound == 0 { DEFAULT_ID_BOUND } else { bound };

    // Draws above the largest multiple of `bound` are rejected to keep the
    // reduction uniform.
    let limit = u64::MAX - u64::MAX % bound;
    loop {
        let mut bytes = [0u8; 8];
        getrandom::getrandom(&mut bytes)?;

        let value = u64::from_le_bytes(bytes);
        if value < limit {
            return Ok(value % bound);
        }
    }
}
