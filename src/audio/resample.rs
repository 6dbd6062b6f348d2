//! Sample-rate conversion between the engine and the output device.
//!
//! The speech engine streams mono PCM at its native rate (24 kHz for the
//! shipped model); the output device usually runs at 44.1 or 48 kHz.
//! [`convert_rate`] bridges the two.
//!
//! The current resampler uses linear interpolation (fast, zero extra deps).
//! For better audio quality replace the inner loop with the `rubato` crate
//! (`SincFixedIn` + `BlackmanHarris2` window) — rubato is already listed in
//! `Cargo.toml` for that upgrade path.

/// Resample mono `samples` from `source_rate` Hz to `target_rate` Hz using
/// linear interpolation.
///
/// * Equal rates return the input unchanged (no-op fast path).
/// * Empty input returns an empty vector.
///
/// The output length is approximately
/// `samples.len() * target_rate / source_rate`.
///
/// # Example
///
/// ```rust
/// use clipvoice::audio::convert_rate;
///
/// // 24 kHz → 48 kHz doubles the sample count
/// let lo = vec![0.5_f32; 240];
/// let hi = convert_rate(&lo, 24_000, 48_000);
/// assert_eq!(hi.len(), 480);
///
/// // Equal rates are a no-op
/// let same = convert_rate(&lo, 24_000, 24_000);
/// assert_eq!(same.len(), lo.len());
/// ```
pub fn convert_rate(samples: &[f32], source_rate: u32, target_rate: u32) -> Vec<f32> {
    if source_rate == target_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let out_len = (samples.len() as f64 / ratio).round() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let pos = i as f64 * ratio;
        let idx = pos as usize;
        let frac = (pos - idx as f64) as f32;

        let a = samples[idx.min(samples.len() - 1)];
        let b = samples[(idx + 1).min(samples.len() - 1)];
        out.push(a + (b - a) * frac);
    }

    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_rates_are_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(convert_rate(&input, 24_000, 24_000), input);
    }

    #[test]
    fn empty_input_stays_empty() {
        assert!(convert_rate(&[], 24_000, 48_000).is_empty());
    }

    #[test]
    fn upsampling_doubles_length() {
        let input = vec![0.0_f32; 240];
        assert_eq!(convert_rate(&input, 24_000, 48_000).len(), 480);
    }

    #[test]
    fn downsampling_halves_length() {
        let input = vec![0.0_f32; 480];
        assert_eq!(convert_rate(&input, 48_000, 24_000).len(), 240);
    }

    #[test]
    fn interpolation_stays_within_input_range() {
        let input: Vec<f32> = (0..100).map(|i| (i as f32 / 50.0) - 1.0).collect();
        let out = convert_rate(&input, 24_000, 44_100);
        assert!(out.iter().all(|s| (-1.0..=1.0).contains(s)));
    }
}
