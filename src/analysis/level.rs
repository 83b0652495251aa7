//! Level measurement - RMS of a recording in decibels.

/// Added to the RMS before the logarithm so silence stays finite
pub const LEVEL_EPSILON: f64 = 1e-10;

/// Root-mean-square amplitude; 0.0 for an empty slice
pub fn rms(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_squares / samples.len() as f64).sqrt()
}

/// `20 * log10(rms + 1e-10)`, always finite (floor is -200 dB)
pub fn rms_db(samples: &[f32]) -> f64 {
    amplitude_to_db(rms(samples))
}

/// Convert a linear amplitude to dB with the same epsilon floor
#[inline]
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    20.0 * (amplitude + LEVEL_EPSILON).log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant() {
        assert!((rms(&[0.5; 100]) - 0.5).abs() < 1e-9);
        assert!((rms(&[-0.5, 0.5]) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rms_db_of_full_scale_sine_is_minus_3db() {
        let n = 48000;
        let sine: Vec<f32> = (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 48000.0).sin())
            .collect();
        let db = rms_db(&sine);
        assert!((db - (-3.0103)).abs() < 0.01, "got {} dB", db);
    }

    #[test]
    fn test_silence_is_finite() {
        let db = rms_db(&[0.0; 1024]);
        assert!(db.is_finite());
        assert!((db + 200.0).abs() < 1e-9);
        assert!(rms_db(&[]).is_finite());
    }

    #[test]
    fn test_half_amplitude_is_6db_down() {
        let loud = rms_db(&[0.2, -0.2, 0.2, -0.2]);
        let quiet = rms_db(&[0.1, -0.1, 0.1, -0.1]);
        assert!((loud - quiet - 6.0206).abs() < 0.001);
    }
}
