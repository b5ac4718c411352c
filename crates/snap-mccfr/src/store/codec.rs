//! Fixed-point encoding for bounded regret storage.
//!
//! The dense backend keeps regrets as `i16` and strategy weights as `u16`
//! against a per-row `f32` scale. Re-encoding happens on every row touch,
//! so plain round-to-nearest would bias small repeated updates toward
//! zero; stochastic rounding keeps the expected value of the stored slot
//! equal to the true accumulation.

/// Fast xorshift32 used only to drive stochastic rounding.
fn xorshift(seed: &mut u32) -> u32 {
    let mut x = *seed;
    if x == 0 {
        x = 0xACE1;
    }
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    *seed = x;
    x
}

/// Rounds to floor(x) + 1 with probability fract(x), else floor(x).
fn stochastic(value: f32, seed: &mut u32) -> i32 {
    let floor = value.floor();
    let fract = value - floor;
    let draw = (xorshift(seed) & 0xFFFFFF) as f32 / 16777216.0;
    if draw < fract {
        floor as i32 + 1
    } else {
        floor as i32
    }
}

/// Largest absolute value in the slice.
fn absolute_max(slice: &[f32]) -> f32 {
    slice.iter().fold(0.0, |a, x| a.max(x.abs()))
}

/// Largest value in a nonnegative slice.
fn nonnegative_max(slice: &[f32]) -> f32 {
    slice.iter().fold(0.0, |a, &x| a.max(x))
}

/// Encodes signed values into `i16` slots, returning the scale.
pub fn encode_signed(dst: &mut [i16], src: &[f32], seed: u32) -> f32 {
    debug_assert!(dst.len() == src.len());
    let scale = absolute_max(src);
    let encoder = i16::MAX as f32 / if scale == 0.0 { 1.0 } else { scale };
    for (i, (d, s)) in dst.iter_mut().zip(src).enumerate() {
        let ref mut slot = seed ^ i as u32;
        let scaled = (s * encoder).clamp(i16::MIN as f32 + 1.0, i16::MAX as f32);
        *d = stochastic(scaled, slot) as i16;
    }
    scale
}

/// Decodes `i16` slots back to `f32` given the row scale.
pub fn decode_signed(src: &[i16], scale: f32) -> Vec<f32> {
    let decoder = scale / i16::MAX as f32;
    src.iter().map(|&x| x as f32 * decoder).collect()
}

/// Encodes nonnegative values into `u16` slots, returning the scale.
pub fn encode_unsigned(dst: &mut [u16], src: &[f32], seed: u32) -> f32 {
    debug_assert!(dst.len() == src.len());
    let scale = nonnegative_max(src);
    let scale = if scale.is_finite() { scale } else { 0.0 };
    let encoder = u16::MAX as f32 / if scale == 0.0 { 1.0 } else { scale };
    for (i, (d, s)) in dst.iter_mut().zip(src).enumerate() {
        let ref mut slot = seed ^ i as u32;
        let scaled = (s * encoder).clamp(0.0, u16::MAX as f32);
        *d = stochastic(scaled, slot) as u16;
    }
    scale
}

/// Decodes `u16` slots back to `f32` given the row scale.
pub fn decode_unsigned(src: &[u16], scale: f32) -> Vec<f32> {
    let decoder = scale / u16::MAX as f32;
    src.iter().map(|&x| x as f32 * decoder).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_roundtrip_stays_within_one_step() {
        let original = vec![150.0, -230.0, 0.8, 0.0];
        let mut encoded = vec![0i16; 4];
        let scale = encode_signed(&mut encoded, &original, 7);
        assert_eq!(scale, 230.0);
        let step = scale / i16::MAX as f32;
        for (decoded, expected) in decode_signed(&encoded, scale).iter().zip(&original) {
            assert!((decoded - expected).abs() <= step);
        }
    }

    #[test]
    fn unsigned_roundtrip_stays_within_one_step() {
        let original = vec![0.5, 0.3, 0.15, 0.0];
        let mut encoded = vec![0u16; 4];
        let scale = encode_unsigned(&mut encoded, &original, 7);
        let step = scale / u16::MAX as f32;
        for (decoded, expected) in decode_unsigned(&encoded, scale).iter().zip(&original) {
            assert!((decoded - expected).abs() <= step);
        }
    }

    #[test]
    fn all_zero_rows_encode_without_dividing_by_zero() {
        let mut signed = vec![0i16; 3];
        let mut unsigned = vec![0u16; 3];
        assert_eq!(encode_signed(&mut signed, &[0.0; 3], 1), 0.0);
        assert_eq!(encode_unsigned(&mut unsigned, &[0.0; 3], 1), 0.0);
        assert!(signed.iter().all(|&x| x == 0));
        assert!(unsigned.iter().all(|&x| x == 0));
    }

    #[test]
    fn stochastic_rounding_preserves_expectation() {
        // re-encode a slowly growing accumulator many times; round-to-
        // nearest would park it forever, stochastic rounding tracks it
        let mut value = vec![100.0f32, 50.0];
        let mut encoded = vec![0u16; 2];
        for epoch in 0..10_000u32 {
            value[1] += 0.003;
            let scale = encode_unsigned(&mut encoded, &value, epoch);
            value = decode_unsigned(&encoded, scale);
        }
        let drift = (value[1] - 80.0).abs() / 80.0;
        assert!(drift < 0.05, "drifted {:.1}%", drift * 100.0);
    }
}
