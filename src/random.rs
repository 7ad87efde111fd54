//! Injectable random sources for vector precomputation.

pub trait RandomSource {
    /// Uniform sample in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Uniform sample in `[lo, hi)`.
    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }
}

/// SplitMix64 generator. Seeded, so runs are reproducible when wanted.
#[derive(Clone, Copy, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the wall clock for non-reproducible production runs.
    pub fn from_time() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED);
        Self::new(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for SplitMix64 {
    fn next_f64(&mut self) -> f64 {
        // 53 bits of precision.
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }
}

/// Replays a fixed sequence, wrapping around. For tests.
#[derive(Clone, Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: usize,
}

impl SequenceRandom {
    /// Values are clamped into `[0, 1)`; an empty list behaves as `[0.0]`.
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        let mut values: Vec<f64> = values
            .into()
            .into_iter()
            .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
            .collect();
        if values.is_empty() {
            values.push(0.0);
        }
        Self { values, cursor: 0 }
    }
}

impl RandomSource for SequenceRandom {
    fn next_f64(&mut self) -> f64 {
        let v = self.values[self.cursor % self.values.len()];
        self.cursor += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splitmix_is_deterministic_and_in_range() {
        let mut a = SplitMix64::new(123);
        let mut b = SplitMix64::new(123);
        for _ in 0..100 {
            let x = a.next_f64();
            assert_eq!(x, b.next_f64());
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn sequence_wraps() {
        let mut r = SequenceRandom::new(vec![0.25, 0.5]);
        assert_eq!(r.next_f64(), 0.25);
        assert_eq!(r.next_f64(), 0.5);
        assert_eq!(r.next_f64(), 0.25);
        assert_eq!(r.range(10.0, 20.0), 15.0);
    }
}
