//! Two-stage gating, integrated loudness and loudness range
//!
//! Inputs are channel-weighted mean-square powers, never LUFS, so the
//! averaging happens in the power domain as BS.1770 requires. These
//! functions are O(n) in the history and belong on a reporting cadence,
//! not inside the audio callback.

use sage_core::{lufs_to_power, power_to_lufs};

use crate::loudness::LoudnessReading;

/// Blocks at or below this loudness never count
pub const ABSOLUTE_GATE_LUFS: f64 = -70.0;

/// Relative gate offset for integrated loudness (BS.1770-4)
pub const RELATIVE_GATE_LU: f64 = -10.0;

/// Relative gate offset for loudness range (EBU Tech 3342)
pub const LRA_RELATIVE_GATE_LU: f64 = -20.0;

const LRA_LOW_PERCENTILE: f64 = 0.10;
const LRA_HIGH_PERCENTILE: f64 = 0.95;

#[inline]
fn above(power: f64, gate_lufs: f64) -> bool {
    power_to_lufs(power) > gate_lufs
}

fn mean_power<'a>(powers: impl Iterator<Item = &'a f64>) -> Option<f64> {
    let (sum, count) = powers.fold((0.0, 0usize), |(s, c), &p| (s + p, c + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Gated integrated loudness over 400 ms block powers
pub fn integrate(block_powers: &[f64]) -> LoudnessReading {
    if block_powers.is_empty() {
        return LoudnessReading::InsufficientData;
    }

    let Some(ungated) =
        mean_power(block_powers.iter().filter(|&&p| above(p, ABSOLUTE_GATE_LUFS)))
    else {
        return LoudnessReading::AllBlocksGated;
    };

    let relative_gate = power_to_lufs(ungated) + RELATIVE_GATE_LU;
    let gated = block_powers
        .iter()
        .filter(|&&p| above(p, ABSOLUTE_GATE_LUFS) && above(p, relative_gate));

    match mean_power(gated) {
        Some(power) => LoudnessReading::Value(power_to_lufs(power)),
        None => LoudnessReading::AllBlocksGated,
    }
}

/// Loudness range (LU) over short-term powers
///
/// Returns `None` until at least two short-term values survive gating.
pub fn loudness_range(short_term_powers: &[f64]) -> Option<f64> {
    let ungated = mean_power(
        short_term_powers
            .iter()
            .filter(|&&p| above(p, ABSOLUTE_GATE_LUFS)),
    )?;
    let relative_gate = power_to_lufs(ungated) + LRA_RELATIVE_GATE_LU;

    let mut loudnesses: Vec<f64> = short_term_powers
        .iter()
        .map(|&p| power_to_lufs(p))
        .filter(|&l| l > ABSOLUTE_GATE_LUFS && l > relative_gate)
        .collect();

    if loudnesses.len() < 2 {
        return None;
    }

    loudnesses.sort_by(f64::total_cmp);

    // 10th to 95th percentile
    let last = loudnesses.len() - 1;
    let low_idx = ((loudnesses.len() as f64 * LRA_LOW_PERCENTILE) as usize).min(last);
    let high_idx = ((loudnesses.len() as f64 * LRA_HIGH_PERCENTILE) as usize).min(last);

    Some(loudnesses[high_idx] - loudnesses[low_idx])
}

/// Forward-only record of gating blocks and short-term powers
///
/// Append-only within a session; `clear()` starts a new one.
#[derive(Debug, Clone, Default)]
pub struct GatingHistory {
    blocks: Vec<f64>,
    short_term: Vec<f64>,
}

impl GatingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preallocate for `blocks` hops (one gating block per hop)
    pub fn with_capacity(blocks: usize) -> Self {
        Self {
            blocks: Vec::with_capacity(blocks),
            short_term: Vec::with_capacity(blocks),
        }
    }

    /// Make room for `additional` more hops without touching what is stored
    pub fn reserve(&mut self, additional: usize) {
        self.blocks.reserve(additional);
        self.short_term.reserve(additional);
    }

    #[inline]
    pub fn push_block(&mut self, power: f64) {
        self.blocks.push(power);
    }

    #[inline]
    pub fn push_short_term(&mut self, power: f64) {
        self.short_term.push(power);
    }

    pub fn integrated(&self) -> LoudnessReading {
        integrate(&self.blocks)
    }

    pub fn loudness_range(&self) -> Option<f64> {
        loudness_range(&self.short_term)
    }

    pub fn blocks(&self) -> &[f64] {
        &self.blocks
    }

    pub fn short_term(&self) -> &[f64] {
        &self.short_term
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.short_term.clear();
    }
}

/// Power of a block at `lufs`, handy for building histories by hand
#[inline]
pub fn block_power(lufs: f64) -> f64 {
    lufs_to_power(lufs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn blocks(levels: &[f64]) -> Vec<f64> {
        levels.iter().map(|&l| block_power(l)).collect()
    }

    #[test]
    fn test_empty_history() {
        assert_eq!(integrate(&[]), LoudnessReading::InsufficientData);
        assert_eq!(loudness_range(&[]), None);
    }

    #[test]
    fn test_all_below_absolute_gate() {
        let quiet = blocks(&[-80.0, -75.0, -70.5]);
        assert_eq!(integrate(&quiet), LoudnessReading::AllBlocksGated);
        assert_eq!(integrate(&[0.0; 8]), LoudnessReading::AllBlocksGated);
    }

    #[test]
    fn test_constant_level() {
        let steady = blocks(&[-23.0; 50]);
        let value = integrate(&steady).value().unwrap();
        assert_abs_diff_eq!(value, -23.0, epsilon = 1e-9);
    }

    #[test]
    fn test_relative_gate_drops_quiet_passages() {
        // -40 is above the absolute gate but more than 10 LU under the mix
        let mut history = blocks(&[-20.0; 40]);
        history.extend(blocks(&[-40.0; 40]));
        let value = integrate(&history).value().unwrap();
        assert_abs_diff_eq!(value, -20.0, epsilon = 1e-9);
    }

    #[test]
    fn test_relative_gate_keeps_close_passages() {
        let mut history = blocks(&[-20.0; 10]);
        history.extend(blocks(&[-25.0; 10]));
        let expected = power_to_lufs((block_power(-20.0) + block_power(-25.0)) / 2.0);
        let value = integrate(&history).value().unwrap();
        assert_abs_diff_eq!(value, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_lra_constant_is_zero() {
        let steady = blocks(&[-18.0; 100]);
        assert_abs_diff_eq!(loudness_range(&steady).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_lra_spread() {
        // Uniform ramp from -30 to -10 LUFS
        let levels: Vec<f64> = (0..=200).map(|i| -30.0 + i as f64 * 0.1).collect();
        let lra = loudness_range(&blocks(&levels)).unwrap();
        // 10th..95th percentile of a 20 LU ramp is ~17 LU
        assert_abs_diff_eq!(lra, 17.0, epsilon = 0.3);
    }

    #[test]
    fn test_lra_ignores_silence() {
        let mut levels = vec![-20.0; 50];
        levels.extend([-90.0; 50]);
        assert_abs_diff_eq!(loudness_range(&blocks(&levels)).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_history_clear() {
        let mut history = GatingHistory::with_capacity(16);
        history.push_block(block_power(-20.0));
        history.push_short_term(block_power(-20.0));
        assert_eq!(history.len(), 1);
        history.clear();
        assert!(history.is_empty());
        assert!(history.short_term().is_empty());
        assert_eq!(history.integrated(), LoudnessReading::InsufficientData);
    }
}
