//! Level units and conversions
//!
//! Every conversion that could hit `log10(0)` is floored so no `-inf` or
//! `NaN` leaves the core.

/// Smallest linear amplitude considered non-silent (-200 dB)
pub const LINEAR_FLOOR: f64 = 1e-10;

/// Level reported for silence
pub const DB_FLOOR: f64 = -200.0;

/// Smallest mean-square power considered non-silent
pub const POWER_FLOOR: f64 = 1e-20;

/// BS.1770 loudness offset: `L = -0.691 + 10·log10(power)`
pub const LUFS_OFFSET: f64 = -0.691;

/// Convert decibels to linear gain
#[inline]
pub fn db_to_linear(db: f64) -> f64 {
    10.0_f64.powf(db / 20.0)
}

/// Convert linear amplitude to decibels, flooring at `DB_FLOOR`
#[inline]
pub fn linear_to_db(linear: f64) -> f64 {
    if linear.is_nan() {
        return DB_FLOOR;
    }
    20.0 * linear.abs().max(LINEAR_FLOOR).log10()
}

/// Convert (channel-weighted) mean-square power to LUFS
#[inline]
pub fn power_to_lufs(power: f64) -> f64 {
    if power.is_nan() {
        return LUFS_OFFSET + 10.0 * POWER_FLOOR.log10();
    }
    LUFS_OFFSET + 10.0 * power.max(POWER_FLOOR).log10()
}

/// Convert LUFS back to mean-square power
#[inline]
pub fn lufs_to_power(lufs: f64) -> f64 {
    10.0_f64.powf((lufs - LUFS_OFFSET) / 10.0)
}
