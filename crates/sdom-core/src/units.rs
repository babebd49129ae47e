//! Unit conventions at the input boundary.
//!
//! Cost tables arrive in utility convention ($/kW, $/kWh, $/kW-yr) while the
//! model operates in MW/MWh internally. Every conversion goes through these
//! helpers so the ×1000 factor lives in exactly one place.

/// Kilowatts per megawatt.
pub const KW_PER_MW: f64 = 1000.0;

/// Convert a $/kW figure to $/MW.
pub fn per_kw_to_per_mw(value: f64) -> f64 {
    value * KW_PER_MW
}

/// Convert a $/kWh figure to $/MWh.
pub fn per_kwh_to_per_mwh(value: f64) -> f64 {
    value * KW_PER_MW
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_kw_conversion() {
        assert_eq!(per_kw_to_per_mw(1.5), 1500.0);
        assert_eq!(per_kwh_to_per_mwh(0.2), 200.0);
    }
}
