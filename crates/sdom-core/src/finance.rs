//! Capital-recovery arithmetic shared by every cost term in the model.

/// Economic lifetime assumed for PV and wind plants, in years.
///
/// No input table carries a VRE lifetime, so both technologies share this
/// constant and therefore a single capital recovery factor.
pub const VRE_LIFETIME_YEARS: f64 = 30.0;

/// Compute the Capital Recovery Factor for annualizing investment costs.
///
/// CRF = r(1+r)^n / ((1+r)^n - 1)
///
/// where r = discount rate, n = lifetime in years.
pub fn capital_recovery_factor(rate: f64, lifetime_years: f64) -> f64 {
    if rate < 1e-10 {
        // No discounting
        1.0 / lifetime_years
    } else {
        rate * (1.0 + rate).powf(lifetime_years) / ((1.0 + rate).powf(lifetime_years) - 1.0)
    }
}

/// Annualized cost of a lump-sum investment over the given lifetime.
pub fn annualized(lump_sum: f64, rate: f64, lifetime_years: f64) -> f64 {
    lump_sum * capital_recovery_factor(rate, lifetime_years)
}
