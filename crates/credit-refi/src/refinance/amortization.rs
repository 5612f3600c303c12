//! Fixed-rate annuity arithmetic.

/// Monthly payment for a fixed-rate loan.
///
/// Total over its numeric domain: degenerate principal/term yield 0, a zero
/// (or unusable) rate yields straight-line repayment, and a numerically
/// degenerate denominator falls back to straight-line rather than producing
/// a NaN or infinity.
pub fn monthly_payment(principal: f64, annual_rate_percent: f64, term_months: f64) -> f64 {
    if !principal.is_finite() || principal <= 0.0 || !term_months.is_finite() || term_months <= 0.0
    {
        return 0.0;
    }

    let rate = if annual_rate_percent.is_finite() {
        annual_rate_percent
    } else {
        0.0
    };
    let monthly_rate = rate / 12.0 / 100.0;
    if monthly_rate == 0.0 {
        return principal / term_months;
    }

    let denominator = 1.0 - (1.0 + monthly_rate).powf(-term_months);
    if denominator == 0.0 || !denominator.is_finite() {
        return principal / term_months;
    }

    principal * monthly_rate / denominator
}
