/// Fixed decimal rounding for presented values, ties to even (`rint(x * 10^dp) / 10^dp`).
pub trait RoundTo {
    fn round_to(self, dp: u32) -> f64;
}

impl RoundTo for f64 {
    #[inline]
    fn round_to(self, dp: u32) -> f64 {
        if !self.is_finite() { return self; }
        if dp == 0 { return self.round_ties_even(); }
        let factor = 10_f64.powi(dp as i32);
        (self * factor).round_ties_even() / factor
    }
}
