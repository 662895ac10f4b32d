/// Lunar phase selection for the Moon texture
use chrono::{DateTime, NaiveDate, Utc};

use super::coordinates::julian_date;

/// Julian date of the reference new moon used for lunation counting
pub const LUNATION_EPOCH_JD: f64 = 2451550.1;
/// Mean synodic month in days
pub const SYNODIC_MONTH_DAYS: f64 = 29.530588853;

const BUCKET_EDGES: [f64; 8] = [
    0.0625, 0.1875, 0.3125, 0.4375, 0.5625, 0.6875, 0.8125, 0.9375,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MoonPhase {
    New,
    WaxingCrescent,
    FirstQuarter,
    WaxingGibbous,
    Full,
    WaningGibbous,
    LastQuarter,
    WaningCrescent,
}

impl MoonPhase {
    pub const ALL: [MoonPhase; 8] = [
        MoonPhase::New,
        MoonPhase::WaxingCrescent,
        MoonPhase::FirstQuarter,
        MoonPhase::WaxingGibbous,
        MoonPhase::Full,
        MoonPhase::WaningGibbous,
        MoonPhase::LastQuarter,
        MoonPhase::WaningCrescent,
    ];

    /// Map a lunation fraction in [0, 1) to its bucket. Fractions at or past
    /// the last edge wrap back to new moon.
    pub fn from_fraction(phase: f64) -> Self {
        let phase = phase - phase.floor();
        let bucket = BUCKET_EDGES
            .iter()
            .position(|edge| phase < *edge)
            .unwrap_or(0);
        Self::ALL[bucket]
    }

    pub fn for_date(date: NaiveDate) -> Self {
        Self::from_fraction(lunation_fraction(date))
    }

    pub fn for_instant(utc: DateTime<Utc>) -> Self {
        Self::for_date(utc.date_naive())
    }

    pub fn name(&self) -> &'static str {
        match self {
            MoonPhase::New => "new",
            MoonPhase::WaxingCrescent => "waxing_crescent",
            MoonPhase::FirstQuarter => "first_quarter",
            MoonPhase::WaxingGibbous => "waxing_gibbous",
            MoonPhase::Full => "full",
            MoonPhase::WaningGibbous => "waning_gibbous",
            MoonPhase::LastQuarter => "last_quarter",
            MoonPhase::WaningCrescent => "waning_crescent",
        }
    }

    /// Texture key under the moon texture directory
    pub fn texture_key(&self) -> String {
        format!("moon/{}.png", self.name())
    }
}

/// Fraction of the current lunation in [0, 1) for a calendar date, evaluated at 0h UTC
pub fn lunation_fraction(date: NaiveDate) -> f64 {
    let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let lunation = (julian_date(midnight) - LUNATION_EPOCH_JD) / SYNODIC_MONTH_DAYS;
    lunation - lunation.floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bucket_edges() {
        assert_eq!(MoonPhase::from_fraction(0.0), MoonPhase::New);
        assert_eq!(MoonPhase::from_fraction(0.0624), MoonPhase::New);
        assert_eq!(MoonPhase::from_fraction(0.0625), MoonPhase::WaxingCrescent);
        assert_eq!(MoonPhase::from_fraction(0.25), MoonPhase::FirstQuarter);
        assert_eq!(MoonPhase::from_fraction(0.40), MoonPhase::WaxingGibbous);
        assert_eq!(MoonPhase::from_fraction(0.5), MoonPhase::Full);
        assert_eq!(MoonPhase::from_fraction(0.6), MoonPhase::WaningGibbous);
        assert_eq!(MoonPhase::from_fraction(0.75), MoonPhase::LastQuarter);
        assert_eq!(MoonPhase::from_fraction(0.9), MoonPhase::WaningCrescent);
        assert_eq!(MoonPhase::from_fraction(0.9375), MoonPhase::New);
        assert_eq!(MoonPhase::from_fraction(0.999), MoonPhase::New);
    }

    #[test]
    fn test_known_lunations() {
        // New moon on 2000-01-06, full moon on 2000-01-21
        assert_eq!(MoonPhase::for_date(date(2000, 1, 6)), MoonPhase::New);
        assert_eq!(MoonPhase::for_date(date(2000, 1, 21)), MoonPhase::Full);
    }

    #[test]
    fn test_phase_is_deterministic_per_date() {
        let d = date(2026, 10, 18);
        let first = MoonPhase::for_date(d);
        for _ in 0..10 {
            assert_eq!(MoonPhase::for_date(d), first);
        }

        let morning = d.and_hms_opt(1, 0, 0).unwrap().and_utc();
        let evening = d.and_hms_opt(23, 0, 0).unwrap().and_utc();
        assert_eq!(MoonPhase::for_instant(morning), MoonPhase::for_instant(evening));
    }

    #[test]
    fn test_fraction_range() {
        let mut d = date(2020, 1, 1);
        for _ in 0..400 {
            let f = lunation_fraction(d);
            assert!((0.0..1.0).contains(&f));
            d = d.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_texture_keys_are_distinct() {
        let keys: std::collections::HashSet<String> =
            MoonPhase::ALL.iter().map(|p| p.texture_key()).collect();
        assert_eq!(keys.len(), 8);
    }
}
