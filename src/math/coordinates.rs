/// Astronomical coordinate pipeline
/// Equatorial catalog positions to observer-relative horizon and render-space coordinates
use chrono::{DateTime, Datelike, Timelike, Utc};

pub const J2000_JULIAN_DATE: f64 = 2451545.0;
pub const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;
pub const GMST_BASE_DEG: f64 = 280.46061837;
pub const GMST_ROTATION_PER_DAY: f64 = 360.98564736629;
pub const GMST_CORRECTION: f64 = 0.000387933;
pub const GMST_CUBIC_DIVISOR: f64 = 38710000.0;

/// Azimuth/altitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizonCoordinates {
    pub azimuth_deg: f64,
    pub altitude_deg: f64,
}

/// Wrap an angle into [0, 360)
#[inline]
pub fn normalize_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs, and keeps -0.0
    if wrapped >= 360.0 || wrapped == 0.0 { 0.0 } else { wrapped }
}

/// Julian Date for a UTC instant.
///
/// Civil to Julian conversion with the March-year shift: January and February
/// count as months 13 and 14 of the previous year.
pub fn julian_date(utc: DateTime<Utc>) -> f64 {
    let mut year = utc.year() as f64;
    let mut month = utc.month() as f64;
    let day = utc.day() as f64;

    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();

    let seconds = utc.hour() as f64 * 3600.0
        + utc.minute() as f64 * 60.0
        + utc.second() as f64
        + utc.nanosecond() as f64 * 1e-9;
    let day_fraction = seconds / 86400.0;

    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + day + b - 1524.5
        + day_fraction
}

/// Greenwich sidereal time in degrees, not normalized
pub fn greenwich_sidereal_time(julian_date: f64) -> f64 {
    let days = julian_date - J2000_JULIAN_DATE;
    let t = days / DAYS_PER_JULIAN_CENTURY;
    GMST_BASE_DEG + GMST_ROTATION_PER_DAY * days + GMST_CORRECTION * t * t
        - t * t * t / GMST_CUBIC_DIVISOR
}

/// Local sidereal time in degrees, in [0, 360)
pub fn compute_sidereal_time(longitude_deg: f64, utc: DateTime<Utc>) -> f64 {
    let gst = greenwich_sidereal_time(julian_date(utc));
    normalize_degrees(gst + longitude_deg)
}

/// Convert right ascension/declination to azimuth/altitude for an observer
/// latitude at a given local sidereal time. All inputs and outputs in degrees.
pub fn equatorial_to_horizon(
    ra_deg: f64,
    dec_deg: f64,
    latitude_deg: f64,
    lst_deg: f64,
) -> HorizonCoordinates {
    let hour_angle = (lst_deg - ra_deg + 360.0).rem_euclid(360.0).to_radians();
    let dec = dec_deg.to_radians();
    let lat = latitude_deg.to_radians();

    let sin_alt = (dec.sin() * lat.sin() + dec.cos() * lat.cos() * hour_angle.cos()).clamp(-1.0, 1.0);
    let altitude = sin_alt.asin();

    let y = -dec.cos() * hour_angle.sin();
    let x = dec.sin() - altitude.sin() * lat.sin();
    let mut azimuth = y.atan2(x).to_degrees();
    if azimuth < 0.0 {
        azimuth += 360.0;
    }

    HorizonCoordinates {
        azimuth_deg: normalize_degrees(azimuth),
        altitude_deg: altitude.to_degrees().clamp(-90.0, 90.0),
    }
}

/// Place a horizon direction on a sphere of the given render radius
pub fn horizon_to_cartesian(azimuth_deg: f64, altitude_deg: f64, radius: f64) -> [f64; 3] {
    let az = azimuth_deg.to_radians();
    let alt = altitude_deg.to_radians();
    [
        radius * alt.cos() * az.cos(),
        radius * alt.cos() * az.sin(),
        radius * alt.sin(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn instant(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).single().unwrap()
    }

    #[test]
    fn test_julian_date_j2000() {
        let jd = julian_date(instant(2000, 1, 1, 12, 0, 0));
        assert!((jd - J2000_JULIAN_DATE).abs() < 1e-9);
    }

    #[test]
    fn test_julian_date_march_shift() {
        // 1999-03-01 0h is 59 days after 1999-01-01 0h
        let jan = julian_date(instant(1999, 1, 1, 0, 0, 0));
        let mar = julian_date(instant(1999, 3, 1, 0, 0, 0));
        assert!((mar - jan - 59.0).abs() < 1e-9);
    }

    #[test]
    fn test_sidereal_time_at_epoch() {
        let lst = compute_sidereal_time(0.0, instant(2000, 1, 1, 12, 0, 0));
        assert!((lst - GMST_BASE_DEG).abs() < 1e-6);

        let shifted = compute_sidereal_time(90.0, instant(2000, 1, 1, 12, 0, 0));
        assert!((shifted - (GMST_BASE_DEG + 90.0 - 360.0)).abs() < 1e-6);
    }

    #[test]
    fn test_sidereal_time_range() {
        let times = [
            instant(1987, 4, 10, 19, 21, 0),
            instant(2000, 1, 1, 0, 0, 0),
            instant(2024, 2, 29, 23, 59, 59),
            instant(2031, 12, 31, 6, 30, 15),
        ];
        for utc in times {
            let mut longitude = -180.0;
            while longitude <= 180.0 {
                let lst = compute_sidereal_time(longitude, utc);
                assert!((0.0..360.0).contains(&lst), "lst {lst} out of range");
                longitude += 7.5;
            }
        }
    }

    #[test]
    fn test_horizon_ranges() {
        let mut dec = -90.0;
        while dec <= 90.0 {
            let mut lat = -90.0;
            while lat <= 90.0 {
                let mut ra = 0.0;
                while ra < 360.0 {
                    let h = equatorial_to_horizon(ra, dec, lat, 100.0);
                    assert!((0.0..360.0).contains(&h.azimuth_deg));
                    assert!((-90.0..=90.0).contains(&h.altitude_deg));
                    assert!(h.azimuth_deg.is_finite() && h.altitude_deg.is_finite());
                    ra += 30.0;
                }
                lat += 15.0;
            }
            dec += 15.0;
        }
    }

    #[test]
    fn test_horizon_example_observer() {
        let h = equatorial_to_horizon(0.0, 0.0, 46.5185, 100.0);
        assert!((0.0..360.0).contains(&h.azimuth_deg));
        assert!((-90.0..=90.0).contains(&h.altitude_deg));

        // Cross-check against the closed form for dec = 0
        let lat = 46.5185_f64.to_radians();
        let expected_alt = (lat.cos() * 100.0_f64.to_radians().cos()).asin().to_degrees();
        assert!((h.altitude_deg - expected_alt).abs() < 1e-9);
    }

    #[test]
    fn test_object_on_meridian_at_equator_is_overhead() {
        let h = equatorial_to_horizon(42.0, 0.0, 0.0, 42.0);
        assert!((h.altitude_deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_celestial_pole_altitude_matches_latitude() {
        let h = equatorial_to_horizon(10.0, 90.0, 46.5185, 250.0);
        assert!((h.altitude_deg - 46.5185).abs() < 1e-6);
    }

    #[test]
    fn test_cartesian_on_sphere() {
        for radius in [1.0, 0.9, 50.0] {
            let mut az = 0.0;
            while az < 360.0 {
                let mut alt = -90.0;
                while alt <= 90.0 {
                    let [x, y, z] = horizon_to_cartesian(az, alt, radius);
                    let length = (x * x + y * y + z * z).sqrt();
                    assert!((length - radius).abs() < 1e-3);
                    alt += 10.0;
                }
                az += 20.0;
            }
        }
    }

    #[test]
    fn test_cartesian_reference_directions() {
        let [x, y, z] = horizon_to_cartesian(0.0, 0.0, 1.0);
        assert!((x - 1.0).abs() < 0.01 && y.abs() < 0.01 && z.abs() < 0.01);

        let [x, y, z] = horizon_to_cartesian(90.0, 0.0, 1.0);
        assert!(x.abs() < 1e-9 && (y - 1.0).abs() < 1e-9 && z.abs() < 1e-9);

        let [_, _, z] = horizon_to_cartesian(123.0, 90.0, 2.0);
        assert!((z - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_degrees() {
        assert_eq!(normalize_degrees(360.0), 0.0);
        assert!((normalize_degrees(-30.0) - 330.0).abs() < 1e-12);
        assert!((normalize_degrees(725.0) - 5.0).abs() < 1e-12);
        assert!(normalize_degrees(-1e-15) < 360.0);
    }
}
