//! Distance, shift clock and calendar helpers. No I/O, no state.

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const DEFAULT_SHIFT_START: (u32, u32) = (9, 0);

/// Great-circle distance in meters (haversine).
pub fn distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lng2 - lng1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Strict `HH:MM`. Anything else is `None` so callers can fall back to a default.
pub fn parse_shift_time(s: &str) -> Option<(u32, u32)> {
    let (h, m) = s.split_once(':')?;
    if h.len() != 2 || m.len() != 2 || !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    (hour <= 23 && minute <= 59).then_some((hour, minute))
}

/// Minutes since midnight for an optional `HH:MM`, falling back to 09:00.
pub fn shift_start_minutes(s: Option<&str>) -> u32 {
    let (h, m) = s.and_then(parse_shift_time).unwrap_or(DEFAULT_SHIFT_START);
    h * 60 + m
}

/// Late only when strictly past start + grace.
pub fn is_late(clock_in: NaiveTime, shift_start_minutes: u32, grace_minutes: u32) -> bool {
    let minutes = clock_in.hour() * 60 + clock_in.minute();
    minutes > shift_start_minutes + grace_minutes
}

/// Six-day pattern rests on Sunday, five-day on the weekend. Unknown patterns are six-day.
pub fn is_weekly_off(shift_days: Option<u8>, date: NaiveDate) -> bool {
    match (shift_days, date.weekday()) {
        (_, Weekday::Sun) => true,
        (Some(5), Weekday::Sat) => true,
        _ => false,
    }
}

/// Inclusive list of calendar days. Empty when `from > to`.
pub fn date_range(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    from.iter_days().take_while(|d| *d <= to).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn distance_is_zero_for_same_point_and_symmetric() {
        let (a, b) = ((23.8103, 90.4125), (23.7806, 90.2794));
        assert_eq!(distance(a.0, a.1, a.0, a.1), 0.0);
        assert_eq!(distance(a.0, a.1, b.0, b.1), distance(b.0, b.1, a.0, a.1));
    }

    #[test]
    fn distance_matches_known_span() {
        // one degree of latitude is ~111.2 km on this sphere
        let d = distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_propagates_nan() {
        assert!(distance(f64::NAN, 0.0, 0.0, 0.0).is_nan());
    }

    #[test]
    fn parse_shift_time_is_strict() {
        assert_eq!(parse_shift_time("09:30"), Some((9, 30)));
        assert_eq!(parse_shift_time("00:00"), Some((0, 0)));
        assert_eq!(parse_shift_time("23:59"), Some((23, 59)));
        for bad in ["9:30", "24:00", "12:60", "12-30", "", "ab:cd", "12:3", " 09:30", "+9:30"] {
            assert_eq!(parse_shift_time(bad), None, "{bad:?}");
        }
    }

    #[test]
    fn shift_start_falls_back_to_nine() {
        assert_eq!(shift_start_minutes(None), 540);
        assert_eq!(shift_start_minutes(Some("nonsense")), 540);
        assert_eq!(shift_start_minutes(Some("07:45")), 465);
    }

    #[test]
    fn grace_boundary_is_not_late() {
        assert!(!is_late(t(9, 14), 540, 15));
        assert!(!is_late(t(9, 15), 540, 15));
        assert!(is_late(t(9, 16), 540, 15));
    }

    #[test]
    fn more_grace_never_makes_late() {
        for minute in 0..120 {
            let at = t(9 + minute / 60, minute % 60);
            for grace in 0..60 {
                if !is_late(at, 540, grace) {
                    assert!(!is_late(at, 540, grace + 1));
                }
            }
        }
    }

    #[test]
    fn weekly_off_patterns() {
        let sat = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
        let sun = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let mon = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        assert!(is_weekly_off(Some(6), sun));
        assert!(!is_weekly_off(Some(6), sat));
        assert!(is_weekly_off(Some(5), sat));
        assert!(is_weekly_off(Some(5), sun));
        assert!(!is_weekly_off(Some(5), mon));
        assert!(!is_weekly_off(Some(4), sat));
        assert!(!is_weekly_off(None, sat));
    }

    #[test]
    fn date_range_is_inclusive() {
        let from = NaiveDate::from_ymd_opt(2026, 2, 27).unwrap();
        let to = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        assert_eq!(date_range(from, to).len(), 3);
        assert!(date_range(to, from).is_empty());
    }
}
