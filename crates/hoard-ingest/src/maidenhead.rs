//! Maidenhead grid locators.
//!
//! A locator names a rectangle on the globe in pairs of characters: a field
//! (`A`-`R`, 20°×10°), a square (`0`-`9`, 2°×1°) and a subsquare (`a`-`x`,
//! 5'×2.5'). [`locator`] produces the 6-character form, e.g. `JN58td`.

const FIELD_LON: f64 = 20.0;
const FIELD_LAT: f64 = 10.0;
const SQUARE_LON: f64 = 2.0;
const SQUARE_LAT: f64 = 1.0;
const SUBSQUARES: f64 = 24.0;

/// Encode a position as a 6-character locator.
///
/// Returns `None` if either coordinate is out of range or not finite.
pub fn locator(lat: f64, lon: f64) -> Option<String> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return None;
    }

    // The north pole and the antimeridian belong to the last cell.
    let lon = (lon + 180.0).min(360.0 - 1e-9);
    let lat = (lat + 90.0).min(180.0 - 1e-9);

    let mut out = String::with_capacity(6);
    out.push(letter(b'A', lon / FIELD_LON));
    out.push(letter(b'A', lat / FIELD_LAT));
    out.push(letter(b'0', (lon % FIELD_LON) / SQUARE_LON));
    out.push(letter(b'0', (lat % FIELD_LAT) / SQUARE_LAT));
    out.push(letter(b'a', (lon % SQUARE_LON) / SQUARE_LON * SUBSQUARES));
    out.push(letter(b'a', (lat % SQUARE_LAT) / SQUARE_LAT * SUBSQUARES));
    Some(out)
}

fn letter(base: u8, cell: f64) -> char {
    (base + cell.floor() as u8) as char
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_locations() {
        assert_eq!(locator(48.14666, 11.60833).as_deref(), Some("JN58td"));
        assert_eq!(locator(38.8977, -77.0365).as_deref(), Some("FM18lv"));
    }

    #[test]
    fn corners() {
        assert_eq!(locator(-90.0, -180.0).as_deref(), Some("AA00aa"));
        assert_eq!(locator(90.0, 180.0).as_deref(), Some("RR99xx"));
    }

    #[test]
    fn out_of_range() {
        assert!(locator(91.0, 0.0).is_none());
        assert!(locator(0.0, -180.5).is_none());
        assert!(locator(f64::NAN, 0.0).is_none());
    }
}
