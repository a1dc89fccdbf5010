//! SI-scaled fixed-width number formatting for the report table.

const SUFFIXES: [&str; 8] = [" ", "K", "M", "G", "T", "P", "E", "Z"];
const LAST_SUFFIX: &str = "Y";

/// Formats `num` as a 9-wide value with 3 decimals and a one-character SI
/// suffix.
///
/// The value is divided by 1000 until its magnitude drops below 1000.
/// Anything still too large after `Z` is printed with `Y`. Non-finite
/// input is printed as-is rather than panicking.
///
/// # Examples
///
/// ```
/// use http_download_speed::format::si_format;
///
/// assert_eq!(si_format(0.0), "    0.000 ");
/// assert_eq!(si_format(1500.0), "    1.500K");
/// assert_eq!(si_format(8_000_000.0), "    8.000M");
/// ```
pub fn si_format(num: f64) -> String {
    let mut value = num;
    for suffix in SUFFIXES {
        if value.abs() < 1000.0 {
            return format!("{:9.3}{}", value, suffix);
        }
        value /= 1000.0;
    }
    format!("{:9.3}{}", value, LAST_SUFFIX)
}
