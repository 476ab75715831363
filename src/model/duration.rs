//! Wire format of duration columns: `[D ]HH:MM:SS[.ffffff]`.

use regex::Regex;
use std::sync::OnceLock;

const MICROS_PER_SECOND: i64 = 1_000_000;
const SECONDS_PER_DAY: i64 = 86_400;

fn pattern() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(\d+) (?:days?,? )?)?(?:(?:(\d+):)?(\d+):)?(\d+)(?:[.,](\d{1,6}))?$").ok()
    })
    .as_ref()
}

/// Parse a duration into whole microseconds. Negative durations are rejected.
pub fn parse_micros(s: &str) -> Option<i64> {
    let caps = pattern()?.captures(s.trim())?;
    let part = |i: usize| -> Option<i64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let days = part(1)?;
    let hours = part(2)?;
    let minutes = part(3)?;
    let seconds = part(4)?;
    let micros = match caps.get(5) {
        Some(m) => format!("{:0<6}", m.as_str()).parse::<i64>().ok()?,
        None => 0,
    };
    let total_seconds = days
        .checked_mul(SECONDS_PER_DAY)?
        .checked_add(hours.checked_mul(3600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    total_seconds.checked_mul(MICROS_PER_SECOND)?.checked_add(micros)
}

/// Canonical text for a duration given in microseconds.
pub fn format_micros(total: i64) -> String {
    let sign = if total < 0 { "-" } else { "" };
    let total = total.unsigned_abs();
    let micros = total % MICROS_PER_SECOND as u64;
    let secs = total / MICROS_PER_SECOND as u64;
    let days = secs / SECONDS_PER_DAY as u64;
    let rem = secs % SECONDS_PER_DAY as u64;
    let mut out = format!("{:02}:{:02}:{:02}", rem / 3600, (rem % 3600) / 60, rem % 60);
    if days > 0 {
        out = format!("{} {}", days, out);
    }
    if micros > 0 {
        out.push_str(&format!(".{:06}", micros));
    }
    format!("{}{}", sign, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_shapes() {
        assert_eq!(parse_micros("01:30:00"), Some(90 * 60 * MICROS_PER_SECOND));
        assert_eq!(parse_micros("90"), Some(90 * MICROS_PER_SECOND));
        assert_eq!(parse_micros("2:05"), Some(125 * MICROS_PER_SECOND));
        assert_eq!(
            parse_micros("1 02:00:00"),
            Some((SECONDS_PER_DAY + 7200) * MICROS_PER_SECOND)
        );
        assert_eq!(
            parse_micros("3 days, 00:00:01"),
            Some((3 * SECONDS_PER_DAY + 1) * MICROS_PER_SECOND)
        );
        assert_eq!(parse_micros("00:00:01.5"), Some(1_500_000));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_micros("una hora"), None);
        assert_eq!(parse_micros("-01:00:00"), None);
        assert_eq!(parse_micros(""), None);
    }

    #[test]
    fn formats_like_the_input_it_accepts() {
        assert_eq!(format_micros(0), "00:00:00");
        assert_eq!(format_micros(90 * 60 * MICROS_PER_SECOND), "01:30:00");
        assert_eq!(
            format_micros((SECONDS_PER_DAY + 7200) * MICROS_PER_SECOND + 250_000),
            "1 02:00:00.250000"
        );
        for s in ["01:30:00", "1 02:00:00", "00:00:01.500000"] {
            assert_eq!(parse_micros(s).map(format_micros).as_deref(), Some(s));
        }
    }
}
