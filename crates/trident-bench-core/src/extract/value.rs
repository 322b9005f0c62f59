//! Pulling numbers out of free-form log lines.

/// The value reported for `marker` on `line`, if the marker occurs.
///
/// The text after the marker is searched for its first `:` or `=`, and the
/// number right after it is returned; when there is no separator the first
/// number after the marker is used. This tolerates differing prefixes
/// (thread ids, timestamps, log levels) in front of the marker.
pub fn value_after(line: &str, marker: &str) -> Option<f64> {
    let pos = line.find(marker)?;
    let rest = &line[pos + marker.len()..];
    let rest = match rest.find([':', '=']) {
        Some(sep) => &rest[sep + 1..],
        None => rest,
    };
    leading_number(rest)
}

/// First decimal number in `s`, skipping anything before it.
pub fn leading_number(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let start = bytes.iter().enumerate().position(|(i, b)| {
        b.is_ascii_digit()
            || (*b == b'-' || *b == b'.')
                && bytes.get(i + 1).is_some_and(|n| n.is_ascii_digit())
    })?;

    let mut end = start;
    let mut seen_dot = false;
    let mut seen_exp = false;
    while end < bytes.len() {
        let b = bytes[end];
        let ok = match b {
            b'0'..=b'9' => true,
            b'-' if end == start => true,
            b'.' if !seen_dot && !seen_exp => {
                seen_dot = true;
                true
            }
            b'e' | b'E'
                if !seen_exp
                    && end > start
                    && bytes
                        .get(end + 1)
                        .is_some_and(|n| n.is_ascii_digit() || *n == b'-' || *n == b'+') =>
            {
                seen_exp = true;
                true
            }
            b'-' | b'+' if seen_exp && matches!(bytes[end - 1], b'e' | b'E') => true,
            _ => false,
        };
        if !ok {
            break;
        }
        end += 1;
    }
    s[start..end].parse().ok()
}

/// Number between the first `start` and the following `end` delimiter,
/// e.g. `time_between(line, ": ", "ms.")`.
pub fn time_between(line: &str, start: &str, end: &str) -> Option<f64> {
    let from = line.find(start)? + start.len();
    let rest = &line[from..];
    let to = rest.find(end).unwrap_or(rest.len());
    rest[..to].trim().parse().ok()
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_after_skips_log_prefixes() {
        let line = "[0x7f3c 2021-04-02 10:11:12.345] DEBUG Runtime queryopti: 12.75ms.";
        assert_eq!(value_after(line, "Runtime queryopti"), Some(12.75));
        assert_eq!(value_after(line, "Runtime total"), None);
    }

    #[test]
    fn value_after_handles_labels_without_separator() {
        assert_eq!(value_after("Max memory used 2048 MB", "Max memory"), Some(2048.0));
        assert_eq!(value_after("# rows = 17", "# rows"), Some(17.0));
        assert_eq!(value_after("Time total: n/a", "Time total"), None);
    }

    #[test]
    fn leading_number_variants() {
        assert_eq!(leading_number(" 3.5e3ms"), Some(3500.0));
        assert_eq!(leading_number("-4 units"), Some(-4.0));
        assert_eq!(leading_number("took .5s"), Some(0.5));
        assert_eq!(leading_number("1.2.3"), Some(1.2));
        assert_eq!(leading_number("12 ms. elapsed"), Some(12.0));
        assert_eq!(leading_number("nothing"), None);
    }

    #[test]
    fn time_between_delimiters() {
        assert_eq!(
            time_between("Runtime queryopti: 4.25ms.", ": ", "ms."),
            Some(4.25)
        );
        assert_eq!(time_between("PR: 130 ms.", ": ", " ms."), Some(130.0));
        assert_eq!(time_between("no delimiter", ": ", "ms."), None);
    }

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 6.0]), Some(3.0));
    }
}
