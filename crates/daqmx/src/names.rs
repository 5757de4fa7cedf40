//! Channel-string utilities.
//!
//! The driver accepts and returns comma-separated channel lists with range
//! shorthand (`Dev1/ai0:3`). These helpers convert between that form and
//! explicit name lists.

/// Join names into the driver's comma-separated form.
///
/// Ranges are not compressed: `["Dev1/ai0", "Dev1/ai1"]` becomes
/// `Dev1/ai0, Dev1/ai1`, not `Dev1/ai0:1`. The driver accepts either form.
pub fn flatten_channel_string<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .map(|n| n.as_ref().trim())
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split a channel string into individual names, expanding ranges.
///
/// `Dev1/ai0:2` becomes `Dev1/ai0, Dev1/ai1, Dev1/ai2`; descending ranges
/// count down, and a zero-padded start (`ai00:02`) keeps its width. A range
/// whose two halves name different prefixes is returned unexpanded.
pub fn unflatten_channel_string(channels: &str) -> Vec<String> {
    let mut result = Vec::new();
    for token in channels.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match expand_range(token) {
            Some(expanded) => result.extend(expanded),
            None => result.push(token.to_string()),
        }
    }
    result
}

fn split_trailing_number(s: &str) -> Option<(&str, &str)> {
    let digits = s.bytes().rev().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    Some(s.split_at(s.len() - digits))
}

fn expand_range(token: &str) -> Option<Vec<String>> {
    let (left, right) = token.split_once(':')?;
    let (prefix, start_digits) = split_trailing_number(left)?;
    let (right_prefix, end_digits) = split_trailing_number(right)?;

    // The right half may repeat all or the tail of the prefix: ai0:ai3, Dev1/ai0:Dev1/ai3.
    if !right_prefix.is_empty() && !prefix.ends_with(right_prefix) {
        return None;
    }

    let start: u64 = start_digits.parse().ok()?;
    let end: u64 = end_digits.parse().ok()?;
    let width = if start_digits.len() > 1 && start_digits.starts_with('0') {
        start_digits.len()
    } else {
        0
    };

    let format = |n: u64| format!("{prefix}{n:0width$}");
    let names = if start <= end {
        (start..=end).map(format).collect()
    } else {
        (end..=start).rev().map(format).collect()
    };
    Some(names)
}

/// Device part of a physical channel or terminal (`/Dev1/PFI0` → `Dev1`).
pub fn device_name(physical: &str) -> &str {
    let trimmed = physical.trim().trim_start_matches('/');
    trimmed.split('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten() {
        assert_eq!(flatten_channel_string(&["Dev1/ai0", " Dev1/ai1 "]), "Dev1/ai0, Dev1/ai1");
        assert_eq!(flatten_channel_string::<&str>(&[]), "");
    }

    #[test]
    fn test_flatten_keeps_expanded_names() {
        let names = unflatten_channel_string("Dev1/ai0:2");
        let flat = flatten_channel_string(&names);
        assert_eq!(flat, "Dev1/ai0, Dev1/ai1, Dev1/ai2");
        assert_eq!(unflatten_channel_string(&flat), names);
    }

    #[test]
    fn test_unflatten_ranges() {
        assert_eq!(
            unflatten_channel_string("Dev1/ai0:2, Dev2/ao1"),
            ["Dev1/ai0", "Dev1/ai1", "Dev1/ai2", "Dev2/ao1"]
        );
        assert_eq!(
            unflatten_channel_string("Dev1/port0/line7:5"),
            ["Dev1/port0/line7", "Dev1/port0/line6", "Dev1/port0/line5"]
        );
    }

    #[test]
    fn test_unflatten_repeated_prefix_and_padding() {
        assert_eq!(unflatten_channel_string("Dev1/ai0:Dev1/ai1"), ["Dev1/ai0", "Dev1/ai1"]);
        assert_eq!(unflatten_channel_string("volts08:10"), ["volts08", "volts09", "volts10"]);
    }

    #[test]
    fn test_unflatten_leaves_unparseable_tokens() {
        assert_eq!(unflatten_channel_string("Dev1/ai0:Dev2/ao1"), ["Dev1/ai0:Dev2/ao1"]);
        assert_eq!(unflatten_channel_string("/Dev1/PFI0"), ["/Dev1/PFI0"]);
        assert!(unflatten_channel_string(" , ").is_empty());
    }

    #[test]
    fn test_device_name() {
        assert_eq!(device_name("/Dev1/PFI3"), "Dev1");
        assert_eq!(device_name("Dev2/port0/line1"), "Dev2");
    }
}
