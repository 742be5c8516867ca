/// Normalizes a phone number to E.164.
///
/// Separators are stripped. Ten digits are treated as a US number and get
/// `+1`; eleven digits starting with `1` get `+`; anything else keeps its
/// digits behind a `+`. Returns `None` when no digits remain.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    if digits.len() == 10 {
        return Some(format!("+1{}", digits));
    }
    Some(format!("+{}", digits))
}

/// `normalize_phone` over an optional input, treating blank as absent.
pub fn normalize_optional(raw: Option<&str>) -> Option<String> {
    raw.and_then(normalize_phone)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_numbers() {
        assert_eq!(normalize_phone("(404) 555-1234").as_deref(), Some("+14045551234"));
        assert_eq!(normalize_phone("404.555.1234").as_deref(), Some("+14045551234"));
        assert_eq!(normalize_phone("1-404-555-1234").as_deref(), Some("+14045551234"));
        assert_eq!(normalize_phone("+1 404 555 1234").as_deref(), Some("+14045551234"));
    }

    #[test]
    fn test_international_and_empty() {
        assert_eq!(normalize_phone("+44 20 7946 0958").as_deref(), Some("+442079460958"));
        assert_eq!(normalize_phone(""), None);
        assert_eq!(normalize_phone("  - "), None);
        assert_eq!(normalize_optional(None), None);
    }
}
