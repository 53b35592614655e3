use chrono::Duration;

/// Maximum length for response bodies embedded in error messages
pub const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data.
/// Cuts on a char boundary so multi-byte bodies never panic.
pub fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a price with two decimals, applying a percentage discount if present
pub fn format_price(price: f64, discount_rate: f64) -> String {
    if discount_rate > 0.0 {
        let discounted = price * (1.0 - discount_rate / 100.0);
        format!("${:.2} (was ${:.2}, -{}%)", discounted, price, discount_rate)
    } else {
        format!("${:.2}", price)
    }
}

/// Human-readable remaining lifetime of a token ("expired", "42s", "12m", "3h 5m")
pub fn format_remaining(remaining: Duration) -> String {
    let secs = remaining.num_seconds();
    if secs <= 0 {
        "expired".to_string()
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        if minutes == 0 {
            format!("{}h", hours)
        } else {
            format!("{}h {}m", hours, minutes)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_body_short() {
        assert_eq!(truncate_body("not found"), "not found");
    }

    #[test]
    fn test_truncate_body_long_multibyte() {
        let body = "é".repeat(400); // 800 bytes
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("(truncated, 800 total bytes)"));
        assert!(truncated.starts_with("éé"));
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(10.0, 0.0), "$10.00");
        assert_eq!(format_price(200.0, 25.0), "$150.00 (was $200.00, -25%)");
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::seconds(-5)), "expired");
        assert_eq!(format_remaining(Duration::seconds(42)), "42s");
        assert_eq!(format_remaining(Duration::minutes(12)), "12m");
        assert_eq!(format_remaining(Duration::minutes(185)), "3h 5m");
        assert_eq!(format_remaining(Duration::hours(2)), "2h");
    }
}
