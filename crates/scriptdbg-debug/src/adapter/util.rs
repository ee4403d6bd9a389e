//! Small adapter utilities.
//! - env_flag: parse boolean env vars
//! - env_override: tri-state boolean env vars
//! - parse_hit_condition: DAP hit condition to ignore count

pub(super) fn env_flag(name: &str) -> bool {
    env_override(name).unwrap_or(false)
}

/// `Some` only when the variable is set to a recognised boolean.
pub(crate) fn env_override(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    parse_flag(&raw)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// A plain count N stops on the Nth condition-true hit, so N-1 hits are ignored.
pub(super) fn parse_hit_condition(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix(">=").unwrap_or(trimmed).trim();
    trimmed
        .parse::<u32>()
        .ok()
        .map(|count| count.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::{parse_flag, parse_hit_condition};

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn hit_conditions_become_ignore_counts() {
        assert_eq!(parse_hit_condition("3"), Some(2));
        assert_eq!(parse_hit_condition(">= 2"), Some(1));
        assert_eq!(parse_hit_condition("0"), Some(0));
        assert_eq!(parse_hit_condition("% 2"), None);
    }
}
