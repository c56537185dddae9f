//! Time utilities for agentic-tokens.
//!
//! Datalog `Date` terms are Unix epoch seconds (u64).

/// Return the current time as seconds since Unix epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Convert epoch seconds to an RFC 3339 string for rendering.
pub fn secs_to_rfc3339(secs: u64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .unwrap_or(chrono::DateTime::UNIX_EPOCH)
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_renders_as_rfc3339() {
        assert_eq!(secs_to_rfc3339(0), "1970-01-01T00:00:00Z");
    }

    #[test]
    fn test_now_is_after_2020() {
        assert!(now_secs() > 1_577_836_800);
    }
}
