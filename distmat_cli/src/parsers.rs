use std::time::Duration;

use jiff::{SignedDuration, SpanRelativeTo};

/// Accepts plain seconds ("30"), friendly ("30s", "1m 30s") or ISO 8601 ("PT30S").
pub fn parse_timeout(input: &str) -> Result<Duration, String> {
    let input = input.trim();

    let duration = if let Ok(seconds) = input.parse::<i64>() {
        SignedDuration::from_secs(seconds)
    } else if let Ok(duration) = input.parse::<SignedDuration>() {
        duration
    } else {
        input
            .parse::<jiff::Span>()
            .and_then(|span| span.to_duration(SpanRelativeTo::days_are_24_hours()))
            .map_err(|err| format!("Invalid duration {:?}: {}", input, err))?
    };

    if duration.is_negative() || duration.is_zero() {
        return Err(format!("Timeout must be positive, got {:?}", input));
    }

    Duration::try_from(duration).map_err(|err| err.to_string())
}
