//! Classification of failure details.
//!
//! The managed process reports provider failures as free-form strings. The
//! supervisor only needs one bit out of them: "did a remote service reject our
//! credentials?" so the host can prompt the user to fix them.

/// HTTP statuses that mark a credential rejection, matched as whole numbers.
const STATUS_CODES: &[&str] = &["401", "403", "429"];

/// Case-insensitive substrings that mark a credential rejection.
const REJECTION_MARKERS: &[&str] = &[
    "unauthorized",
    "unauthorised",
    "forbidden",
    "rate limit",
    "rate-limit",
    "rate_limit",
    "too many requests",
    "invalid api key",
    "invalid_api_key",
    "invalid x-api-key",
    "authentication failed",
    "quota",
];

/// Returns `true` when `detail` looks like an authentication, authorization or
/// rate-limit rejection from a remote provider.
///
/// Phrases match as lowercase substrings. Status codes only match when not
/// part of a longer number, so ports and pids like `4010` or `14290` do not count.
///
/// # Example
/// ```
/// use daemonvisor::is_credential_rejection;
///
/// assert!(is_credential_rejection("HTTP 401 Unauthorized"));
/// assert!(is_credential_rejection("You exceeded your current quota"));
/// assert!(!is_credential_rejection("connection refused"));
/// ```
pub fn is_credential_rejection(detail: &str) -> bool {
    let lower = detail.to_ascii_lowercase();
    REJECTION_MARKERS.iter().any(|m| lower.contains(m))
        || STATUS_CODES.iter().any(|code| contains_number(&lower, code))
}

/// Whether `code` occurs in `haystack` with no ASCII digit on either side.
fn contains_number(haystack: &str, code: &str) -> bool {
    let bytes = haystack.as_bytes();
    haystack.match_indices(code).any(|(at, _)| {
        let end = at + code.len();
        let before = at > 0 && bytes[at - 1].is_ascii_digit();
        let after = end < bytes.len() && bytes[end].is_ascii_digit();
        !before && !after
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_status_codes_and_phrases() {
        for detail in [
            "status 403 from provider",
            "429 Too Many Requests",
            "Forbidden",
            "Rate limit reached for requests",
            "Invalid API key provided",
            "insufficient_quota",
        ] {
            assert!(is_credential_rejection(detail), "{detail}");
        }
    }

    #[test]
    fn ignores_transport_failures() {
        for detail in ["", "connection refused", "dns lookup failed", "bind: address in use"] {
            assert!(!is_credential_rejection(detail), "{detail}");
        }
    }

    #[test]
    fn ignores_codes_inside_ports_and_pids() {
        for detail in [
            "bind 127.0.0.1:4010 failed: address in use",
            "gateway pid 14290 exited with status 1",
            "connect to [::1]:4030 refused",
            "listening on :8401",
        ] {
            assert!(!is_credential_rejection(detail), "{detail}");
        }
    }

    #[test]
    fn matches_codes_at_boundaries() {
        for detail in ["401", "HTTP/1.1 401", "status=403;", "(429)", "code 429: slow down"] {
            assert!(is_credential_rejection(detail), "{detail}");
        }
    }
}
