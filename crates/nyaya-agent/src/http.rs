use nyaya_core::llm::GenerationError;
use reqwest::StatusCode;

/// Map a non-success upstream status onto the retry taxonomy.
///
/// Rate limits and server-side failures may clear on their own; anything
/// else means the request itself (key, model, payload) is wrong.
pub(crate) fn status_error(backend: &str, status: StatusCode, body: &str) -> GenerationError {
    let body = truncate(body.trim(), 300);
    let msg = format!("{backend} returned {status}: {body}");
    if status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
    {
        GenerationError::Transient(msg)
    } else {
        GenerationError::Terminal(msg)
    }
}

pub(crate) fn send_error(backend: &str, err: &reqwest::Error, timeout_secs: u64) -> GenerationError {
    if err.is_timeout() {
        GenerationError::Transient(format!("{backend} request timed out after {timeout_secs}s"))
    } else if err.is_builder() {
        GenerationError::Terminal(format!("{backend} request could not be built: {err}"))
    } else {
        GenerationError::Transient(format!("{backend} request failed: {err}"))
    }
}

pub(crate) fn client(timeout_secs: u64) -> Result<reqwest::Client, GenerationError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| GenerationError::Terminal(format!("http client: {e}")))
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limits_and_5xx_are_transient() {
        for code in [429, 500, 502, 503, 504, 408] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(status_error("gemini", status, "").is_retryable(), "{code}");
        }
    }

    #[test]
    fn client_errors_are_terminal() {
        for code in [400, 401, 403, 404] {
            let status = StatusCode::from_u16(code).unwrap();
            let err = status_error("gemini", status, "API key not valid");
            assert!(matches!(err, GenerationError::Terminal(ref m) if m.contains("API key")));
        }
    }

    #[test]
    fn long_bodies_are_cut_on_char_boundary() {
        let body = "é".repeat(400);
        let cut = truncate(&body, 301);
        assert!(cut.len() <= 301);
        assert!(body.starts_with(cut));
    }
}
