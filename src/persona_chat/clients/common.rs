//! Shared HTTP plumbing for the provider clients.
//!
//! A single `reqwest::Client` is built lazily on first use and cloned into every provider
//! client so that connections, DNS lookups and TLS sessions are reused across requests.

use lazy_static::lazy_static;
use std::time::Duration;

lazy_static! {
    static ref SHARED_HTTP_CLIENT: reqwest::Client = reqwest::ClientBuilder::new()
        // Keep idle connections alive for 90 seconds
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .pool_max_idle_per_host(10)
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .timeout(Duration::from_secs(300))
        .build()
        .unwrap_or_else(|err| {
            log::error!(
                "persona_chat::clients::common: falling back to a default HTTP client: {}",
                err
            );
            reqwest::Client::new()
        });
}

/// Get the process-wide HTTP client.
pub fn get_shared_http_client() -> &'static reqwest::Client {
    &SHARED_HTTP_CLIENT
}

/// Trim a response body so it can be embedded into an error message or log line.
pub fn truncate_body(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut truncated: String = body.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_client_is_reused() {
        let a = get_shared_http_client() as *const reqwest::Client;
        let b = get_shared_http_client() as *const reqwest::Client;
        assert_eq!(a, b);
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("short", 10), "short");
        assert_eq!(truncate_body("abcdefghij", 4), "abcd...");
    }
}
