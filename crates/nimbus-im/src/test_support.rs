//! Shared helpers for the wire-contract tests.

use url::form_urlencoded;
use wiremock::{MockServer, Request};

use crate::client::{ClientOptions, NimbusClient};

pub(crate) const TEST_APP_KEY: &str = "test-app-key";
pub(crate) const TEST_APP_SECRET: &str = "test-app-secret";

/// Client pointed at a mock server.
pub(crate) fn test_client(server: &MockServer) -> NimbusClient {
    let options = ClientOptions {
        api_base: server.uri(),
        ..ClientOptions::default()
    };
    NimbusClient::with_options(TEST_APP_KEY, TEST_APP_SECRET, options).expect("client builds")
}

/// Reads one recorded header as a string.
pub(crate) fn header_str(request: &Request, name: &str) -> String {
    request
        .headers
        .get(name)
        .expect("header present")
        .to_str()
        .expect("header is ascii")
        .to_string()
}

/// Splits a form-encoded body into decoded key/value pairs.
pub(crate) fn form_pairs(body: &[u8]) -> Vec<(String, String)> {
    form_urlencoded::parse(body).into_owned().collect()
}

/// The value recorded for `key`, if the form body sent it.
pub(crate) fn form_value(body: &[u8], key: &str) -> Option<String> {
    form_pairs(body)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_bodies_decode_escapes() {
        let pairs = form_pairs(b"a=1&b=hello+world&c=%5B%22g1%22%5D");
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "hello world".to_string()),
                ("c".to_string(), "[\"g1\"]".to_string()),
            ]
        );
        assert_eq!(form_value(b"a=1&b=2", "b").as_deref(), Some("2"));
        assert_eq!(form_value(b"a=1", "missing"), None);
    }
}
