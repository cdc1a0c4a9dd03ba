//! One-shot messages carried to the next page in a signed cookie.

use axum::http::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::cookie::SignedCookies;

pub const FLASH_COOKIE: &str = "flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

#[derive(Debug, Default, Clone)]
pub struct Flash {
    messages: Vec<FlashMessage>,
}

impl Flash {
    /// Pending messages from the request. A missing or forged cookie yields none.
    pub fn from_headers(cookies: &SignedCookies, headers: &HeaderMap) -> Self {
        let messages = cookies
            .read(headers, FLASH_COOKIE)
            .and_then(|value| decode(&value))
            .unwrap_or_default();
        Self { messages }
    }

    pub fn push(&mut self, level: FlashLevel, text: impl Into<String>) {
        self.messages.push(FlashMessage {
            level,
            text: text.into(),
        });
    }

    pub fn success(mut self, text: impl Into<String>) -> Self {
        self.push(FlashLevel::Success, text);
        self
    }

    pub fn info(mut self, text: impl Into<String>) -> Self {
        self.push(FlashLevel::Info, text);
        self
    }

    pub fn error(mut self, text: impl Into<String>) -> Self {
        self.push(FlashLevel::Error, text);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[FlashMessage] {
        &self.messages
    }

    /// `Set-Cookie` value carrying these messages to the next request.
    pub fn cookie(&self, cookies: &SignedCookies) -> HeaderValue {
        if self.messages.is_empty() {
            return cookies.remove_cookie(FLASH_COOKIE);
        }
        cookies.set_cookie(FLASH_COOKIE, &encode(&self.messages))
    }
}

// Hex keeps the cookie value free of separators.
fn encode(messages: &[FlashMessage]) -> String {
    let json = serde_json::to_vec(messages).unwrap_or_default();
    hex::encode(json)
}

fn decode(value: &str) -> Option<Vec<FlashMessage>> {
    let json = hex::decode(value).ok()?;
    serde_json::from_slice(&json).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    fn request_headers(set_cookie: &HeaderValue) -> HeaderMap {
        let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        headers
    }

    #[test]
    fn test_carry_messages() {
        let cookies = SignedCookies::new("k", false);
        let flash = Flash::default()
            .success("Movie added to watchlist.")
            .error("Something, else; entirely");
        let headers = request_headers(&flash.cookie(&cookies));

        let received = Flash::from_headers(&cookies, &headers);
        assert_eq!(received.messages().len(), 2);
        assert_eq!(received.messages()[0].text, "Movie added to watchlist.");
        assert_eq!(received.messages()[0].level, FlashLevel::Success);
        assert_eq!(received.messages()[1].text, "Something, else; entirely");
    }

    #[test]
    fn test_empty_flash_clears_cookie() {
        let cookies = SignedCookies::new("k", false);
        let value = Flash::default().cookie(&cookies);
        assert!(value.to_str().unwrap().starts_with("flash=;"));
    }

    #[test]
    fn test_forged_flash_is_ignored() {
        let cookies = SignedCookies::new("k", false);
        let flash = Flash::default().info("hello");
        let headers = request_headers(&flash.cookie(&SignedCookies::new("other", false)));
        assert!(Flash::from_headers(&cookies, &headers).is_empty());
    }
}
