use axum::http::{header, HeaderMap, HeaderValue};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Signs and verifies the values of the cookies this server sets.
///
/// A signed value has the form `<value>.<hex hmac-sha256>`. Values must be
/// made of cookie-safe characters; everything we store is hex or a uuid.
pub struct SignedCookies {
    key: Vec<u8>,
    secure: bool,
}

impl SignedCookies {
    pub fn new(key: impl AsRef<[u8]>, secure: bool) -> Self {
        Self {
            key: key.as_ref().to_vec(),
            secure,
        }
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.key).expect("HMAC accepts keys of any length")
    }

    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        let sig = mac.finalize().into_bytes();
        format!("{}.{}", value, hex::encode(sig))
    }

    pub fn verify(&self, signed: &str) -> Option<String> {
        let (value, sig) = signed.rsplit_once('.')?;
        let sig = hex::decode(sig).ok()?;
        let mut mac = self.mac();
        mac.update(value.as_bytes());
        mac.verify_slice(&sig).ok()?;
        Some(value.to_string())
    }

    /// Verified value of cookie `name`, if the request carries a valid one.
    pub fn read(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        get_cookie(headers, name).and_then(|v| self.verify(&v))
    }

    pub fn set_cookie(&self, name: &str, value: &str) -> HeaderValue {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            name,
            self.sign(value)
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).expect("cookie is built from header-safe characters")
    }

    pub fn remove_cookie(&self, name: &str) -> HeaderValue {
        let cookie = format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", name);
        HeaderValue::from_str(&cookie).expect("cookie is built from header-safe characters")
    }
}

/// Raw value of cookie `name` from the `Cookie` request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let cookies = SignedCookies::new("secret", false);
        let signed = cookies.sign("abc123");
        assert!(signed.starts_with("abc123."));
        assert_eq!(cookies.verify(&signed).as_deref(), Some("abc123"));
    }

    #[test]
    fn test_reject_tampered_value() {
        let cookies = SignedCookies::new("secret", false);
        let signed = cookies.sign("abc123");
        let tampered = signed.replacen("abc123", "abc124", 1);
        assert_eq!(cookies.verify(&tampered), None);
        assert_eq!(cookies.verify("abc123"), None);
        assert_eq!(cookies.verify("abc123.zz"), None);

        let other_key = SignedCookies::new("another secret", false);
        assert_eq!(other_key.verify(&signed), None);
    }

    #[test]
    fn test_get_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=tok.sig; flash="),
        );
        assert_eq!(get_cookie(&headers, "session").as_deref(), Some("tok.sig"));
        assert_eq!(get_cookie(&headers, "theme").as_deref(), Some("dark"));
        assert_eq!(get_cookie(&headers, "flash"), None);
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_signed_cookie() {
        let cookies = SignedCookies::new("secret", false);
        let mut headers = HeaderMap::new();
        let value = format!("session={}", cookies.sign("tok"));
        headers.insert(header::COOKIE, HeaderValue::from_str(&value).unwrap());
        assert_eq!(cookies.read(&headers, "session").as_deref(), Some("tok"));
    }

    #[test]
    fn test_cookie_attributes() {
        let cookies = SignedCookies::new("secret", true);
        let set = cookies.set_cookie("session", "tok");
        let set = set.to_str().unwrap();
        assert!(set.starts_with("session=tok."));
        assert!(set.contains("HttpOnly"));
        assert!(set.ends_with("; Secure"));

        let removed = cookies.remove_cookie("session");
        assert!(removed.to_str().unwrap().contains("Max-Age=0"));
    }
}
