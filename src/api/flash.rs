//! One-shot user messages: queued as a cookie on a redirect, rendered once
//! on the next page load, then discarded.

use axum_extra::extract::cookie::{Cookie, CookieJar};
use percent_encoding::{NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

const FLASH_COOKIE: &str = "flash";

/// Queue `message` for the next page render.
pub fn set_flash(jar: CookieJar, message: &str) -> CookieJar {
    let encoded = utf8_percent_encode(message, NON_ALPHANUMERIC).to_string();
    let mut cookie = Cookie::new(FLASH_COOKIE, encoded);
    cookie.set_path("/");
    cookie.set_http_only(true);
    jar.add(cookie)
}

/// Pop the pending message, if any, clearing the cookie.
pub fn take_flash(jar: CookieJar) -> (CookieJar, Option<String>) {
    let message = jar.get(FLASH_COOKIE).map(|cookie| {
        percent_decode_str(cookie.value())
            .decode_utf8_lossy()
            .into_owned()
    });

    let jar = if message.is_some() {
        let mut removal = Cookie::new(FLASH_COOKIE, "");
        removal.set_path("/");
        jar.remove(removal)
    } else {
        jar
    };

    (jar, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_survives_a_set_take_round() {
        let jar = set_flash(CookieJar::new(), "End must be greater than start");
        let (_, message) = take_flash(jar);
        assert_eq!(message.as_deref(), Some("End must be greater than start"));
    }

    #[test]
    fn empty_jar_yields_no_message() {
        let (_, message) = take_flash(CookieJar::new());
        assert!(message.is_none());
    }
}
