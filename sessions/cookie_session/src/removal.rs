//! The cookie convention used to make the client forget a destroyed session.
use biscotti::ResponseCookie;
use jiff::{Timestamp, tz::TimeZone};

use crate::config::SessionCookieConfig;

/// The value carried by the cookie that clears the session ID on the client.
pub const CLEARING_VALUE: &str = "";

/// The expiration date of the cookie that clears the session ID on the client.
///
/// It lies in the past, therefore the client discards the cookie immediately.
pub const CLEARING_EXPIRATION: Timestamp = Timestamp::UNIX_EPOCH;

/// Build the cookie that instructs the client to discard its session cookie.
///
/// It carries [`CLEARING_VALUE`] and expires at [`CLEARING_EXPIRATION`].
/// The remaining attributes are taken from the cookie configuration, so that the
/// removal cookie targets the same cookie that was originally set.
pub(crate) fn removal_cookie(config: &SessionCookieConfig) -> ResponseCookie<'static> {
    let mut cookie = ResponseCookie::new(config.name.clone(), CLEARING_VALUE)
        .set_expires(CLEARING_EXPIRATION.to_zoned(TimeZone::UTC));
    if let Some(domain) = config.domain.as_deref() {
        cookie = cookie.set_domain(domain.to_owned());
    }
    if let Some(path) = config.path.as_deref() {
        cookie = cookie.set_path(path.to_owned());
    }
    if let Some(same_site) = config.same_site {
        cookie = cookie.set_same_site(same_site);
    }
    if config.secure {
        cookie = cookie.set_secure(true);
    }
    if config.http_only {
        cookie = cookie.set_http_only(true);
    }
    cookie
}
