use biscotti::ResponseCookie;
use cookie_session::removal::{CLEARING_EXPIRATION, CLEARING_VALUE};
use googletest::matcher::{self, Matcher, MatcherBase};
use jiff::tz::TimeZone;

/// Check if the cookie deletes the client-side state, thus invalidating the session.
pub fn is_removal_cookie() -> RemovalCookieMatcher {
    RemovalCookieMatcher
}

#[derive(Clone, Copy, matcher::MatcherBase)]
pub struct RemovalCookieMatcher;

impl Matcher<&ResponseCookie<'static>> for RemovalCookieMatcher {
    fn matches(&self, actual: &ResponseCookie<'static>) -> matcher::MatcherResult {
        if actual.value() != CLEARING_VALUE {
            return matcher::MatcherResult::NoMatch;
        }
        if let Some(expires) = actual.expires() {
            if let Some(expires) = expires.datetime() {
                let clearing_expiration = CLEARING_EXPIRATION.to_zoned(TimeZone::UTC);
                return (expires == clearing_expiration).into();
            }
        }
        matcher::MatcherResult::NoMatch
    }

    fn describe(
        &self,
        matcher_result: matcher::MatcherResult,
    ) -> googletest::description::Description {
        match matcher_result {
            matcher::MatcherResult::Match => "is a removal cookie",
            matcher::MatcherResult::NoMatch => "isn't a removal cookie",
        }
        .into()
    }
}
