use biscotti::SameSite;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure the cookie used to carry the session ID.
///
/// The same attributes are used for the cookie that sets the session ID
/// and for the cookie that instructs the client to discard it.
pub struct SessionCookieConfig {
    /// The name of the cookie used to store the session ID.
    ///
    /// By default, the name is set to `id`.
    #[serde(default = "default_session_cookie_name")]
    pub name: String,
    /// Set the `Domain` attribute on the session cookie.
    ///
    /// By default, the attribute is not set.
    #[serde(default)]
    pub domain: Option<String>,
    /// Set the `Path` attribute on the session cookie.
    ///
    /// By default, the attribute is set to `/`.
    #[serde(default = "default_session_cookie_path")]
    pub path: Option<String>,
    /// Set the `Secure` attribute on the session cookie.
    ///
    /// If the cookie is marked as `Secure`, it will only be transmitted when the connection is secure (e.g. over HTTPS).
    ///
    /// Default is `true`.
    #[serde(default = "default_true")]
    pub secure: bool,
    /// Set the `HttpOnly` attribute on the session cookie.
    ///
    /// If the cookie is marked as `HttpOnly`, it will not be visible to JavaScript
    /// snippets running in the browser.
    ///
    /// Default is `true`.
    #[serde(default = "default_true")]
    pub http_only: bool,
    /// Set the [`SameSite`] attribute on the session cookie.
    ///
    /// By default, the attribute is set to [`SameSite::Lax`].
    #[serde(default = "default_session_cookie_same_site", with = "same_site")]
    pub same_site: Option<SameSite>,
    /// The kind of session cookie to use.
    ///
    /// By default, it is set to [`SessionCookieKind::Persistent`].
    #[serde(default)]
    pub kind: SessionCookieKind,
}

impl Default for SessionCookieConfig {
    fn default() -> Self {
        Self {
            name: default_session_cookie_name(),
            domain: None,
            path: default_session_cookie_path(),
            secure: true,
            http_only: true,
            same_site: default_session_cookie_same_site(),
            kind: Default::default(),
        }
    }
}

fn default_session_cookie_name() -> String {
    // A generic name, to avoid fingerprinting the technology stack.
    "id".to_string()
}

fn default_true() -> bool {
    true
}

fn default_session_cookie_path() -> Option<String> {
    Some("/".to_string())
}

fn default_session_cookie_same_site() -> Option<SameSite> {
    Some(SameSite::Lax)
}

/// The kind of cookie used to carry the session ID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionCookieKind {
    /// A persistent session cookie.
    ///
    /// The cookie is stored on the client's device, with an expiration
    /// set via the `Max-Age` attribute to the session time-to-live.
    ///
    /// This is the default.
    #[default]
    Persistent,
    /// A cookie that expires when the browser session ends.
    ///
    /// What a "browser session" is depends on the browser: both Firefox and
    /// Chrome restore session cookies when they are restarted.
    Session,
}

mod same_site {
    use biscotti::SameSite;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &Option<SameSite>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(SameSite::Strict) => serializer.serialize_some("Strict"),
            Some(SameSite::Lax) => serializer.serialize_some("Lax"),
            Some(SameSite::None) => serializer.serialize_some("None"),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SameSite>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(raw) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        match raw.to_ascii_lowercase().as_str() {
            "strict" => Ok(Some(SameSite::Strict)),
            "lax" => Ok(Some(SameSite::Lax)),
            "none" => Ok(Some(SameSite::None)),
            _ => Err(de::Error::unknown_variant(&raw, &["Strict", "Lax", "None"])),
        }
    }
}
