#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
/// Configure how long sessions live.
pub struct SessionStateConfig {
    /// The time-to-live of a session, i.e. how long to keep its record
    /// in the storage backend after the last request that touched it.
    ///
    /// The expiration is refreshed every time the session is persisted.
    /// This value is also used as `Max-Age` for the session cookie if
    /// [`SessionCookieConfig::kind`] is set to [`SessionCookieKind::Persistent`].
    ///
    /// # Default
    ///
    /// The default value is 24 hours.
    ///
    /// [`SessionCookieConfig::kind`]: super::SessionCookieConfig::kind
    /// [`SessionCookieKind::Persistent`]: super::SessionCookieKind::Persistent
    #[serde(with = "humantime_serde", default = "default_ttl")]
    pub ttl: std::time::Duration,
}

impl Default for SessionStateConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

fn default_ttl() -> std::time::Duration {
    std::time::Duration::from_secs(60 * 60 * 24)
}
