use serde::Deserialize;

/// Legacy collection endpoint for protocol v1 hits.
pub const DEFAULT_COLLECTOR_URL: &str = "http://www.google-analytics.com/collect";

/// Root tracker configuration. Loaded from environment variables
/// with the prefix `SSGA__`.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerConfig {
    #[serde(default)]
    pub tracking_id: Option<String>,
    #[serde(default = "default_collector_url")]
    pub collector_url: String,
    /// Total request timeout. `None` leaves the request without a ceiling.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Layout of the persisted client-id token (`_ga` cookie value).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    /// Version string written after the `GA` prefix.
    #[serde(default = "default_token_version")]
    pub version: String,
    /// Whether the token embeds the host's domain depth (`GA1.2.<id>`)
    /// or not (`GA1.<id>`).
    #[serde(default = "default_include_domain_depth")]
    pub include_domain_depth: bool,
    #[serde(default)]
    pub id_span: IdSpan,
}

/// How much of the persisted token after the prefix fields is the client id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdSpan {
    /// Exactly one dot-separated segment; trailing fields are discarded.
    #[default]
    Segment,
    /// The segment and every trailing field, re-joined with `.`.
    Remainder,
}

fn default_collector_url() -> String {
    DEFAULT_COLLECTOR_URL.to_string()
}
fn default_cookie_name() -> String {
    "_ga".to_string()
}
fn default_token_version() -> String {
    "1".to_string()
}
fn default_include_domain_depth() -> bool {
    true
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            cookie_name: default_cookie_name(),
            version: default_token_version(),
            include_domain_depth: default_include_domain_depth(),
            id_span: IdSpan::default(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tracking_id: None,
            collector_url: default_collector_url(),
            timeout_secs: None,
            identity: IdentityConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("SSGA")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
