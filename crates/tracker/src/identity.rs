//! Client identifier lifecycle: recover it from the persisted token, or
//! generate a UUID-v4 shaped one and write the token back.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use ssga_core::config::{IdSpan, IdentityConfig};
use tracing::{debug, info};
use uuid::Builder;

use crate::store::IdentityStore;

/// The visitor identifier attached to every hit as `cid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    id: String,
    token: String,
    generated: bool,
}

impl ClientIdentity {
    /// Resolve an identity from an optional persisted token.
    ///
    /// A token that cannot be parsed is treated exactly like a missing one.
    pub fn resolve(persisted: Option<&str>, format: &IdentityConfig, host: Option<&str>) -> Self {
        if let Some(raw) = persisted {
            if let Some(id) = extract_client_id(raw, format) {
                return Self {
                    id,
                    token: raw.to_string(),
                    generated: false,
                };
            }
            debug!(token = raw, "persisted client id unreadable, generating a new one");
        }

        let id = generate_client_id();
        let token = format_token(&id, format, host);
        Self {
            id,
            token,
            generated: true,
        }
    }

    /// Resolve against a store, writing the token back when it was generated.
    ///
    /// If another writer stored a token between our read and write, that
    /// token is adopted instead of ours.
    pub fn load(store: &dyn IdentityStore, format: &IdentityConfig, host: Option<&str>) -> Self {
        let key = format.cookie_name.as_str();
        let persisted = store.get(key);
        let identity = Self::resolve(persisted.as_deref(), format, host);
        if !identity.should_persist() {
            return identity;
        }

        if persisted.is_some() {
            // unreadable value: overwrite it
            store.set(key, identity.token.clone());
        } else {
            let stored = store.set_if_absent(key, identity.token.clone());
            if stored != identity.token {
                if let Some(id) = extract_client_id(&stored, format) {
                    debug!(cid = %id, "adopting client id persisted concurrently");
                    return Self {
                        id,
                        token: stored,
                        generated: false,
                    };
                }
            }
        }

        info!(cid = %identity.id, cookie = key, "generated new client id");
        identity
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The persisted form, e.g. `GA1.2.<id>`.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// True when freshly generated, i.e. the token must be written back.
    pub fn should_persist(&self) -> bool {
        self.generated
    }
}

/// Pull the client id out of a persisted token. `None` when malformed.
pub fn extract_client_id(token: &str, format: &IdentityConfig) -> Option<String> {
    let skip = if format.include_domain_depth { 2 } else { 1 };
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() <= skip {
        return None;
    }

    let id = match format.id_span {
        IdSpan::Segment => segments[skip].to_string(),
        IdSpan::Remainder => segments[skip..].join("."),
    };
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Render the persisted token for a client id.
pub fn format_token(id: &str, format: &IdentityConfig, host: Option<&str>) -> String {
    if format.include_domain_depth {
        format!("GA{}.{}.{}", format.version, domain_depth(host), id)
    } else {
        format!("GA{}.{}", format.version, id)
    }
}

/// Number of dots in the host plus one; a missing host counts as no dots.
pub fn domain_depth(host: Option<&str>) -> usize {
    host.map_or(0, |h| h.matches('.').count()) + 1
}

/// Fresh 36-character UUID-v4 layout identifier: version nibble `4`,
/// variant bits `10`. Drawn from a non-cryptographic generator.
pub fn generate_client_id() -> String {
    let bytes: [u8; 16] = SmallRng::from_entropy().gen();
    Builder::from_random_bytes(bytes)
        .into_uuid()
        .hyphenated()
        .to_string()
}
