//! Tracking session: the long-lived aggregate host applications talk to.
//!
//! A session owns the tracking id, the resolved client identity and the base
//! parameter set (`v`, `tid`, `cid` plus ad hoc parameters). Each send
//! builds one hit, merges it over the base set and hands it to the
//! transport. Sessions are not meant to be shared across threads.

use std::sync::Arc;

use ssga_core::config::{IdentityConfig, TrackerConfig};
use ssga_core::error::{SsgaError, SsgaResult};
use ssga_core::params::{is_protected, ParamValue, ParameterSet};
use ssga_core::types::ProductField;
use tracing::{debug, warn};

use crate::hits::{HitBuilder, RequestContext, Transaction};
use crate::identity::ClientIdentity;
use crate::outcome::HitOutcome;
use crate::store::{IdentityStore, MemoryIdentityStore};
use crate::transport::{HttpTransport, Transport};

/// Key of the read-only tracking id parameter.
const TRACKING_ID_KEY: &str = "tid";

pub struct TrackingSession {
    tracking_id: String,
    identity: ClientIdentity,
    params: ParameterSet,
    identity_config: IdentityConfig,
    context: RequestContext,
    store: Arc<dyn IdentityStore>,
    transport: Arc<dyn Transport>,
}

/// Configures a [`TrackingSession`] before its identity is first resolved.
pub struct SessionBuilder {
    tracking_id: String,
    identity_config: IdentityConfig,
    context: RequestContext,
    store: Option<Arc<dyn IdentityStore>>,
    transport: Option<Arc<dyn Transport>>,
}

impl SessionBuilder {
    pub fn new(tracking_id: impl Into<String>) -> Self {
        Self {
            tracking_id: tracking_id.into(),
            identity_config: IdentityConfig::default(),
            context: RequestContext::default(),
            store: None,
            transport: None,
        }
    }

    /// Builder seeded from loaded configuration. Requires a tracking id.
    pub fn from_config(config: &TrackerConfig) -> SsgaResult<Self> {
        let tracking_id = config
            .tracking_id
            .clone()
            .filter(|tid| !tid.is_empty())
            .ok_or_else(|| SsgaError::InvalidArgument("tracking_id is not configured".into()))?;
        Ok(Self::new(tracking_id)
            .identity_config(config.identity.clone())
            .transport(Arc::new(HttpTransport::from_config(config))))
    }

    pub fn identity_config(mut self, config: IdentityConfig) -> Self {
        self.identity_config = config;
        self
    }

    pub fn request_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn identity_store(mut self, store: Arc<dyn IdentityStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve the client identity and build the base parameters.
    pub fn build(self) -> TrackingSession {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryIdentityStore::new()));
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::default()));
        let identity = ClientIdentity::load(
            store.as_ref(),
            &self.identity_config,
            self.context.host.as_deref(),
        );
        let params = ParameterSet::base(&self.tracking_id, identity.id());

        TrackingSession {
            tracking_id: self.tracking_id,
            identity,
            params,
            identity_config: self.identity_config,
            context: self.context,
            store,
            transport,
        }
    }
}

impl TrackingSession {
    /// Session with default identity format and no request context.
    pub fn new(
        tracking_id: impl Into<String>,
        store: Arc<dyn IdentityStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        SessionBuilder::new(tracking_id)
            .identity_store(store)
            .transport(transport)
            .build()
    }

    pub fn builder(tracking_id: impl Into<String>) -> SessionBuilder {
        SessionBuilder::new(tracking_id)
    }

    /// Re-resolve the client identity and rebuild the base parameters,
    /// optionally switching tracking id. Ad hoc parameters are discarded.
    pub fn reset(&mut self, tracking_id: Option<&str>) {
        if let Some(tid) = tracking_id {
            self.tracking_id = tid.to_string();
        }
        self.identity = ClientIdentity::load(
            self.store.as_ref(),
            &self.identity_config,
            self.context.host.as_deref(),
        );
        self.params = ParameterSet::base(&self.tracking_id, self.identity.id());
        debug!(tid = %self.tracking_id, cid = %self.identity.id(), "session reset");
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    pub fn client_id(&self) -> &str {
        self.identity.id()
    }

    /// The persisted `_ga`-style token for the current client id.
    pub fn persisted_token(&self) -> &str {
        self.identity.token()
    }

    pub fn request_context(&self) -> &RequestContext {
        &self.context
    }

    pub fn set_request_context(&mut self, context: RequestContext) {
        self.context = context;
    }

    /// The base parameters every hit is merged over.
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    /// Add or overwrite a base parameter. The tracking id is read only, and
    /// the other protected keys (`v`, `cid`) cannot be nulled.
    pub fn set_parameter(
        &mut self,
        key: &str,
        value: Option<impl Into<ParamValue>>,
    ) -> SsgaResult<()> {
        if key.eq_ignore_ascii_case(TRACKING_ID_KEY) {
            return Err(SsgaError::ReadOnlyParameter(TRACKING_ID_KEY.to_string()));
        }
        let value = value.map(Into::into);
        if value.is_none() && is_protected(key) {
            return Err(SsgaError::InvalidArgument(format!(
                "parameter \"{key}\" cannot be null"
            )));
        }
        self.params.insert_opt(key, value);
        Ok(())
    }

    pub fn get_parameter(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    /// True when the key is set, even to a null value.
    pub fn has_parameter(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Send a raw hit merged over the base parameters.
    pub fn send(&self, params: ParameterSet) -> HitOutcome {
        let hit = params.merged_over(&self.params);
        let hit_type = hit.get("t").map(ToString::to_string).unwrap_or_default();
        debug!(hit_type = %hit_type, param_count = hit.len(), "sending hit");
        self.transport.send(&hit)
    }

    pub fn send_pageview(&self, params: ParameterSet) -> HitOutcome {
        let hit = self.hits().pageview(params);
        self.send(hit)
    }

    pub fn send_event(&self, category: &str, action: &str, params: ParameterSet) -> HitOutcome {
        let hit = self.hits().event(category, action, params);
        self.send(hit)
    }

    /// Checkout step hit. An item list yielding no product params fails
    /// without touching the network.
    pub fn send_checkout(
        &self,
        items: &[ProductField],
        step: i64,
        value: impl Into<ParamValue>,
        params: ParameterSet,
    ) -> HitOutcome {
        match self.hits().checkout(items, step, value, params) {
            Ok(hit) => self.send(hit),
            Err(reason) => {
                warn!(reason = %reason, "checkout hit not sent");
                HitOutcome::Failed(reason)
            }
        }
    }

    pub fn send_purchase(
        &self,
        items: &[ProductField],
        transaction: &Transaction,
        params: ParameterSet,
    ) -> HitOutcome {
        match self.hits().purchase(items, transaction, params) {
            Ok(hit) => self.send(hit),
            Err(reason) => {
                warn!(reason = %reason, ti = %transaction.id, "purchase hit not sent");
                HitOutcome::Failed(reason)
            }
        }
    }

    pub fn send_refund(&self, transaction_id: impl Into<ParamValue>, params: ParameterSet) -> HitOutcome {
        let hit = self.hits().refund(transaction_id, params);
        self.send(hit)
    }

    fn hits(&self) -> HitBuilder<'_> {
        HitBuilder::new(&self.context)
    }
}
