//! Server-side analytics hit client: builds Measurement Protocol v1 hits
//! (pageviews, events, checkout steps, purchases, refunds), attaches a
//! persistent client id and posts them to the collector.
//!
//! # Modules
//!
//! - [`identity`]: client id recovery, generation and token format
//! - [`store`]: persisted client-id storage ([`IdentityStore`])
//! - [`hits`]: hit assembly and product-list flattening
//! - [`transport`]: form POST delivery and status classification
//! - [`session`]: [`TrackingSession`], the public entry point
//! - [`outcome`]: tri-state hit outcome

pub mod hits;
pub mod identity;
pub mod outcome;
pub mod session;
pub mod store;
pub mod transport;

pub use hits::{HitBuilder, RequestContext, Transaction, CHECKOUT_DELIVERY, CHECKOUT_PAYMENT};
pub use identity::ClientIdentity;
pub use outcome::{FailureReason, HitOutcome};
pub use session::{SessionBuilder, TrackingSession};
pub use store::{IdentityStore, MemoryIdentityStore, NullIdentityStore};
pub use transport::{HttpTransport, RecordingTransport, Transport};
