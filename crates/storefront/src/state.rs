//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use secrecy::ExposeSecret;
use taraba_checkout::address::AddressResolver;
use taraba_checkout::draft::{CheckoutDraftStore, MemoryKvStore};
use taraba_checkout::lockers::{Locker, LockerMatcher};
use taraba_checkout::remote::PricingApi;
use taraba_checkout::session::CheckoutSession;
use taraba_checkout::shipping::ShippingResolver;
use tokio::sync::Mutex;

use crate::config::StorefrontConfig;

/// A checkout session shared between concurrent requests of one shopper.
pub type SharedCheckout = Arc<Mutex<CheckoutSession<MemoryKvStore>>>;

/// How long an idle checkout session stays alive.
const SESSION_IDLE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Upper bound on concurrently live checkout sessions.
const SESSION_CAPACITY: u64 = 10_000;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// configuration, the reference datasets, and the per-shopper checkout
/// session registry.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    resolver: Arc<AddressResolver>,
    lockers: Vec<Locker>,
    api: Arc<dyn PricingApi>,
    sessions: Cache<String, SharedCheckout>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `resolver` - Parsed locality reference dataset
    /// * `lockers` - Parsed parcel locker directory
    /// * `api` - Client for the pricing authority
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        resolver: AddressResolver,
        lockers: Vec<Locker>,
        api: Arc<dyn PricingApi>,
    ) -> Self {
        let sessions = Cache::builder()
            .max_capacity(SESSION_CAPACITY)
            .time_to_idle(SESSION_IDLE_TTL)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                resolver: Arc::new(resolver),
                lockers,
                api,
                sessions,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the locality resolver.
    #[must_use]
    pub fn resolver(&self) -> &AddressResolver {
        &self.inner.resolver
    }

    /// Number of lockers in the directory.
    #[must_use]
    pub fn locker_count(&self) -> usize {
        self.inner.lockers.len()
    }

    /// Get or create the checkout session for a session id.
    ///
    /// Sessions are evicted after [`SESSION_IDLE_TTL`] of inactivity; the
    /// encrypted draft store inside survives only as long as the session
    /// does, which is the intended lifetime of an unfinished checkout.
    pub async fn checkout(&self, session_id: &str) -> SharedCheckout {
        let inner = &self.inner;
        inner
            .sessions
            .get_with(session_id.to_owned(), async {
                let store = CheckoutDraftStore::new(
                    MemoryKvStore::new(),
                    inner.config.draft_passphrase.expose_secret(),
                );
                Arc::new(Mutex::new(CheckoutSession::new(
                    Arc::clone(&inner.api),
                    Arc::clone(&inner.resolver),
                    LockerMatcher::new(inner.lockers.clone()),
                    ShippingResolver::new(inner.config.shipping.clone()),
                    store,
                )))
            })
            .await
    }
}
