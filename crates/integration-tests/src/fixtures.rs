//! Shared fixtures: small reference datasets and pre-wired builders.

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use secrecy::SecretString;
use taraba_checkout::address::AddressResolver;
use taraba_checkout::draft::{CheckoutDraftStore, MemoryKvStore};
use taraba_checkout::lockers::{Locker, LockerMatcher};
use taraba_checkout::remote::PricingApi;
use taraba_checkout::session::CheckoutSession;
use taraba_checkout::shipping::{ShippingConfig, ShippingResolver};
use taraba_storefront::config::StorefrontConfig;
use taraba_storefront::state::AppState;
use taraba_storefront::{middleware, routes};

/// A miniature locality dataset in the production row shape.
pub const LOCALITY_DATASET: &str = r#"[
    {"Judet": "Cluj", "Localitate": "Cluj-Napoca", "Comuna": "", "Km aditionali": 0},
    {"Judet": "Cluj", "Localitate": "Măguri", "Comuna": "Mărișel", "Km aditionali": 30},
    {"Judet": "Cluj", "Localitate": "Floresti", "Comuna": "Floresti", "Km aditionali": 5},
    {"Judet": "Bihor", "Localitate": "Oradea", "Comuna": "", "Km aditionali": 0},
    {"Judet": "București", "Localitate": "București", "Comuna": "", "Km aditionali": 0}
]"#;

/// A miniature locker directory using the wire field spellings.
pub const LOCKER_DATASET: &str = r#"[
    {"locker_id": "L1", "name": "Easybox Iulius", "county": "Cluj", "city": "Cluj-Napoca",
     "address": "Str. Centrala 9", "lat": 46.77, "lng": 23.62, "postal_code": "400001", "boxes": 30},
    {"locker_id": "L2", "name": "Easybox Unirii", "county": "Bucuresti Sector 3", "city": "Sector 3",
     "address": "Bd. Unirii 10", "lat": 44.42, "lng": 26.10, "postal_code": "030101", "boxes": 48},
    {"id": "L3", "name": "Easybox Obor", "county": "București", "city": "Sector 2",
     "address": "Sos. Colentina 2", "lat": 44.45, "lng": 26.13, "postal_code": "021601", "boxes": 40}
]"#;

/// The locality resolver over [`LOCALITY_DATASET`].
#[must_use]
pub fn resolver() -> AddressResolver {
    AddressResolver::from_json(LOCALITY_DATASET).expect("fixture locality dataset parses")
}

/// The locker directory from [`LOCKER_DATASET`].
#[must_use]
pub fn lockers() -> Vec<Locker> {
    serde_json::from_str(LOCKER_DATASET).expect("fixture locker dataset parses")
}

/// A checkout engine wired against the fixture datasets and a scripted
/// pricing authority, with a fresh in-memory draft store.
#[must_use]
pub fn engine(api: Arc<dyn PricingApi>) -> CheckoutSession<MemoryKvStore> {
    CheckoutSession::new(
        api,
        Arc::new(resolver()),
        LockerMatcher::new(lockers()),
        ShippingResolver::new(ShippingConfig::default()),
        CheckoutDraftStore::new(MemoryKvStore::new(), "parola de test 9#Qz"),
    )
}

/// A storefront configuration that never touches the environment.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 0,
        base_url: "http://localhost:3000".to_owned(),
        session_secret: SecretString::from("mK2@nL5#pQ7&rT0*uW4^zC6!aB3$xY9"),
        draft_passphrase: SecretString::from("uW4^zC6!aB3$xY9%mK2@nL5#pQ7&rT0"),
        pricing_api_url: "http://localhost:8080".to_owned(),
        locality_dataset: PathBuf::from("data/localitati.json"),
        locker_dataset: PathBuf::from("data/easybox.json"),
        shipping: ShippingConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// The full storefront router over the fixture datasets, ready for
/// `tower::ServiceExt::oneshot`.
#[must_use]
pub fn app(api: Arc<dyn PricingApi>) -> Router {
    let config = test_config();
    let session_layer = middleware::create_session_layer(&config.base_url);
    let state = AppState::new(config, resolver(), lockers(), api);

    Router::new()
        .merge(routes::routes())
        .layer(session_layer)
        .with_state(state)
}
