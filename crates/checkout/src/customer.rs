//! Debounced customer-existence lookup.
//!
//! Purely advisory: the checkout UI uses the answer to offer a login hint,
//! and nothing here ever blocks the flow. A new query aborts the previous
//! one - debounce window and in-flight request alike - and a generation
//! counter makes sure a stale response can never overwrite the result of a
//! more recent query even if the abort raced it.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use taraba_core::Email;
use tokio::sync::watch;
use tokio::task::AbortHandle;

use crate::remote::{CustomerCheckRequest, PricingApi};

/// Debounce window before the lookup request fires.
pub const LOOKUP_DEBOUNCE: Duration = Duration::from_millis(500);

/// What we currently know about the email address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum LookupState {
    /// Nothing known - initial state, and the landing state after an abort
    /// or a failed request.
    Unknown,
    /// A query is debouncing or in flight.
    Checking,
    /// The authority answered.
    Known {
        found_by_email: bool,
        found_by_phone: bool,
    },
}

/// Debounced, cancellable existence check for an email address.
pub struct CustomerLookup {
    api: Arc<dyn PricingApi>,
    state: watch::Sender<LookupState>,
    generation: Arc<AtomicU64>,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl CustomerLookup {
    /// Create a lookup over a pricing API.
    #[must_use]
    pub fn new(api: Arc<dyn PricingApi>) -> Self {
        Self {
            api,
            state: watch::Sender::new(LookupState::Unknown),
            generation: Arc::new(AtomicU64::new(0)),
            in_flight: Mutex::new(None),
        }
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> LookupState {
        *self.state.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<LookupState> {
        self.state.subscribe()
    }

    /// Query the authority for `email`, debounced by [`LOOKUP_DEBOUNCE`].
    ///
    /// Any previous query - still debouncing or already on the wire - is
    /// aborted first.
    pub fn check(&self, email: Email) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.abort_in_flight();
        self.state.send_replace(LookupState::Checking);

        let api = Arc::clone(&self.api);
        let state = self.state.clone();
        let counter = Arc::clone(&self.generation);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(LOOKUP_DEBOUNCE).await;

            let result = api.check_customer(CustomerCheckRequest { email }).await;
            if counter.load(Ordering::SeqCst) != generation {
                // A newer query took over while we were on the wire.
                return;
            }
            match result {
                Ok(response) => {
                    let found = |verdict: Option<crate::remote::LookupVerdict>| {
                        verdict.and_then(|v| v.found).unwrap_or(false)
                    };
                    state.send_replace(LookupState::Known {
                        found_by_email: found(response.verificari.email),
                        found_by_phone: found(response.verificari.telefon),
                    });
                }
                Err(e) => {
                    // Advisory only: no error banner, just back to unknown.
                    tracing::debug!("customer lookup failed: {e}");
                    state.send_replace(LookupState::Unknown);
                }
            }
        })
        .abort_handle();

        if let Ok(mut in_flight) = self.in_flight.lock() {
            *in_flight = Some(handle);
        }
    }

    /// Abort any pending query and return to [`LookupState::Unknown`].
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.abort_in_flight();
        self.state.send_replace(LookupState::Unknown);
    }

    fn abort_in_flight(&self) {
        if let Ok(mut in_flight) = self.in_flight.lock()
            && let Some(handle) = in_flight.take()
        {
            handle.abort();
        }
    }
}

impl Drop for CustomerLookup {
    fn drop(&mut self) {
        self.abort_in_flight();
    }
}
