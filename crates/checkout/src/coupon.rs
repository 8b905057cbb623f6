//! Coupon validation state machine.
//!
//! At most one coupon is authoritative at a time. Validation runs against
//! the remote pricing authority, keyed by the cart signature; when the cart
//! drifts after a coupon was applied, the coupon is revalidated silently
//! after a debounce window.
//!
//! The machine is an actor: a spawned task owns all mutable state and is
//! driven by an event queue, with the debounce modeled as a cancellable
//! timer inside its `select!` loop. Callers observe state through a watch
//! channel snapshot. Validation requests carry a monotonic generation;
//! completions with a stale generation are dropped, so an out-of-order
//! response can never overwrite the result of a newer request.

use std::sync::Arc;
use std::time::Duration;

use taraba_core::Money;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;

use crate::remote::{CouponLine, CouponVerifyRequest, PricingApi};

/// Debounce window for signature-triggered revalidation.
pub const REVALIDATE_DEBOUNCE: Duration = Duration::from_millis(450);

/// Reason shown when the authority could not be reached at all.
const GENERIC_FAILURE_REASON: &str = "could not verify the coupon, please try again";

/// Reason shown when the coupon is valid but covers nothing in the cart.
const NOT_APPLICABLE_REASON: &str = "the coupon does not apply to any product in the cart";

/// The coupon machine's externally visible state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponState {
    /// No coupon in play.
    Idle,
    /// A validation request is in flight.
    Validating,
    /// The coupon is applied; the discount is authoritative.
    Applied {
        code: String,
        discount: Money,
        conditions: Vec<String>,
    },
    /// The coupon was refused; the reason is user-visible.
    Rejected { code: String, reason: String },
    /// The cart drifted since the coupon was applied; the previous discount
    /// still stands until the pending revalidation answers.
    Invalidated {
        code: String,
        discount: Money,
        conditions: Vec<String>,
    },
}

impl CouponState {
    /// The discount currently in force, zero unless applied or invalidated.
    #[must_use]
    pub fn discount(&self) -> Money {
        match self {
            Self::Applied { discount, .. } | Self::Invalidated { discount, .. } => *discount,
            _ => Money::ZERO,
        }
    }

    /// The applied code, when one is in force.
    #[must_use]
    pub fn applied_code(&self) -> Option<&str> {
        match self {
            Self::Applied { code, .. } | Self::Invalidated { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Snapshot published through the watch channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponSnapshot {
    pub state: CouponState,
    /// Code submitted and awaiting a verdict - recorded eagerly on apply so
    /// a second manual submission of the same code cannot race the first.
    pub candidate: Option<String>,
    /// Whether the latest transition came from a manual apply. The UI only
    /// shows a success toast on the manual path; the silent revalidation
    /// path surfaces errors alone.
    pub manual: bool,
}

impl CouponSnapshot {
    const fn idle() -> Self {
        Self {
            state: CouponState::Idle,
            candidate: None,
            manual: false,
        }
    }
}

enum Event {
    Apply {
        code: String,
        lines: Vec<CouponLine>,
        signature: String,
        respond: Option<oneshot::Sender<CouponSnapshot>>,
    },
    Remove,
    CartChanged {
        lines: Vec<CouponLine>,
        signature: String,
    },
    Completed {
        generation: u64,
        code: String,
        signature: String,
        manual: bool,
        outcome: Outcome,
    },
    Shutdown,
}

enum Outcome {
    Applied {
        discount: Money,
        conditions: Vec<String>,
    },
    Rejected {
        reason: String,
    },
}

/// Handle to the coupon actor. Dropping it shuts the actor down, which also
/// cancels any armed debounce timer.
pub struct CouponValidator {
    events: mpsc::UnboundedSender<Event>,
    snapshot: watch::Receiver<CouponSnapshot>,
}

impl CouponValidator {
    /// Spawn the actor over a pricing API.
    #[must_use]
    pub fn spawn(api: Arc<dyn PricingApi>) -> Self {
        let (events, rx) = mpsc::unbounded_channel();
        let (state_tx, snapshot) = watch::channel(CouponSnapshot::idle());

        let actor = Actor {
            api,
            completions: events.clone(),
            state: state_tx,
            generation: 0,
            candidate: None,
            current_signature: String::new(),
            current_lines: Vec::new(),
            last_validated_signature: None,
            pending_reply: None,
        };
        tokio::spawn(actor.run(rx));

        Self { events, snapshot }
    }

    /// Manually submit a coupon code and wait for its verdict.
    ///
    /// A newer apply supersedes the wait; in that case the latest snapshot
    /// is returned instead of the superseded verdict.
    pub async fn apply(
        &self,
        code: impl Into<String>,
        lines: Vec<CouponLine>,
        signature: String,
    ) -> CouponSnapshot {
        let (tx, rx) = oneshot::channel();
        let _ = self.events.send(Event::Apply {
            code: code.into(),
            lines,
            signature,
            respond: Some(tx),
        });
        match rx.await {
            Ok(snapshot) => snapshot,
            Err(_) => self.snapshot(),
        }
    }

    /// Manually submit a coupon code without waiting for the verdict.
    pub fn apply_detached(&self, code: impl Into<String>, lines: Vec<CouponLine>, signature: String) {
        let _ = self.events.send(Event::Apply {
            code: code.into(),
            lines,
            signature,
            respond: None,
        });
    }

    /// Discard the coupon entirely.
    pub fn remove(&self) {
        let _ = self.events.send(Event::Remove);
    }

    /// Report a cart content change. The actor compares the signature with
    /// the last validated one and schedules revalidation when needed.
    pub fn cart_changed(&self, lines: Vec<CouponLine>, signature: String) {
        let _ = self.events.send(Event::CartChanged { lines, signature });
    }

    /// The current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CouponSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CouponSnapshot> {
        self.snapshot.clone()
    }
}

impl Drop for CouponValidator {
    fn drop(&mut self) {
        // The actor holds a completions sender of its own, so a plain
        // channel close would not end its loop.
        let _ = self.events.send(Event::Shutdown);
    }
}

struct Actor {
    api: Arc<dyn PricingApi>,
    completions: mpsc::UnboundedSender<Event>,
    state: watch::Sender<CouponSnapshot>,
    generation: u64,
    candidate: Option<String>,
    current_signature: String,
    current_lines: Vec<CouponLine>,
    last_validated_signature: Option<String>,
    pending_reply: Option<oneshot::Sender<CouponSnapshot>>,
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Event>) {
        let mut debounce: Option<Instant> = None;

        loop {
            let deadline = debounce.unwrap_or_else(Instant::now);
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        None | Some(Event::Shutdown) => break,
                        Some(event) => self.handle(event, &mut debounce),
                    }
                }
                () = tokio::time::sleep_until(deadline), if debounce.is_some() => {
                    debounce = None;
                    self.revalidate();
                }
            }
        }
    }

    fn handle(&mut self, event: Event, debounce: &mut Option<Instant>) {
        match event {
            Event::Apply {
                code,
                lines,
                signature,
                respond,
            } => {
                // Eagerly recorded candidate: a repeat submission of the
                // same code while its verdict is pending is a no-op; the
                // caller gets the verdict of the in-flight request.
                if self.state.borrow().state == CouponState::Validating
                    && self.candidate.as_deref() == Some(code.as_str())
                {
                    if let Some(respond) = respond {
                        self.attach_reply(respond);
                    }
                    return;
                }

                self.current_lines = lines;
                self.current_signature = signature;
                self.candidate = Some(code.clone());
                if let Some(respond) = respond {
                    // Supersedes a reply still owed to an older apply.
                    self.pending_reply = Some(respond);
                }
                // A manual apply always wins over a pending revalidation.
                *debounce = None;
                self.start_validation(code, true);
            }
            Event::Remove => {
                self.generation += 1; // invalidate any in-flight request
                self.candidate = None;
                self.last_validated_signature = None;
                self.pending_reply = None;
                *debounce = None;
                self.publish(CouponState::Idle, false);
            }
            Event::CartChanged { lines, signature } => {
                if signature == self.current_signature {
                    return;
                }
                self.current_lines = lines;
                self.current_signature = signature.clone();

                let state = self.state.borrow().state.clone();
                match state {
                    CouponState::Applied {
                        code,
                        discount,
                        conditions,
                    } if self.last_validated_signature.as_deref() != Some(signature.as_str()) => {
                        self.publish(
                            CouponState::Invalidated {
                                code,
                                discount,
                                conditions,
                            },
                            false,
                        );
                        *debounce = Some(Instant::now() + REVALIDATE_DEBOUNCE);
                    }
                    CouponState::Invalidated { .. } => {
                        // Still drifting; push the window out again.
                        *debounce = Some(Instant::now() + REVALIDATE_DEBOUNCE);
                    }
                    // Validating: the completion handler compares signatures
                    // and refires if the cart moved while in flight.
                    _ => {}
                }
            }
            Event::Completed {
                generation,
                code,
                signature,
                manual,
                outcome,
            } => {
                if generation != self.generation {
                    // Superseded by a newer apply/remove; the final state is
                    // derived from the latest request only.
                    return;
                }
                self.last_validated_signature = Some(signature.clone());

                match outcome {
                    Outcome::Applied {
                        discount,
                        conditions,
                    } => {
                        self.publish(
                            CouponState::Applied {
                                code: code.clone(),
                                discount,
                                conditions,
                            },
                            manual,
                        );
                    }
                    Outcome::Rejected { reason } => {
                        self.candidate = None;
                        self.publish(
                            CouponState::Rejected {
                                code: code.clone(),
                                reason,
                            },
                            manual,
                        );
                    }
                }

                // The cart moved while the request was in flight: the
                // verdict just stored answers a stale signature, so
                // revalidate against the current one immediately.
                if signature != self.current_signature
                    && self.candidate.as_deref() == Some(code.as_str())
                {
                    self.start_validation(code, false);
                } else if let Some(reply) = self.pending_reply.take() {
                    let _ = reply.send(self.state.borrow().clone());
                }
            }
            Event::Shutdown => {}
        }
    }

    fn attach_reply(&mut self, respond: oneshot::Sender<CouponSnapshot>) {
        self.pending_reply = Some(respond);
    }

    fn revalidate(&mut self) {
        let Some(code) = self.candidate.clone() else {
            return;
        };
        if self.last_validated_signature.as_deref() == Some(self.current_signature.as_str()) {
            return;
        }
        self.start_validation(code, false);
    }

    fn start_validation(&mut self, code: String, manual: bool) {
        self.generation += 1;
        let generation = self.generation;
        let signature = self.current_signature.clone();
        let request = CouponVerifyRequest {
            cod_cupon: code.clone(),
            produse: self.current_lines.clone(),
        };

        self.publish(CouponState::Validating, manual);

        let api = Arc::clone(&self.api);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = match api.verify_coupon(request).await {
                Ok(response) => {
                    if !response.cupon.valid {
                        Outcome::Rejected {
                            reason: response
                                .cupon
                                .reason
                                .unwrap_or_else(|| GENERIC_FAILURE_REASON.to_owned()),
                        }
                    } else if !response.any_product_applicable() {
                        Outcome::Rejected {
                            reason: NOT_APPLICABLE_REASON.to_owned(),
                        }
                    } else {
                        Outcome::Applied {
                            discount: Money::new(response.totals.total_discount),
                            conditions: response.cupon.conditii,
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("coupon verification failed: {e}");
                    Outcome::Rejected {
                        reason: GENERIC_FAILURE_REASON.to_owned(),
                    }
                }
            };
            let _ = completions.send(Event::Completed {
                generation,
                code,
                signature,
                manual,
                outcome,
            });
        });
    }

    fn publish(&self, state: CouponState, manual: bool) {
        self.state.send_replace(CouponSnapshot {
            state,
            candidate: self.candidate.clone(),
            manual,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use rust_decimal_macros::dec;

    use super::*;
    use crate::remote::{
        CouponProduct, CouponTotals, CouponVerdict, CouponVerifyResponse, CustomerCheckRequest,
        CustomerCheckResponse, OrderSubmitRequest, OrderSubmitResponse, RemoteError,
    };

    /// Scripted pricing API: per-code verdicts, call counting, optional
    /// per-code latency so tests can interleave responses.
    #[derive(Default)]
    struct ScriptedApi {
        verdicts: Mutex<HashMap<String, CouponVerifyResponse>>,
        delays: Mutex<HashMap<String, Duration>>,
        calls: AtomicU32,
        fail: AtomicBool,
    }

    impl ScriptedApi {
        fn applied(discount: rust_decimal::Decimal) -> CouponVerifyResponse {
            CouponVerifyResponse {
                cupon: CouponVerdict {
                    valid: true,
                    reason: None,
                    discount_text: None,
                    conditii: vec!["minim un produs".into()],
                },
                produse: vec![CouponProduct {
                    titlu: Some("Cana".into()),
                    valabil_cupon: Some(true),
                    reason: None,
                }],
                totals: CouponTotals {
                    total_discount: discount,
                },
            }
        }

        fn rejected(reason: &str) -> CouponVerifyResponse {
            CouponVerifyResponse {
                cupon: CouponVerdict {
                    valid: false,
                    reason: Some(reason.into()),
                    ..CouponVerdict::default()
                },
                ..CouponVerifyResponse::default()
            }
        }

        fn script(&self, code: &str, response: CouponVerifyResponse) {
            self.verdicts.lock().unwrap().insert(code.into(), response);
        }

        fn delay(&self, code: &str, delay: Duration) {
            self.delays.lock().unwrap().insert(code.into(), delay);
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PricingApi for ScriptedApi {
        async fn verify_coupon(
            &self,
            request: CouponVerifyRequest,
        ) -> Result<CouponVerifyResponse, RemoteError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delays.lock().unwrap().get(&request.cod_cupon).copied();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(RemoteError::Api {
                    status: 500,
                    message: "boom".into(),
                });
            }
            Ok(self
                .verdicts
                .lock()
                .unwrap()
                .get(&request.cod_cupon)
                .cloned()
                .unwrap_or_else(|| Self::rejected("unknown code")))
        }

        async fn check_customer(
            &self,
            _request: CustomerCheckRequest,
        ) -> Result<CustomerCheckResponse, RemoteError> {
            Ok(CustomerCheckResponse::default())
        }

        async fn submit_order(
            &self,
            _request: OrderSubmitRequest,
        ) -> Result<OrderSubmitResponse, RemoteError> {
            Ok(OrderSubmitResponse {
                success: true,
                order: None,
                message: None,
            })
        }
    }

    fn lines() -> Vec<CouponLine> {
        vec![CouponLine {
            id: taraba_core::ProductId::new(1),
            quantity: 1,
        }]
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_success() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));

        let validator = CouponValidator::spawn(api);
        let snap = validator.apply("VARA10", lines(), "1:a:1".into()).await;
        assert_eq!(
            snap.state,
            CouponState::Applied {
                code: "VARA10".into(),
                discount: Money::new(dec!(25)),
                conditions: vec!["minim un produs".into()],
            }
        );
        assert!(snap.manual);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_code_is_rejected_with_reason() {
        let api = Arc::new(ScriptedApi::default());
        api.script("EXPIRAT", ScriptedApi::rejected("cupon expirat"));

        let validator = CouponValidator::spawn(api);
        let snap = validator.apply("EXPIRAT", lines(), "1:a:1".into()).await;
        assert_eq!(
            snap.state,
            CouponState::Rejected {
                code: "EXPIRAT".into(),
                reason: "cupon expirat".into(),
            }
        );
        assert!(snap.candidate.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_but_inapplicable_is_rejected() {
        let api = Arc::new(ScriptedApi::default());
        let mut response = ScriptedApi::applied(dec!(10));
        response.produse[0].valabil_cupon = Some(false);
        api.script("NICHE", response);

        let validator = CouponValidator::spawn(api);
        let snap = validator.apply("NICHE", lines(), "1:a:1".into()).await;
        assert!(matches!(snap.state, CouponState::Rejected { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_failure_is_generic_rejection() {
        let api = Arc::new(ScriptedApi::default());
        api.fail.store(true, Ordering::SeqCst);

        let validator = CouponValidator::spawn(api);
        let snap = validator.apply("VARA10", lines(), "1:a:1".into()).await;
        match snap.state {
            CouponState::Rejected { reason, .. } => assert_eq!(reason, GENERIC_FAILURE_REASON),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_idempotent_for_same_code_and_signature() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));

        let validator = CouponValidator::spawn(api);
        let first = validator.apply("VARA10", lines(), "1:a:1".into()).await;
        let second = validator.apply("VARA10", lines(), "1:a:1".into()).await;
        assert_eq!(first.state, second.state);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cart_drift_revalidates_once_after_debounce() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply("VARA10", lines(), "1:a:1".into()).await;
        assert_eq!(api.call_count(), 1);

        validator.cart_changed(lines(), "1:a:2".into());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(
            validator.snapshot().state,
            CouponState::Invalidated { .. }
        ));
        // The previous discount stands while invalidated.
        assert_eq!(validator.snapshot().state.discount(), Money::new(dec!(25)));

        tokio::time::sleep(REVALIDATE_DEBOUNCE + Duration::from_millis(50)).await;
        let snap = validator.snapshot();
        assert!(matches!(snap.state, CouponState::Applied { .. }));
        // Exactly one extra call, on the silent path.
        assert_eq!(api.call_count(), 2);
        assert!(!snap.manual);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_cart_changes_coalesce() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply("VARA10", lines(), "1:a:1".into()).await;

        for qty in 2..=5 {
            validator.cart_changed(lines(), format!("1:a:{qty}"));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(REVALIDATE_DEBOUNCE + Duration::from_millis(50)).await;

        // One initial validation plus one trailing revalidation.
        assert_eq!(api.call_count(), 2);
        assert!(matches!(
            validator.snapshot().state,
            CouponState::Applied { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_signature_does_not_revalidate() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply("VARA10", lines(), "1:a:1".into()).await;

        validator.cart_changed(lines(), "1:a:1".into());
        tokio::time::sleep(REVALIDATE_DEBOUNCE * 2).await;
        assert_eq!(api.call_count(), 1);
        assert!(matches!(
            validator.snapshot().state,
            CouponState::Applied { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_apply_supersedes_pending_revalidation() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));
        api.script("IARNA20", ScriptedApi::applied(dec!(40)));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply("VARA10", lines(), "1:a:1".into()).await;

        // Arm the debounce, then apply a different code before it fires.
        validator.cart_changed(lines(), "1:a:2".into());
        tokio::time::sleep(Duration::from_millis(100)).await;
        let snap = validator.apply("IARNA20", lines(), "1:a:2".into()).await;
        assert_eq!(snap.state.applied_code(), Some("IARNA20"));

        tokio::time::sleep(REVALIDATE_DEBOUNCE * 2).await;
        assert_eq!(
            validator.snapshot().state.applied_code(),
            Some("IARNA20")
        );
        // VARA10 once, IARNA20 once; the armed revalidation never fired.
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_completion_is_ignored() {
        let api = Arc::new(ScriptedApi::default());
        api.script("SLOW", ScriptedApi::applied(dec!(5)));
        api.script("FAST", ScriptedApi::applied(dec!(50)));
        api.delay("SLOW", Duration::from_millis(300));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply_detached("SLOW", lines(), "1:a:1".into());
        tokio::time::sleep(Duration::from_millis(10)).await;
        let snap = validator.apply("FAST", lines(), "1:a:1".into()).await;
        assert_eq!(snap.state.applied_code(), Some("FAST"));

        // Let the slow response land; it must not overwrite the newer one.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let snap = validator.snapshot();
        assert_eq!(snap.state.applied_code(), Some("FAST"));
        assert_eq!(snap.state.discount(), Money::new(dec!(50)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_returns_to_idle() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));

        let validator = CouponValidator::spawn(api);
        validator.apply("VARA10", lines(), "1:a:1".into()).await;

        validator.remove();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(validator.snapshot().state, CouponState::Idle);
        assert_eq!(validator.snapshot().state.discount(), Money::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cart_drift_while_in_flight_refires() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));
        api.delay("VARA10", Duration::from_millis(200));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply_detached("VARA10", lines(), "1:a:1".into());
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Cart moves while the request is still in flight.
        validator.cart_changed(lines(), "1:a:3".into());

        tokio::time::sleep(Duration::from_millis(600)).await;
        let snap = validator.snapshot();
        assert!(matches!(snap.state, CouponState::Applied { .. }));
        // The in-flight verdict answered a stale signature, so a second
        // request ran against the current one.
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_submission_while_validating_is_single_call() {
        let api = Arc::new(ScriptedApi::default());
        api.script("VARA10", ScriptedApi::applied(dec!(25)));
        api.delay("VARA10", Duration::from_millis(200));

        let validator = CouponValidator::spawn(Arc::clone(&api) as Arc<dyn PricingApi>);
        validator.apply_detached("VARA10", lines(), "1:a:1".into());
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Impatient second click on the same code.
        let snap = validator.apply("VARA10", lines(), "1:a:1".into()).await;

        assert_eq!(snap.state.applied_code(), Some("VARA10"));
        assert_eq!(api.call_count(), 1);
    }
}
