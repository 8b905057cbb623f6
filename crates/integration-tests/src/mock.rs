//! Scripted stand-in for the remote pricing authority.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use rust_decimal::Decimal;
use taraba_checkout::remote::{
    CouponProduct, CouponTotals, CouponVerdict, CouponVerifyRequest, CouponVerifyResponse,
    CustomerCheckRequest, CustomerCheckResponse, CustomerChecks, LookupVerdict, OrderSubmitRequest,
    OrderSubmitResponse, PricingApi, RemoteError,
};
use taraba_core::OrderRef;

/// A pricing authority with per-code coupon scripts, a configurable order
/// verdict, and capture of every submitted order for assertions.
#[derive(Default)]
pub struct ScriptedPricingApi {
    coupons: Mutex<HashMap<String, CouponVerifyResponse>>,
    known_customers: Mutex<HashMap<String, bool>>,
    submit_rejection: Mutex<Option<String>>,
    submissions: Mutex<Vec<OrderSubmitRequest>>,
    coupon_calls: AtomicU32,
    fail: AtomicBool,
}

impl ScriptedPricingApi {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `code` to be accepted with the given discount.
    pub fn script_coupon(&self, code: &str, discount: Decimal) {
        let response = CouponVerifyResponse {
            cupon: CouponVerdict {
                valid: true,
                reason: None,
                discount_text: None,
                conditii: Vec::new(),
            },
            produse: vec![CouponProduct {
                titlu: None,
                valabil_cupon: Some(true),
                reason: None,
            }],
            totals: CouponTotals {
                total_discount: discount,
            },
        };
        if let Ok(mut coupons) = self.coupons.lock() {
            coupons.insert(code.to_owned(), response);
        }
    }

    /// Script `code` to be rejected with a reason.
    pub fn reject_coupon(&self, code: &str, reason: &str) {
        let response = CouponVerifyResponse {
            cupon: CouponVerdict {
                valid: false,
                reason: Some(reason.to_owned()),
                discount_text: None,
                conditii: Vec::new(),
            },
            produse: Vec::new(),
            totals: CouponTotals {
                total_discount: Decimal::ZERO,
            },
        };
        if let Ok(mut coupons) = self.coupons.lock() {
            coupons.insert(code.to_owned(), response);
        }
    }

    /// Mark an email address as an existing customer.
    pub fn know_customer(&self, email: &str) {
        if let Ok(mut known) = self.known_customers.lock() {
            known.insert(email.to_owned(), true);
        }
    }

    /// Make order submission answer with a business rejection.
    pub fn reject_orders(&self, message: &str) {
        if let Ok(mut rejection) = self.submit_rejection.lock() {
            *rejection = Some(message.to_owned());
        }
    }

    /// Make every call fail as if the authority were down.
    pub fn go_down(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Every order submitted so far.
    #[must_use]
    pub fn submissions(&self) -> Vec<OrderSubmitRequest> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Number of coupon verification calls made.
    #[must_use]
    pub fn coupon_calls(&self) -> u32 {
        self.coupon_calls.load(Ordering::SeqCst)
    }

    fn check_up(&self) -> Result<(), RemoteError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RemoteError::Api {
                status: 503,
                message: "service unavailable".to_owned(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PricingApi for ScriptedPricingApi {
    async fn verify_coupon(
        &self,
        request: CouponVerifyRequest,
    ) -> Result<CouponVerifyResponse, RemoteError> {
        self.coupon_calls.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        let scripted = self
            .coupons
            .lock()
            .ok()
            .and_then(|coupons| coupons.get(&request.cod_cupon).cloned());
        Ok(scripted.unwrap_or_else(|| CouponVerifyResponse {
            cupon: CouponVerdict {
                valid: false,
                reason: Some("cupon necunoscut".to_owned()),
                discount_text: None,
                conditii: Vec::new(),
            },
            produse: Vec::new(),
            totals: CouponTotals {
                total_discount: Decimal::ZERO,
            },
        }))
    }

    async fn check_customer(
        &self,
        request: CustomerCheckRequest,
    ) -> Result<CustomerCheckResponse, RemoteError> {
        self.check_up()?;
        let found = self
            .known_customers
            .lock()
            .map(|known| known.contains_key(request.email.as_str()))
            .unwrap_or(false);
        Ok(CustomerCheckResponse {
            customer_exists: Some(found),
            verificari: CustomerChecks {
                email: Some(LookupVerdict { found: Some(found) }),
                telefon: None,
            },
        })
    }

    async fn submit_order(
        &self,
        request: OrderSubmitRequest,
    ) -> Result<OrderSubmitResponse, RemoteError> {
        self.check_up()?;
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push(request);
        }
        let rejection = self
            .submit_rejection
            .lock()
            .ok()
            .and_then(|rejection| rejection.clone());
        Ok(rejection.map_or_else(
            || OrderSubmitResponse {
                success: true,
                order: Some(OrderRef {
                    number: "10042".to_owned(),
                    key: "cheie-comanda".to_owned(),
                }),
                message: None,
            },
            |message| OrderSubmitResponse {
                success: false,
                order: None,
                message: Some(message),
            },
        ))
    }
}
