//! Encrypted persistence of the in-progress checkout form.
//!
//! The draft survives a page reload by being written - encrypted - to a
//! key-value store the host supplies. Hydration happens at most once per
//! store instance, and any blob that fails to decode, decrypt, or parse is
//! treated as "no draft": a corrupted or foreign-key blob must never crash
//! checkout, and must never surface to the user.

use chacha20poly1305::aead::{Aead, OsRng};
use chacha20poly1305::{AeadCore, KeyInit, XChaCha20Poly1305, XNonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use taraba_core::{Email, LockerId, PaymentMethodId};

use crate::address::Address;
use crate::shipping::DeliveryMethod;

/// KV key for the encrypted draft blob.
pub const DRAFT_KEY: &str = "taraba:checkout-draft";

/// KV key for the plain last-applied coupon code.
pub const COUPON_CODE_KEY: &str = "taraba:cupon";

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;

/// Minimal key-value persistence interface (get/set/remove).
///
/// The engine never touches browser storage or disk directly; the host
/// injects whatever backend it has. [`MemoryKvStore`] ships with the crate
/// and backs both tests and the server's session-scoped stores.
pub trait KvStore: Send {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;
    /// Write a value.
    fn set(&mut self, key: &str, value: String);
    /// Delete a value.
    fn remove(&mut self, key: &str);
}

/// In-memory [`KvStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    entries: std::collections::HashMap<String, String>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_owned(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Contact details collected alongside the addresses.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<Email>,
    pub phone: String,
    pub first_name: String,
    pub last_name: String,
}

/// Company details for invoiced orders.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub vat_code: String,
    pub reg_number: Option<String>,
}

/// The in-progress, not-yet-submitted checkout form state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CheckoutDraft {
    pub contact: ContactInfo,
    pub billing: Address,
    pub shipping: Address,
    pub company: Option<CompanyInfo>,
    pub delivery_method: Option<DeliveryMethod>,
    pub payment_method: Option<PaymentMethodId>,
    pub use_different_shipping: bool,
    pub selected_locker: Option<LockerId>,
}

/// XChaCha20-Poly1305 over a passphrase-derived key.
///
/// The passphrase is stretched or truncated to the fixed 32-byte key length;
/// every write uses a freshly generated random 24-byte nonce, prepended to
/// the ciphertext in the stored blob.
#[derive(Clone)]
struct DraftCipher {
    cipher: XChaCha20Poly1305,
}

impl DraftCipher {
    fn new(passphrase: &str) -> Self {
        // Stretch short passphrases by repetition, truncate long ones; an
        // empty passphrase leaves the all-zero key, which is still a valid
        // key for our fail-closed decryption.
        let mut key = [0_u8; KEY_LEN];
        for (slot, byte) in key.iter_mut().zip(passphrase.bytes().cycle()) {
            *slot = byte;
        }
        Self {
            cipher: XChaCha20Poly1305::new(&key.into()),
        }
    }

    fn encrypt(&self, plaintext: &[u8]) -> Option<String> {
        let nonce = XChaCha20Poly1305::generate_nonce(&mut OsRng);
        let ciphertext = self.cipher.encrypt(&nonce, plaintext).ok()?;
        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Some(BASE64.encode(blob))
    }

    fn decrypt(&self, blob: &str) -> Option<Vec<u8>> {
        let raw = BASE64.decode(blob).ok()?;
        if raw.len() <= NONCE_LEN {
            return None;
        }
        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        self.cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .ok()
    }
}

/// Persists the checkout draft, encrypted, with one-time hydration.
pub struct CheckoutDraftStore<S: KvStore> {
    store: S,
    cipher: DraftCipher,
    hydrated: bool,
}

impl<S: KvStore> CheckoutDraftStore<S> {
    /// Create a store over a KV backend and a passphrase.
    pub fn new(store: S, passphrase: &str) -> Self {
        Self {
            store,
            cipher: DraftCipher::new(passphrase),
            hydrated: false,
        }
    }

    /// Read, decrypt, and parse the persisted draft.
    ///
    /// Runs at most once per store instance; later calls return `None`
    /// without touching the backend. Every failure mode - missing key, bad
    /// base64, wrong key, truncated blob, unparseable JSON - is "no draft".
    pub fn hydrate(&mut self) -> Option<CheckoutDraft> {
        if self.hydrated {
            return None;
        }
        self.hydrated = true;

        let blob = self.store.get(DRAFT_KEY)?;
        let plaintext = self.cipher.decrypt(&blob).or_else(|| {
            tracing::debug!("discarding undecryptable checkout draft");
            None
        })?;
        match serde_json::from_slice(&plaintext) {
            Ok(draft) => Some(draft),
            Err(e) => {
                tracing::debug!("discarding unparseable checkout draft: {e}");
                None
            }
        }
    }

    /// Encrypt and write the draft with a fresh nonce.
    ///
    /// Writes are ignored until [`Self::hydrate`] has run, so a persisted
    /// draft cannot be clobbered before the session had a chance to load it.
    pub fn persist(&mut self, draft: &CheckoutDraft) {
        if !self.hydrated {
            return;
        }
        // Serializing our own types cannot fail; encryption only fails on
        // pathological lengths.
        let Ok(plaintext) = serde_json::to_vec(draft) else {
            return;
        };
        if let Some(blob) = self.cipher.encrypt(&plaintext) {
            self.store.set(DRAFT_KEY, blob);
        }
    }

    /// Drop the persisted draft and coupon code. Called after a successful
    /// order submission so state cannot leak into the next order.
    pub fn clear(&mut self) {
        self.store.remove(DRAFT_KEY);
        self.store.remove(COUPON_CODE_KEY);
    }

    /// Remember the last successfully applied coupon code (plaintext).
    pub fn remember_coupon(&mut self, code: &str) {
        self.store.set(COUPON_CODE_KEY, code.to_owned());
    }

    /// The last successfully applied coupon code, if any.
    #[must_use]
    pub fn last_coupon(&self) -> Option<String> {
        self.store.get(COUPON_CODE_KEY)
    }

    /// Forget the remembered coupon code.
    pub fn forget_coupon(&mut self) {
        self.store.remove(COUPON_CODE_KEY);
    }

    /// Whether hydration has already run.
    #[must_use]
    pub const fn is_hydrated(&self) -> bool {
        self.hydrated
    }

    /// Give back the KV backend (used by tests to inspect raw blobs).
    pub fn into_store(self) -> S {
        self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_draft() -> CheckoutDraft {
        CheckoutDraft {
            contact: ContactInfo {
                email: Some(Email::parse("ana@example.com").unwrap()),
                phone: "0722000000".into(),
                first_name: "Ana".into(),
                last_name: "Pop".into(),
            },
            billing: Address {
                county: "Cluj".into(),
                locality: "Cluj-Napoca".into(),
                commune: None,
                address1: "Str. Lunga 1".into(),
                address2: String::new(),
                postcode: "400001".into(),
                country: "Romania".into(),
            },
            shipping: Address::default(),
            company: None,
            delivery_method: Some(DeliveryMethod::Courier),
            payment_method: Some(PaymentMethodId::new(3)),
            use_different_shipping: false,
            selected_locker: None,
        }
    }

    #[test]
    fn test_roundtrip() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        assert!(store.hydrate().is_none());

        let draft = sample_draft();
        store.persist(&draft);

        let mut reloaded = CheckoutDraftStore::new(store.into_store(), "parola");
        assert_eq!(reloaded.hydrate(), Some(draft));
    }

    #[test]
    fn test_roundtrip_empty_draft() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        store.hydrate();
        store.persist(&CheckoutDraft::default());

        let mut reloaded = CheckoutDraftStore::new(store.into_store(), "parola");
        assert_eq!(reloaded.hydrate(), Some(CheckoutDraft::default()));
    }

    #[test]
    fn test_hydrate_runs_at_most_once() {
        let mut writer = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        writer.hydrate();
        writer.persist(&sample_draft());

        let mut store = CheckoutDraftStore::new(writer.into_store(), "parola");
        assert!(store.hydrate().is_some());
        assert!(store.hydrate().is_none());
    }

    #[test]
    fn test_persist_before_hydration_is_ignored() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        store.persist(&sample_draft());
        assert!(store.into_store().get(DRAFT_KEY).is_none());
    }

    #[test]
    fn test_foreign_key_blob_fails_closed() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        store.hydrate();
        store.persist(&sample_draft());

        let mut reloaded = CheckoutDraftStore::new(store.into_store(), "alta-parola");
        assert!(reloaded.hydrate().is_none());
    }

    #[test]
    fn test_garbage_blob_fails_closed() {
        let mut backing = MemoryKvStore::new();
        backing.set(DRAFT_KEY, "nu e base64!!!".into());
        let mut store = CheckoutDraftStore::new(backing, "parola");
        assert!(store.hydrate().is_none());

        let mut backing = MemoryKvStore::new();
        backing.set(DRAFT_KEY, BASE64.encode(b"short"));
        let mut store = CheckoutDraftStore::new(backing, "parola");
        assert!(store.hydrate().is_none());
    }

    #[test]
    fn test_nonce_is_fresh_per_write() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        store.hydrate();

        let draft = sample_draft();
        store.persist(&draft);
        let first = store.store.get(DRAFT_KEY).unwrap();
        store.persist(&draft);
        let second = store.store.get(DRAFT_KEY).unwrap();
        // Same plaintext, different nonce, different blob.
        assert_ne!(first, second);
    }

    #[test]
    fn test_coupon_code_key_is_plaintext() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        store.remember_coupon("VARA10");
        assert_eq!(store.last_coupon().as_deref(), Some("VARA10"));
        assert_eq!(
            store.store.get(COUPON_CODE_KEY).as_deref(),
            Some("VARA10")
        );
        store.forget_coupon();
        assert!(store.last_coupon().is_none());
    }

    #[test]
    fn test_clear_removes_both_keys() {
        let mut store = CheckoutDraftStore::new(MemoryKvStore::new(), "parola");
        store.hydrate();
        store.persist(&sample_draft());
        store.remember_coupon("VARA10");

        store.clear();
        let backing = store.into_store();
        assert!(backing.get(DRAFT_KEY).is_none());
        assert!(backing.get(COUPON_CODE_KEY).is_none());
    }
}
