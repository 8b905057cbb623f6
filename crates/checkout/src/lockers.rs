//! Parcel-locker directory filtering and selection.
//!
//! The locker directory is a read-only reference dataset; this module only
//! filters it against the resolved address and maintains a single valid
//! selection. The match context is an explicit `(county, city)` key - a
//! context change or an empty match set clears the selection, and a match
//! set of exactly one auto-selects it.

use serde::{Deserialize, Serialize};
use taraba_core::LockerId;

use crate::address::{Address, AddressResolver, CAPITAL_COUNTY_CODE, CAPITAL_NAME, fold};

/// A fixed parcel pickup point. Never created or mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locker {
    #[serde(alias = "locker_id")]
    pub id: LockerId,
    pub name: String,
    pub county: String,
    pub city: String,
    pub address: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default)]
    pub postal_code: String,
    #[serde(alias = "boxes", default)]
    pub box_capacity: u32,
}

impl Locker {
    /// The marker written into the secondary address line while this locker
    /// is the delivery destination.
    #[must_use]
    pub fn marker(&self) -> String {
        format!("{} - {}", self.id, self.name)
    }
}

/// Filters the locker directory by resolved address and owns the selection.
#[derive(Debug, Clone, Default)]
pub struct LockerMatcher {
    directory: Vec<Locker>,
    matches: Vec<Locker>,
    selected: Option<Locker>,
    last_context: Option<(String, String)>,
}

impl LockerMatcher {
    /// Build a matcher over an already-parsed locker directory.
    #[must_use]
    pub const fn new(directory: Vec<Locker>) -> Self {
        Self {
            directory,
            matches: Vec::new(),
            selected: None,
            last_context: None,
        }
    }

    /// Parse the static locker directory JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error when the JSON does not match the
    /// expected row shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// The lockers matching the current address context.
    #[must_use]
    pub fn matches(&self) -> &[Locker] {
        &self.matches
    }

    /// The current selection, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Locker> {
        self.selected.as_ref()
    }

    /// Re-filter the directory for a resolved address context.
    ///
    /// The capital county matches any locker whose county field contains the
    /// capital name (the directory writes "Bucuresti", "Bucuresti Sector 3",
    /// and similar); any other county must match exactly after folding. A
    /// known locality additionally requires an exact city match.
    ///
    /// Returns the auto-selected locker when the new context has exactly one
    /// match.
    pub fn refresh(&mut self, county_code: &str, locality: Option<&str>) -> Option<&Locker> {
        let context = (
            fold(county_code),
            locality.map(fold).unwrap_or_default(),
        );
        if self.last_context.as_ref() != Some(&context) {
            self.selected = None;
            self.last_context = Some(context);
        }

        let county_name = AddressResolver::county_name_for(county_code).unwrap_or_default();
        let county_key = fold(county_name);
        let capital = fold(county_code) == fold(CAPITAL_COUNTY_CODE);
        let capital_key = fold(CAPITAL_NAME);
        let city_key = locality.map(fold);

        self.matches = self
            .directory
            .iter()
            .filter(|locker| {
                let locker_county = fold(&locker.county);
                if capital {
                    locker_county.contains(&capital_key)
                } else {
                    locker_county == county_key
                }
            })
            .filter(|locker| {
                // In the capital the city field is unreliable ("Sector 2" vs
                // the city name), so the county match alone decides.
                if capital {
                    return true;
                }
                match &city_key {
                    Some(key) => &fold(&locker.city) == key,
                    None => true,
                }
            })
            .cloned()
            .collect();

        if self.matches.is_empty() {
            self.selected = None;
        } else if let [only] = self.matches.as_slice() {
            self.selected = Some(only.clone());
        }
        self.selected.as_ref()
    }

    /// Select a locker from the current match set by id.
    ///
    /// Returns the selected locker, or `None` when the id is not among the
    /// current matches.
    pub fn select(&mut self, id: &LockerId) -> Option<&Locker> {
        let locker = self.matches.iter().find(|l| &l.id == id)?.clone();
        self.selected = Some(locker);
        self.selected.as_ref()
    }

    /// Drop the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Back-fill the shipping address from the selected locker: address line
    /// and postal code only when previously empty, and the locker marker into
    /// the secondary line unconditionally.
    pub fn backfill_address(locker: &Locker, shipping: &mut Address) {
        if shipping.address1.trim().is_empty() {
            shipping.address1 = locker.address.clone();
        }
        if shipping.postcode.trim().is_empty() {
            shipping.postcode = locker.postal_code.clone();
        }
        shipping.address2 = locker.marker();
    }

    /// Remove the locker marker from the secondary address line, but only if
    /// it is still verbatim what [`Self::backfill_address`] wrote - a line
    /// the user has edited since is left alone.
    pub fn remove_marker(locker: &Locker, shipping: &mut Address) {
        if shipping.address2 == locker.marker() {
            shipping.address2.clear();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn locker(id: &str, name: &str, county: &str, city: &str) -> Locker {
        Locker {
            id: LockerId::new(id),
            name: name.into(),
            county: county.into(),
            city: city.into(),
            address: format!("Adresa {name}"),
            lat: 0.0,
            lng: 0.0,
            postal_code: "010101".into(),
            box_capacity: 20,
        }
    }

    fn matcher() -> LockerMatcher {
        LockerMatcher::new(vec![
            locker("L1", "Easybox Iulius", "Cluj", "Cluj-Napoca"),
            locker("L2", "Easybox Vivo", "Cluj", "Floresti"),
            locker("L3", "Easybox Unirii", "Bucuresti Sector 3", "Sector 3"),
            locker("L4", "Easybox Obor", "București", "Sector 2"),
            locker("L5", "Easybox Crisul", "Bihor", "Oradea"),
        ])
    }

    #[test]
    fn test_from_json_accepts_both_id_spellings() {
        let matcher = LockerMatcher::from_json(
            r#"[
            {"locker_id": "A", "name": "X", "county": "Cluj", "city": "Cluj-Napoca",
             "address": "str 1", "lat": 46.7, "lng": 23.6, "postal_code": "400", "boxes": 10},
            {"id": "B", "name": "Y", "county": "Cluj", "city": "Dej", "address": "str 2"}
        ]"#,
        )
        .unwrap();
        assert_eq!(matcher.directory.len(), 2);
        assert_eq!(matcher.directory[0].id, LockerId::new("A"));
        assert_eq!(matcher.directory[1].id, LockerId::new("B"));
    }

    #[test]
    fn test_capital_relaxed_match() {
        let mut matcher = matcher();
        matcher.refresh("B", Some("Bucuresti"));
        let ids: Vec<_> = matcher.matches().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L3", "L4"]);
    }

    #[test]
    fn test_exact_county_and_city_match() {
        let mut matcher = matcher();
        matcher.refresh("CJ", Some("Cluj-Napoca"));
        let ids: Vec<_> = matcher.matches().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["L1"]);
    }

    #[test]
    fn test_single_match_auto_selects() {
        let mut matcher = matcher();
        let selected = matcher.refresh("BH", Some("Oradea"));
        assert_eq!(selected.unwrap().id, LockerId::new("L5"));
        assert_eq!(matcher.selected().unwrap().id, LockerId::new("L5"));
    }

    #[test]
    fn test_context_change_clears_selection() {
        let mut matcher = matcher();
        matcher.refresh("BH", Some("Oradea"));
        assert!(matcher.selected().is_some());

        matcher.refresh("CJ", None);
        assert!(matcher.selected().is_none());
    }

    #[test]
    fn test_empty_match_set_clears_selection() {
        let mut matcher = matcher();
        matcher.refresh("BH", Some("Oradea"));
        assert!(matcher.selected().is_some());

        matcher.refresh("BH", Some("Beius"));
        assert!(matcher.matches().is_empty());
        assert!(matcher.selected().is_none());
    }

    #[test]
    fn test_same_context_keeps_selection() {
        let mut matcher = matcher();
        matcher.refresh("CJ", None);
        matcher.select(&LockerId::new("L2"));

        matcher.refresh("CJ", None);
        assert_eq!(matcher.selected().unwrap().id, LockerId::new("L2"));
    }

    #[test]
    fn test_select_outside_matches_is_rejected() {
        let mut matcher = matcher();
        matcher.refresh("CJ", Some("Cluj-Napoca"));
        assert!(matcher.select(&LockerId::new("L5")).is_none());
    }

    #[test]
    fn test_backfill_only_fills_empty_fields() {
        let locker = locker("L9", "Easybox Gara", "Cluj", "Dej");
        let mut shipping = Address {
            address1: "Strada mea 5".into(),
            ..Address::default()
        };
        LockerMatcher::backfill_address(&locker, &mut shipping);
        assert_eq!(shipping.address1, "Strada mea 5");
        assert_eq!(shipping.postcode, "010101");
        assert_eq!(shipping.address2, "L9 - Easybox Gara");
    }

    #[test]
    fn test_marker_removed_only_if_verbatim() {
        let locker = locker("L9", "Easybox Gara", "Cluj", "Dej");
        let mut shipping = Address::default();
        LockerMatcher::backfill_address(&locker, &mut shipping);

        let mut edited = shipping.clone();
        edited.address2 = "L9 - Easybox Gara, la intrare".into();
        LockerMatcher::remove_marker(&locker, &mut edited);
        assert_eq!(edited.address2, "L9 - Easybox Gara, la intrare");

        LockerMatcher::remove_marker(&locker, &mut shipping);
        assert!(shipping.address2.is_empty());
    }
}
