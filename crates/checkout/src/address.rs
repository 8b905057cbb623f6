//! County/locality/commune resolution and distance surcharges.
//!
//! Raw address text comes from free-text user input and from a reference
//! locality dataset whose rows carry Romanian diacritics inconsistently, so
//! every comparison in this module goes through [`fold`] first: strip
//! diacritics, lowercase, trim.
//!
//! The dataset also carries a per-locality "additional kilometres" fee. That
//! amount is advisory: it is shown to the user as a distance warning but
//! never enters the computed shipping fee.

use serde::{Deserialize, Serialize};
use taraba_core::Money;

/// Romanian counties, code to name. Bucharest is the capital-city entry and
/// gets relaxed locker matching (see [`crate::lockers`]).
pub const COUNTIES: &[(&str, &str)] = &[
    ("AB", "Alba"),
    ("AR", "Arad"),
    ("AG", "Arges"),
    ("BC", "Bacau"),
    ("BH", "Bihor"),
    ("BN", "Bistrita-Nasaud"),
    ("BT", "Botosani"),
    ("BV", "Brasov"),
    ("BR", "Braila"),
    ("B", "Bucuresti"),
    ("BZ", "Buzau"),
    ("CS", "Caras-Severin"),
    ("CL", "Calarasi"),
    ("CJ", "Cluj"),
    ("CT", "Constanta"),
    ("CV", "Covasna"),
    ("DB", "Dambovita"),
    ("DJ", "Dolj"),
    ("GL", "Galati"),
    ("GR", "Giurgiu"),
    ("GJ", "Gorj"),
    ("HR", "Harghita"),
    ("HD", "Hunedoara"),
    ("IL", "Ialomita"),
    ("IS", "Iasi"),
    ("IF", "Ilfov"),
    ("MM", "Maramures"),
    ("MH", "Mehedinti"),
    ("MS", "Mures"),
    ("NT", "Neamt"),
    ("OT", "Olt"),
    ("PH", "Prahova"),
    ("SM", "Satu Mare"),
    ("SJ", "Salaj"),
    ("SB", "Sibiu"),
    ("SV", "Suceava"),
    ("TR", "Teleorman"),
    ("TM", "Timis"),
    ("TL", "Tulcea"),
    ("VS", "Vaslui"),
    ("VL", "Valcea"),
    ("VN", "Vrancea"),
];

/// County code of the capital city.
pub const CAPITAL_COUNTY_CODE: &str = "B";

/// Name of the capital city as it appears in locker county fields.
pub const CAPITAL_NAME: &str = "Bucuresti";

/// Normalize text for comparison: trim, lowercase, strip Romanian diacritics.
#[must_use]
pub fn fold(text: &str) -> String {
    text.trim()
        .chars()
        .filter_map(|c| match c {
            'ă' | 'â' | 'Ă' | 'Â' => Some('a'),
            'î' | 'Î' => Some('i'),
            'ș' | 'ş' | 'Ș' | 'Ş' => Some('s'),
            'ț' | 'ţ' | 'Ț' | 'Ţ' => Some('t'),
            c if c.is_alphanumeric() || c == ' ' || c == '-' => c.to_lowercase().next(),
            _ => None,
        })
        .collect()
}

/// A postal address. Two independent instances exist per checkout - billing
/// and shipping - with shipping optionally mirroring billing.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub county: String,
    pub locality: String,
    pub commune: Option<String>,
    pub address1: String,
    pub address2: String,
    pub postcode: String,
    pub country: String,
}

impl Address {
    /// Change the county, clearing every downstream field so stale
    /// county/locality combinations cannot survive.
    pub fn set_county(&mut self, county: impl Into<String>) {
        self.county = county.into();
        self.locality.clear();
        self.clear_downstream_of_locality();
    }

    /// Change the locality, clearing commune and address lines.
    pub fn set_locality(&mut self, locality: impl Into<String>) {
        self.locality = locality.into();
        self.clear_downstream_of_locality();
    }

    fn clear_downstream_of_locality(&mut self) {
        self.commune = None;
        self.address1.clear();
        self.address2.clear();
        self.postcode.clear();
    }
}

/// A pure projection of the billing address onto the shipping address.
///
/// While `use_different_shipping` is false the shipping address is recomputed
/// with this on every billing change - including the commune - instead of
/// being copied field-by-field at the call sites, so the two can never drift.
#[must_use]
pub fn mirror_billing(billing: &Address) -> Address {
    billing.clone()
}

/// One row of the reference locality dataset.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalityRow {
    #[serde(rename = "Judet")]
    pub county: String,
    #[serde(rename = "Localitate")]
    pub locality: String,
    #[serde(rename = "Comuna", default)]
    pub commune: String,
    #[serde(rename = "Km aditionali", default)]
    pub extra_km_surcharge: rust_decimal::Decimal,
}

/// Resolves raw county/locality/commune text against the reference dataset.
#[derive(Debug, Clone, Default)]
pub struct AddressResolver {
    rows: Vec<LocalityRow>,
}

impl AddressResolver {
    /// Build a resolver over already-parsed dataset rows.
    #[must_use]
    pub const fn new(rows: Vec<LocalityRow>) -> Self {
        Self { rows }
    }

    /// Parse the static locality dataset JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error when the JSON does not match the
    /// expected row shape.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// The county code for a raw county name, diacritics- and
    /// case-insensitive. `None` when the name matches no county.
    #[must_use]
    pub fn county_code_for(name: &str) -> Option<&'static str> {
        let needle = fold(name);
        COUNTIES
            .iter()
            .find(|(code, county)| fold(county) == needle || fold(code) == needle)
            .map(|(code, _)| *code)
    }

    /// The canonical county name for a code.
    #[must_use]
    pub fn county_name_for(code: &str) -> Option<&'static str> {
        let needle = fold(code);
        COUNTIES
            .iter()
            .find(|(c, _)| fold(c) == needle)
            .map(|(_, name)| *name)
    }

    /// All localities of a county, deduplicated and locale-sorted.
    #[must_use]
    pub fn localities_for(&self, county_code: &str) -> Vec<String> {
        let Some(county) = Self::county_name_for(county_code) else {
            return Vec::new();
        };
        let county_key = fold(county);

        let mut seen = std::collections::HashSet::new();
        let mut localities: Vec<String> = self
            .rows
            .iter()
            .filter(|row| fold(&row.county) == county_key)
            .filter(|row| seen.insert(fold(&row.locality)))
            .map(|row| row.locality.clone())
            .collect();
        localities.sort_by_key(|l| fold(l));
        localities
    }

    /// The communes refining a locality, deduplicated, excluding the commune
    /// when it textually equals the locality itself.
    #[must_use]
    pub fn communes_for(&self, county_code: &str, locality: &str) -> Vec<String> {
        let Some(county) = Self::county_name_for(county_code) else {
            return Vec::new();
        };
        let county_key = fold(county);
        let locality_key = fold(locality);

        let mut seen = std::collections::HashSet::new();
        let mut communes: Vec<String> = self
            .rows
            .iter()
            .filter(|row| fold(&row.county) == county_key && fold(&row.locality) == locality_key)
            .filter(|row| !row.commune.trim().is_empty() && fold(&row.commune) != locality_key)
            .filter(|row| seen.insert(fold(&row.commune)))
            .map(|row| row.commune.clone())
            .collect();
        communes.sort_by_key(|c| fold(c));
        communes
    }

    /// A commune list with exactly one entry is auto-selected.
    #[must_use]
    pub fn auto_selected_commune(communes: &[String]) -> Option<&String> {
        match communes {
            [only] => Some(only),
            _ => None,
        }
    }

    /// The additional-kilometre fee for a locality: first matching row,
    /// refined by commune when one is supplied, zero when nothing matches.
    #[must_use]
    pub fn surcharge_for(
        &self,
        county_code: &str,
        locality: &str,
        commune: Option<&str>,
    ) -> Money {
        let Some(county) = Self::county_name_for(county_code) else {
            return Money::ZERO;
        };
        let county_key = fold(county);
        let locality_key = fold(locality);
        let commune_key = commune.map(fold);

        self.rows
            .iter()
            .filter(|row| fold(&row.county) == county_key && fold(&row.locality) == locality_key)
            .find(|row| match &commune_key {
                Some(key) => &fold(&row.commune) == key,
                None => true,
            })
            .map_or(Money::ZERO, |row| Money::new(row.extra_km_surcharge))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn resolver() -> AddressResolver {
        AddressResolver::from_json(
            r#"[
            {"Judet": "Cluj", "Localitate": "Cluj-Napoca", "Comuna": "", "Km aditionali": 0},
            {"Judet": "Cluj", "Localitate": "Măguri", "Comuna": "Măguri-Răcătău", "Km aditionali": 25},
            {"Judet": "Cluj", "Localitate": "Măguri", "Comuna": "Mărișel", "Km aditionali": 30},
            {"Judet": "Cluj", "Localitate": "Floresti", "Comuna": "Floresti", "Km aditionali": 5},
            {"Judet": "Cluj", "Localitate": "Floresti", "Comuna": ""},
            {"Judet": "Bihor", "Localitate": "Oradea", "Comuna": "", "Km aditionali": 0}
        ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_fold_strips_diacritics_and_case() {
        assert_eq!(fold("  Măguri-Răcătău "), "maguri-racatau");
        assert_eq!(fold("BUCUREŞTI"), "bucuresti");
        assert_eq!(fold("Târgu Mureș"), "targu mures");
    }

    #[test]
    fn test_county_code_for_free_text() {
        assert_eq!(AddressResolver::county_code_for("cluj"), Some("CJ"));
        assert_eq!(AddressResolver::county_code_for("BUCUREȘTI"), Some("B"));
        assert_eq!(AddressResolver::county_code_for("b"), Some("B"));
        assert_eq!(AddressResolver::county_code_for("Atlantis"), None);
    }

    #[test]
    fn test_localities_deduplicated_and_sorted() {
        let localities = resolver().localities_for("CJ");
        assert_eq!(localities, vec!["Cluj-Napoca", "Floresti", "Măguri"]);
    }

    #[test]
    fn test_communes_exclude_locality_equal_commune() {
        let resolver = resolver();
        // "Floresti" commune equals the locality, so it is dropped.
        assert!(resolver.communes_for("CJ", "Floresti").is_empty());

        let communes = resolver.communes_for("CJ", "Măguri");
        assert_eq!(communes, vec!["Măguri-Răcătău", "Mărișel"]);
    }

    #[test]
    fn test_auto_selected_commune_only_for_single_entry() {
        let one = vec!["Singura".to_owned()];
        assert_eq!(
            AddressResolver::auto_selected_commune(&one),
            Some(&"Singura".to_owned())
        );
        let two = vec!["A".to_owned(), "B".to_owned()];
        assert_eq!(AddressResolver::auto_selected_commune(&two), None);
        assert_eq!(AddressResolver::auto_selected_commune(&[]), None);
    }

    #[test]
    fn test_surcharge_first_match_and_commune_refinement() {
        let resolver = resolver();
        assert_eq!(
            resolver.surcharge_for("CJ", "Maguri", None),
            Money::new(dec!(25))
        );
        assert_eq!(
            resolver.surcharge_for("CJ", "Maguri", Some("Marisel")),
            Money::new(dec!(30))
        );
        assert_eq!(resolver.surcharge_for("CJ", "Cluj-Napoca", None), Money::ZERO);
        assert_eq!(resolver.surcharge_for("CJ", "Nicaieri", None), Money::ZERO);
    }

    #[test]
    fn test_set_county_clears_downstream() {
        let mut address = Address {
            county: "Cluj".into(),
            locality: "Cluj-Napoca".into(),
            commune: Some("X".into()),
            address1: "Str. Lunga 1".into(),
            address2: "ap. 3".into(),
            postcode: "400001".into(),
            country: "Romania".into(),
        };
        address.set_county("Bihor");
        assert_eq!(address.county, "Bihor");
        assert!(address.locality.is_empty());
        assert!(address.commune.is_none());
        assert!(address.address1.is_empty());
        assert!(address.postcode.is_empty());
        assert_eq!(address.country, "Romania");
    }

    #[test]
    fn test_mirror_is_verbatim() {
        let billing = Address {
            county: "Cluj".into(),
            locality: "Măguri".into(),
            commune: Some("Mărișel".into()),
            address1: "Str. Lunga 1".into(),
            address2: String::new(),
            postcode: "400001".into(),
            country: "Romania".into(),
        };
        assert_eq!(mirror_billing(&billing), billing);
    }
}
