use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use scylla::FromRow;
use scylla::cql_to_rust::{FromCqlVal, FromCqlValError};
use scylla::frame::response::result::CqlValue;
use scylla::frame::value::CqlTimestamp;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Lifecycle state of a shopping cart.
///
/// The workload only ever writes these three values; anything else found in
/// the `state` column is treated as a decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartState {
    OpenDraft,
    OpenPresented,
    ClosedSubmitted,
}

impl CartState {
    pub const ALL: [CartState; 3] = [
        CartState::OpenDraft,
        CartState::OpenPresented,
        CartState::ClosedSubmitted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CartState::OpenDraft => "OPEN.DRAFT",
            CartState::OpenPresented => "OPEN.PRESENTED",
            CartState::ClosedSubmitted => "CLOSED.SUBMITTED",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "OPEN.DRAFT" => Some(CartState::OpenDraft),
            "OPEN.PRESENTED" => Some(CartState::OpenPresented),
            "CLOSED.SUBMITTED" => Some(CartState::ClosedSubmitted),
            _ => None,
        }
    }
}

impl fmt::Display for CartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CartState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CartState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        CartState::parse(&text)
            .ok_or_else(|| D::Error::custom(format!("unknown cart state '{text}'")))
    }
}

impl FromCqlVal<CqlValue> for CartState {
    fn from_cql(cql_val: CqlValue) -> Result<Self, FromCqlValError> {
        let text = String::from_cql(cql_val)?;
        CartState::parse(&text).ok_or(FromCqlValError::BadVal)
    }
}

/// The benchmark record, mapped onto the `shoppingcart` table.
///
/// `id` is the partition key and the only column used for point lookups and
/// deletes. Field order matches the column order of every full-record SELECT
/// issued by the data access layer.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ShoppingCart {
    pub id: String,
    pub state: CartState,
    pub modification_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub customer_name: String,
}

impl ShoppingCart {
    /// All columns, in the canonical order used by full-record statements.
    pub const COLUMNS: [&'static str; 5] = [
        "id",
        "state",
        "modificationdate",
        "expirydate",
        "customername",
    ];

    /// Non-key columns.
    pub const REGULAR_COLUMNS: [&'static str; 4] = [
        "state",
        "modificationdate",
        "expirydate",
        "customername",
    ];

    pub fn regular_field_set() -> BTreeSet<String> {
        Self::REGULAR_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    /// Synthesize a replacement record for `key`.
    ///
    /// Insert and update both write a freshly synthesized record and discard
    /// whatever field values the harness supplied; this mirrors the workload
    /// the adapter was built for and is deliberate (see DESIGN.md). Only the
    /// key survives into the written row.
    pub fn synthesize<R: Rng + ?Sized>(key: &str, rng: &mut R) -> Self {
        let now = Utc::now();
        Self {
            id: key.to_string(),
            state: CartState::ALL[rng.gen_range(0..CartState::ALL.len())],
            modification_date: now + Duration::days(rng.gen_range(0..15)),
            expiry_date: now + Duration::days(rng.gen_range(0..30)),
            customer_name: format!("cust002{}", rng.gen_range(0..10_000)),
        }
    }

    /// CQL value for one named column, or `None` for a column outside the
    /// record shape.
    pub fn value_of(&self, field: &str) -> Option<CqlValue> {
        match field {
            "id" => Some(CqlValue::Text(self.id.clone())),
            "state" => Some(CqlValue::Text(self.state.to_string())),
            "modificationdate" => Some(CqlValue::Timestamp(CqlTimestamp(
                self.modification_date.timestamp_millis(),
            ))),
            "expirydate" => Some(CqlValue::Timestamp(CqlTimestamp(
                self.expiry_date.timestamp_millis(),
            ))),
            "customername" => Some(CqlValue::Text(self.customer_name.clone())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_state_roundtrip() {
        for state in CartState::ALL {
            assert_eq!(CartState::parse(state.as_str()), Some(state));
        }
        assert_eq!(CartState::parse("OPEN.UNKNOWN"), None);
        assert_eq!(CartState::parse(""), None);
    }

    #[test]
    fn test_synthesize_key_passes_through() {
        let mut rng = StdRng::seed_from_u64(7);
        let cart = ShoppingCart::synthesize("user42", &mut rng);
        assert_eq!(cart.id, "user42");
    }

    #[test]
    fn test_synthesize_state_always_enumerated() {
        let mut rng = StdRng::seed_from_u64(1);
        for i in 0..1_000 {
            let cart = ShoppingCart::synthesize(&format!("k{i}"), &mut rng);
            assert!(CartState::ALL.contains(&cart.state));
        }
    }

    #[test]
    fn test_synthesize_date_offsets_within_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        let before = Utc::now();
        for i in 0..500 {
            let cart = ShoppingCart::synthesize(&format!("k{i}"), &mut rng);
            let mod_offset = cart.modification_date - before;
            let exp_offset = cart.expiry_date - before;
            assert!(mod_offset >= Duration::zero() && mod_offset < Duration::days(15));
            assert!(exp_offset >= Duration::zero() && exp_offset < Duration::days(30));
        }
    }

    #[test]
    fn test_synthesize_customer_name_shape() {
        let mut rng = StdRng::seed_from_u64(3);
        for i in 0..500 {
            let cart = ShoppingCart::synthesize(&format!("k{i}"), &mut rng);
            let suffix = cart
                .customer_name
                .strip_prefix("cust002")
                .expect("customer name must carry the cust002 prefix");
            let n: u32 = suffix.parse().expect("suffix must be numeric");
            assert!(n < 10_000);
        }
    }

    #[test]
    fn test_synthesize_deterministic_under_fixed_seed() {
        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        let one = ShoppingCart::synthesize("user1", &mut a);
        let two = ShoppingCart::synthesize("user1", &mut b);
        assert_eq!(one.state, two.state);
        assert_eq!(one.customer_name, two.customer_name);
    }

    #[test]
    fn test_json_blob_roundtrip() {
        let mut rng = StdRng::seed_from_u64(4);
        let cart = ShoppingCart::synthesize("user1", &mut rng);
        let blob = serde_json::to_vec(&cart).unwrap();
        let back: ShoppingCart = serde_json::from_slice(&blob).unwrap();
        assert_eq!(back, cart);
    }

    #[test]
    fn test_value_of_unknown_field() {
        let mut rng = StdRng::seed_from_u64(5);
        let cart = ShoppingCart::synthesize("user1", &mut rng);
        assert!(cart.value_of("basket").is_none());
        assert!(cart.value_of("id").is_some());
    }
}
