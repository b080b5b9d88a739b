//! CQL statement templates and prepared-statement caches for the
//! `shoppingcart` table.
//!
//! Statements come in two kinds: four families parameterized by the set of
//! requested non-key fields (point read, token-range scan, insert, update),
//! and a fixed table of named singletons (full-record read and scan, point
//! delete, and the two canned search-index queries). Field sets are
//! canonicalized into sorted, deduplicated form so that equal sets always
//! hit the same cache entry.

use crate::model::ShoppingCart;
use scylla::statement::Consistency;
use scylla::statement::prepared_statement::PreparedStatement;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

pub const TABLE: &str = "shoppingcart";
pub const KEY_COLUMN: &str = "id";

/// Operation names for the singleton statement table.
pub const READ_ALL: &str = "read-all";
pub const SCAN_ALL: &str = "scan-all";
pub const DELETE: &str = "delete";
pub const FIND_OPEN_DRAFTS: &str = "find-open-drafts";
pub const FIND_BY_ACTIVITY_WINDOW: &str = "find-by-activity-window";

/// The four field-set-parameterized statement families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Read,
    Scan,
    Insert,
    Update,
}

impl Family {
    pub fn is_read(self) -> bool {
        matches!(self, Family::Read | Family::Scan)
    }

    /// Render the CQL template for this family over the given field set.
    pub fn cql(self, keyspace: &str, fields: &BTreeSet<String>) -> String {
        match self {
            Family::Read => read_cql(keyspace, fields),
            Family::Scan => scan_cql(keyspace, fields),
            Family::Insert => insert_cql(keyspace, fields),
            Family::Update => update_cql(keyspace, fields),
        }
    }
}

/// Canonical, order-independent encoding of a requested field set.
pub fn field_key<I, S>(fields: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

/// Requested fields in generation order: sorted, with the key column
/// filtered out (the key is always bound through its dedicated position).
pub fn ordered_fields(fields: &BTreeSet<String>) -> impl Iterator<Item = &String> {
    fields.iter().filter(|f| f.as_str() != KEY_COLUMN)
}

fn selection(fields: &BTreeSet<String>) -> String {
    let mut columns = vec![KEY_COLUMN.to_string()];
    columns.extend(ordered_fields(fields).cloned());
    columns.join(", ")
}

fn all_columns() -> String {
    ShoppingCart::COLUMNS.join(", ")
}

pub fn read_cql(keyspace: &str, fields: &BTreeSet<String>) -> String {
    format!(
        "SELECT {} FROM {keyspace}.{TABLE} WHERE {KEY_COLUMN} = ?",
        selection(fields)
    )
}

pub fn scan_cql(keyspace: &str, fields: &BTreeSet<String>) -> String {
    format!(
        "SELECT {} FROM {keyspace}.{TABLE} WHERE token({KEY_COLUMN}) >= token(?) LIMIT ?",
        selection(fields)
    )
}

pub fn insert_cql(keyspace: &str, fields: &BTreeSet<String>) -> String {
    let columns = selection(fields);
    let placeholders = std::iter::repeat("?")
        .take(1 + ordered_fields(fields).count())
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {keyspace}.{TABLE} ({columns}) VALUES ({placeholders})")
}

pub fn update_cql(keyspace: &str, fields: &BTreeSet<String>) -> String {
    let assignments = ordered_fields(fields)
        .map(|f| format!("{f} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("UPDATE {keyspace}.{TABLE} SET {assignments} WHERE {KEY_COLUMN} = ?")
}

pub fn read_all_cql(keyspace: &str) -> String {
    format!(
        "SELECT {} FROM {keyspace}.{TABLE} WHERE {KEY_COLUMN} = ?",
        all_columns()
    )
}

pub fn scan_all_cql(keyspace: &str) -> String {
    format!(
        "SELECT {} FROM {keyspace}.{TABLE} WHERE token({KEY_COLUMN}) >= token(?) LIMIT ?",
        all_columns()
    )
}

pub fn delete_cql(keyspace: &str) -> String {
    format!("DELETE FROM {keyspace}.{TABLE} WHERE {KEY_COLUMN} = ?")
}

/// Canned demonstration query: open draft carts, capped to one row.
///
/// The `expr(sc_index, ...)` filter is served by the cluster-side search
/// index and must stay literal, including the one-row cap.
pub fn open_drafts_cql(keyspace: &str) -> String {
    format!(
        "SELECT {} FROM {keyspace}.{TABLE} WHERE expr(sc_index, \
         '{{filter: {{type: \"match\", field: \"state\", value: \"OPEN.DRAFT\"}}}}') LIMIT 1",
        all_columns()
    )
}

/// Canned demonstration query: open draft carts inside fixed modification
/// and expiry windows, capped to one row. The date bounds are intentionally
/// frozen; this is a demonstration filter, not a general scan.
pub fn activity_window_cql(keyspace: &str) -> String {
    format!(
        "SELECT {} FROM {keyspace}.{TABLE} WHERE expr(sc_index, '{{filter: \
         [{{type: \"range\", field: \"modificationdate\", lower: \"2019-08-18 10:10:10\", upper: \"2019-08-28 10:10:10\"}},\
         {{type: \"range\", field: \"expirydate\", lower: \"2019-08-20 10:10:10\", upper: \"2019-08-31 10:10:10\"}},\
         {{type: \"match\", field: \"state\", value: \"OPEN.DRAFT\"}}]\
         }}') LIMIT 1",
        all_columns()
    )
}

/// One singleton statement template plus its required consistency level.
#[derive(Debug, Clone)]
pub struct StatementDef {
    pub cql: String,
    pub consistency: Consistency,
}

/// Singleton statement templates keyed by operation name, built once when
/// the shared context is created. Reads run at the read level, writes at
/// the write level; nothing in this layer ever downgrades a level on
/// failure.
pub struct StatementTable {
    entries: HashMap<&'static str, StatementDef>,
}

impl StatementTable {
    pub fn new(keyspace: &str, read: Consistency, write: Consistency) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            READ_ALL,
            StatementDef { cql: read_all_cql(keyspace), consistency: read },
        );
        entries.insert(
            SCAN_ALL,
            StatementDef { cql: scan_all_cql(keyspace), consistency: read },
        );
        entries.insert(
            DELETE,
            StatementDef { cql: delete_cql(keyspace), consistency: write },
        );
        entries.insert(
            FIND_OPEN_DRAFTS,
            StatementDef { cql: open_drafts_cql(keyspace), consistency: read },
        );
        entries.insert(
            FIND_BY_ACTIVITY_WINDOW,
            StatementDef { cql: activity_window_cql(keyspace), consistency: read },
        );
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&StatementDef> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }
}

type FamilyCache = RwLock<HashMap<BTreeSet<String>, Arc<PreparedStatement>>>;

/// Concurrent caches of prepared statements, living as long as the shared
/// session. First use per shape prepares and stores; concurrent first uses
/// may prepare twice, which wastes one round trip and nothing else.
pub struct StatementCache {
    read: FamilyCache,
    scan: FamilyCache,
    insert: FamilyCache,
    update: FamilyCache,
    singletons: RwLock<HashMap<&'static str, Arc<PreparedStatement>>>,
}

impl StatementCache {
    pub fn new() -> Self {
        Self {
            read: RwLock::new(HashMap::new()),
            scan: RwLock::new(HashMap::new()),
            insert: RwLock::new(HashMap::new()),
            update: RwLock::new(HashMap::new()),
            singletons: RwLock::new(HashMap::new()),
        }
    }

    fn family(&self, family: Family) -> &FamilyCache {
        match family {
            Family::Read => &self.read,
            Family::Scan => &self.scan,
            Family::Insert => &self.insert,
            Family::Update => &self.update,
        }
    }

    pub fn get(&self, family: Family, fields: &BTreeSet<String>) -> Option<Arc<PreparedStatement>> {
        self.family(family)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(fields)
            .cloned()
    }

    pub fn put(&self, family: Family, fields: BTreeSet<String>, statement: Arc<PreparedStatement>) {
        self.family(family)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fields, statement);
    }

    pub fn get_singleton(&self, name: &str) -> Option<Arc<PreparedStatement>> {
        self.singletons
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn put_singleton(&self, name: &'static str, statement: Arc<PreparedStatement>) {
        self.singletons
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, statement);
    }

    /// Empty every cache. Runs only while the shared session is being torn
    /// down, so nothing can be mid-lookup on the other side.
    pub fn clear(&self) {
        for family in [Family::Read, Family::Scan, Family::Insert, Family::Update] {
            self.family(family)
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
        self.singletons
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Default for StatementCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_key_is_order_independent() {
        let a = field_key(["state", "customername"]);
        let b = field_key(["customername", "state"]);
        let c = field_key(["customername", "state", "state"]);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_ordered_fields_sorted_and_key_free() {
        let fields = field_key(["state", "id", "customername"]);
        let ordered: Vec<&String> = ordered_fields(&fields).collect();
        assert_eq!(ordered, ["customername", "state"]);
    }

    #[test]
    fn test_read_cql_shape() {
        let fields = field_key(["state", "customername"]);
        assert_eq!(
            read_cql("ycsb", &fields),
            "SELECT id, customername, state FROM ycsb.shoppingcart WHERE id = ?"
        );
    }

    #[test]
    fn test_scan_cql_shape() {
        let fields = field_key(["state"]);
        assert_eq!(
            scan_cql("ycsb", &fields),
            "SELECT id, state FROM ycsb.shoppingcart WHERE token(id) >= token(?) LIMIT ?"
        );
    }

    #[test]
    fn test_insert_cql_shape() {
        let fields = field_key(["state", "customername"]);
        assert_eq!(
            insert_cql("ycsb", &fields),
            "INSERT INTO ycsb.shoppingcart (id, customername, state) VALUES (?, ?, ?)"
        );
    }

    #[test]
    fn test_update_cql_shape() {
        let fields = field_key(["state", "customername"]);
        assert_eq!(
            update_cql("ycsb", &fields),
            "UPDATE ycsb.shoppingcart SET customername = ?, state = ? WHERE id = ?"
        );
    }

    #[test]
    fn test_full_record_statements_use_canonical_column_order() {
        assert_eq!(
            read_all_cql("ycsb"),
            "SELECT id, state, modificationdate, expirydate, customername \
             FROM ycsb.shoppingcart WHERE id = ?"
        );
        assert_eq!(
            delete_cql("ycsb"),
            "DELETE FROM ycsb.shoppingcart WHERE id = ?"
        );
    }

    #[test]
    fn test_canned_queries_keep_literal_filters_and_cap() {
        let drafts = open_drafts_cql("ycsb");
        assert!(drafts.contains("expr(sc_index,"));
        assert!(drafts.contains("{type: \"match\", field: \"state\", value: \"OPEN.DRAFT\"}"));
        assert!(drafts.ends_with("LIMIT 1"));

        let window = activity_window_cql("ycsb");
        assert!(window.contains(
            "{type: \"range\", field: \"modificationdate\", \
             lower: \"2019-08-18 10:10:10\", upper: \"2019-08-28 10:10:10\"}"
        ));
        assert!(window.contains(
            "{type: \"range\", field: \"expirydate\", \
             lower: \"2019-08-20 10:10:10\", upper: \"2019-08-31 10:10:10\"}"
        ));
        assert!(window.contains("{type: \"match\", field: \"state\", value: \"OPEN.DRAFT\"}"));
        assert!(window.ends_with("LIMIT 1"));
    }

    #[test]
    fn test_statement_table_consistency_split() {
        let table = StatementTable::new("ycsb", Consistency::LocalQuorum, Consistency::Two);
        assert_eq!(table.get(READ_ALL).unwrap().consistency, Consistency::LocalQuorum);
        assert_eq!(table.get(SCAN_ALL).unwrap().consistency, Consistency::LocalQuorum);
        assert_eq!(
            table.get(FIND_OPEN_DRAFTS).unwrap().consistency,
            Consistency::LocalQuorum
        );
        assert_eq!(
            table.get(FIND_BY_ACTIVITY_WINDOW).unwrap().consistency,
            Consistency::LocalQuorum
        );
        assert_eq!(table.get(DELETE).unwrap().consistency, Consistency::Two);
        assert_eq!(table.names().count(), 5);
        assert!(table.get("truncate").is_none());
    }
}
