use crate::api::{BenchmarkAdapter, FieldSet, RecordBlob};
use crate::connection::config::AdapterConfig;
use crate::connection::{CqlContext, SessionManager};
use crate::core::{AdapterError, Result, Status};
use crate::dao::CartDao;
use crate::model::ShoppingCart;
use async_trait::async_trait;
use log::{debug, error, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

/// Which of the two canned scan queries to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CannedQuery {
    OpenDrafts,
    ActivityWindow,
}

/// Shopping-cart benchmark client.
///
/// One instance per worker. All instances share one session through the
/// [`SessionManager`]: the first `init` connects, the last `cleanup`
/// disconnects, and every operation in between is a single statement
/// against the shared session.
pub struct CartBenchClient {
    properties: HashMap<String, String>,
    manager: Arc<SessionManager>,
    dao: Option<CartDao>,
    rng: StdRng,
    debug: bool,
}

impl CartBenchClient {
    pub fn new(properties: HashMap<String, String>, manager: Arc<SessionManager>) -> Self {
        Self {
            properties,
            manager,
            dao: None,
            rng: StdRng::from_entropy(),
            debug: false,
        }
    }

    /// Like [`new`](Self::new), with a pinned random seed. The seed drives
    /// record synthesis and the scan-side query selection.
    pub fn with_rng_seed(
        properties: HashMap<String, String>,
        manager: Arc<SessionManager>,
        seed: u64,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(properties, manager)
        }
    }

    fn dao(&self) -> Result<&CartDao> {
        self.dao.as_ref().ok_or_else(|| {
            AdapterError::Configuration("adapter has not been initialized".to_string())
        })
    }

    /// Uniform 50/50 pick between the two canned queries. Nothing about
    /// the incoming scan request participates in the choice.
    fn choose_canned_query(&mut self) -> CannedQuery {
        if self.rng.gen_range(0..2) == 1 {
            CannedQuery::OpenDrafts
        } else {
            CannedQuery::ActivityWindow
        }
    }

    async fn try_read(&self, key: &str, result: &mut RecordBlob) -> Result<bool> {
        match self.dao()?.get(key).await? {
            Some(cart) => {
                result.insert(key.to_string(), to_blob(&cart)?);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn try_scan(&self, choice: CannedQuery, result: &mut Vec<RecordBlob>) -> Result<()> {
        let dao = self.dao()?;
        let found = match choice {
            CannedQuery::OpenDrafts => dao.find_open_drafts().await?,
            CannedQuery::ActivityWindow => dao.find_by_activity_window().await?,
        };
        if let Some(cart) = found {
            let mut record = RecordBlob::new();
            record.insert(cart.id.clone(), to_blob(&cart)?);
            result.push(record);
        }
        Ok(())
    }
}

/// The whole record as one opaque byte blob; the harness never sees
/// individual fields on the read path.
fn to_blob(cart: &ShoppingCart) -> Result<Vec<u8>> {
    serde_json::to_vec(cart).map_err(|e| AdapterError::Decode(e.to_string()))
}

#[async_trait]
impl BenchmarkAdapter for CartBenchClient {
    async fn init(&mut self) -> Result<()> {
        let config = AdapterConfig::from_properties(&self.properties)?;
        self.debug = config.debug;
        let ctx = self
            .manager
            .acquire(|| CqlContext::connect(&config))
            .await?;
        self.dao = Some(CartDao::new(ctx));
        info!("adapter instance initialized");
        Ok(())
    }

    async fn cleanup(&mut self) -> Result<()> {
        self.dao = None;
        self.manager
            .release(|ctx| ctx.clear_statements())
            .await
    }

    /// Point lookup. The result map gains a single entry, keyed by the
    /// requested identifier, holding the serialized record. A missing row
    /// reports the generic error status, like any other failure.
    async fn read(
        &mut self,
        _table: &str,
        key: &str,
        _fields: Option<&FieldSet>,
        result: &mut RecordBlob,
    ) -> Status {
        match self.try_read(key, result).await {
            Ok(true) => Status::Ok,
            Ok(false) => {
                debug!("read miss for key '{key}'");
                Status::Error
            }
            Err(err) => {
                error!("read failed for key '{key}': {err}");
                Status::Error
            }
        }
    }

    /// Not a real range scan: the start key, record count and field list
    /// are ignored, and one of the two canned queries is chosen at random.
    /// Whatever single record the chosen query yields is the whole result.
    async fn scan(
        &mut self,
        _table: &str,
        _start_key: &str,
        _record_count: usize,
        _fields: Option<&FieldSet>,
        result: &mut Vec<RecordBlob>,
    ) -> Status {
        let choice = self.choose_canned_query();
        if self.debug {
            debug!("scan routed to {choice:?}");
        }
        match self.try_scan(choice, result).await {
            Ok(()) => Status::Ok,
            Err(err) => {
                error!("scan via {choice:?} failed: {err}");
                Status::Error
            }
        }
    }

    /// Replaces the record under `key` with a freshly synthesized one; the
    /// caller-supplied values are not consulted.
    async fn update(&mut self, _table: &str, key: &str, _values: &RecordBlob) -> Status {
        let cart = ShoppingCart::synthesize(key, &mut self.rng);
        match self.dao() {
            Ok(dao) => match dao.update(&cart).await {
                Ok(()) => Status::Ok,
                Err(err) => {
                    error!("update failed for key '{key}': {err}");
                    Status::Error
                }
            },
            Err(err) => {
                error!("update failed for key '{key}': {err}");
                Status::Error
            }
        }
    }

    /// Inserts a freshly synthesized record under `key`; the
    /// caller-supplied values are not consulted.
    async fn insert(&mut self, _table: &str, key: &str, _values: &RecordBlob) -> Status {
        let cart = ShoppingCart::synthesize(key, &mut self.rng);
        match self.dao() {
            Ok(dao) => match dao.save(&cart).await {
                Ok(()) => Status::Ok,
                Err(err) => {
                    error!("insert failed for key '{key}': {err}");
                    Status::Error
                }
            },
            Err(err) => {
                error!("insert failed for key '{key}': {err}");
                Status::Error
            }
        }
    }

    /// Point delete. Present and absent rows both report success.
    async fn delete(&mut self, _table: &str, key: &str) -> Status {
        match self.dao() {
            Ok(dao) => match dao.delete(key).await {
                Ok(()) => Status::Ok,
                Err(err) => {
                    error!("delete failed for key '{key}': {err}");
                    Status::Error
                }
            },
            Err(err) => {
                error!("delete failed for key '{key}': {err}");
                Status::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::config::HOSTS_PROPERTY;

    fn client_with_seed(seed: u64) -> CartBenchClient {
        let mut properties = HashMap::new();
        properties.insert(HOSTS_PROPERTY.to_string(), "127.0.0.1".to_string());
        CartBenchClient::with_rng_seed(properties, Arc::new(SessionManager::new()), seed)
    }

    #[test]
    fn test_scan_selection_depends_only_on_seed() {
        let mut a = client_with_seed(1234);
        let mut b = client_with_seed(1234);
        let picks_a: Vec<CannedQuery> = (0..64).map(|_| a.choose_canned_query()).collect();
        let picks_b: Vec<CannedQuery> = (0..64).map(|_| b.choose_canned_query()).collect();
        assert_eq!(picks_a, picks_b);
    }

    #[test]
    fn test_scan_selection_covers_both_queries() {
        let mut client = client_with_seed(42);
        let picks: Vec<CannedQuery> = (0..256).map(|_| client.choose_canned_query()).collect();
        assert!(picks.contains(&CannedQuery::OpenDrafts));
        assert!(picks.contains(&CannedQuery::ActivityWindow));
    }

    #[tokio::test]
    async fn test_operations_before_init_report_error() {
        let mut client = client_with_seed(7);
        let mut record = RecordBlob::new();
        let mut records = Vec::new();

        assert!(client.read("shoppingcart", "user1", None, &mut record).await.is_error());
        assert!(
            client
                .scan("shoppingcart", "user1", 10, None, &mut records)
                .await
                .is_error()
        );
        assert!(
            client
                .update("shoppingcart", "user1", &RecordBlob::new())
                .await
                .is_error()
        );
        assert!(
            client
                .insert("shoppingcart", "user1", &RecordBlob::new())
                .await
                .is_error()
        );
        assert!(client.delete("shoppingcart", "user1").await.is_error());
        assert!(record.is_empty());
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_without_init_trips_invariant() {
        let mut client = client_with_seed(7);
        let err = client.cleanup().await.unwrap_err();
        assert!(matches!(err, AdapterError::Invariant(_)));
    }
}
