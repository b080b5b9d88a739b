pub mod config;
pub mod lifecycle;

use crate::core::{AdapterError, Result};
use crate::dao::statements::{Family, StatementCache, StatementTable};
use config::AdapterConfig;
use lifecycle::SharedResource;
use log::{debug, info, warn};
use scylla::load_balancing::DefaultPolicy;
use scylla::statement::Consistency;
use scylla::statement::prepared_statement::PreparedStatement;
use scylla::transport::ExecutionProfile;
use scylla::{Session, SessionBuilder};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Lifecycle manager for the process-wide CQL context.
///
/// Every worker's adapter instance holds a clone of one shared manager;
/// the first `init` connects, the last `cleanup` disconnects.
pub type SessionManager = SharedResource<CqlContext>;

/// The process-wide connection state: one driver session plus the
/// statement table and prepared-statement caches tied to its lifetime.
pub struct CqlContext {
    session: Session,
    keyspace: String,
    table: StatementTable,
    cache: StatementCache,
    read_consistency: Consistency,
    write_consistency: Consistency,
    tracing: bool,
    debug: bool,
}

impl CqlContext {
    /// Open a session against the configured cluster.
    ///
    /// Contact points come from the configured host list and shared port.
    /// When a data-center label is configured, request routing prefers its
    /// replicas.
    pub async fn connect(config: &AdapterConfig) -> Result<Self> {
        config.validate()?;

        let nodes = config.contact_points();
        info!(
            "connecting to {nodes:?}, keyspace '{}'",
            config.keyspace
        );

        let mut builder = SessionBuilder::new()
            .known_nodes(&nodes)
            .use_keyspace(config.keyspace.as_str(), false);

        if let Some(credentials) = &config.credentials {
            builder = builder.user(
                credentials.username.as_str(),
                credentials.password.as_str(),
            );
        }

        if let Some(datacenter) = &config.datacenter {
            let policy = DefaultPolicy::builder()
                .prefer_datacenter(datacenter.clone())
                .build();
            let profile = ExecutionProfile::builder()
                .load_balancing_policy(policy)
                .build();
            builder = builder.default_execution_profile_handle(profile.into_handle());
        }

        if config.use_ssl {
            // Transport encryption is terminated outside this adapter.
            warn!("'{}' is set but ignored", config::USE_SSL_PROPERTY);
        }

        let session = builder.build().await.map_err(AdapterError::Connection)?;

        Ok(Self {
            session,
            keyspace: config.keyspace.clone(),
            table: StatementTable::new(
                &config.keyspace,
                config.read_consistency,
                config.write_consistency,
            ),
            cache: StatementCache::new(),
            read_consistency: config.read_consistency,
            write_consistency: config.write_consistency,
            tracing: config.tracing,
            debug: config.debug,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }

    pub fn read_consistency(&self) -> Consistency {
        self.read_consistency
    }

    pub fn write_consistency(&self) -> Consistency {
        self.write_consistency
    }

    /// Drop every cached prepared statement. Called once, by the release
    /// that tears the shared session down.
    pub fn clear_statements(&self) {
        debug!("clearing prepared statement caches");
        self.cache.clear();
    }

    /// Prepared statement for one of the named singleton operations.
    pub async fn singleton_statement(
        &self,
        name: &'static str,
    ) -> Result<Arc<PreparedStatement>> {
        if let Some(found) = self.cache.get_singleton(name) {
            return Ok(found);
        }
        let def = self.table.get(name).ok_or_else(|| {
            AdapterError::Configuration(format!("no statement registered under '{name}'"))
        })?;
        let prepared = self.prepare(def.cql.clone(), def.consistency).await?;
        self.cache.put_singleton(name, Arc::clone(&prepared));
        Ok(prepared)
    }

    /// Prepared point-read statement for the given field set.
    pub async fn read_statement(
        &self,
        fields: &BTreeSet<String>,
    ) -> Result<Arc<PreparedStatement>> {
        self.family_statement(Family::Read, fields).await
    }

    /// Prepared token-range scan statement for the given field set.
    pub async fn scan_statement(
        &self,
        fields: &BTreeSet<String>,
    ) -> Result<Arc<PreparedStatement>> {
        self.family_statement(Family::Scan, fields).await
    }

    /// Prepared insert statement for the given field set.
    pub async fn insert_statement(
        &self,
        fields: &BTreeSet<String>,
    ) -> Result<Arc<PreparedStatement>> {
        self.family_statement(Family::Insert, fields).await
    }

    /// Prepared update statement for the given field set.
    pub async fn update_statement(
        &self,
        fields: &BTreeSet<String>,
    ) -> Result<Arc<PreparedStatement>> {
        self.family_statement(Family::Update, fields).await
    }

    /// Look a statement up in its family cache, preparing and caching it on
    /// first use. Two tasks racing on the same shape may both prepare; the
    /// later insert wins and the duplicate is harmless.
    async fn family_statement(
        &self,
        family: Family,
        fields: &BTreeSet<String>,
    ) -> Result<Arc<PreparedStatement>> {
        if let Some(found) = self.cache.get(family, fields) {
            return Ok(found);
        }
        let consistency = if family.is_read() {
            self.read_consistency
        } else {
            self.write_consistency
        };
        let prepared = self
            .prepare(family.cql(&self.keyspace, fields), consistency)
            .await?;
        self.cache.put(family, fields.clone(), Arc::clone(&prepared));
        Ok(prepared)
    }

    async fn prepare(
        &self,
        cql: String,
        consistency: Consistency,
    ) -> Result<Arc<PreparedStatement>> {
        if self.debug {
            debug!("preparing statement: {cql}");
        }
        let mut prepared = self.session.prepare(cql).await?;
        prepared.set_consistency(consistency);
        if self.tracing {
            prepared.set_tracing(true);
        }
        Ok(Arc::new(prepared))
    }

    /// Table of singleton statement templates, for inspection.
    pub fn statement_table(&self) -> &StatementTable {
        &self.table
    }
}
