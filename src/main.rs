//! Smoke runner for the shopping-cart CQL adapter.
//!
//! Drives one pass of insert, read, scan, update and delete against a live
//! cluster and prints the status of each verb. Useful for checking a
//! cluster and schema before pointing the full benchmark harness at it.

use anyhow::Context;
use cartbench_cql::connection::config;
use cartbench_cql::{BenchmarkAdapter, CartBenchClient, RecordBlob, SessionManager};
use clap::Parser;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "cartbench", about = "Smoke-run the shopping-cart CQL adapter")]
struct Args {
    /// Comma-separated contact points
    #[arg(long, default_value = "127.0.0.1")]
    hosts: String,

    /// Connection port
    #[arg(long, default_value_t = 9042)]
    port: u16,

    /// Target keyspace
    #[arg(long, default_value = "ycsb")]
    keyspace: String,

    /// Local data-center label
    #[arg(long)]
    datacenter: Option<String>,

    /// Username, paired with --password
    #[arg(long)]
    username: Option<String>,

    /// Password, paired with --username
    #[arg(long)]
    password: Option<String>,

    /// Read consistency level (uppercase name, e.g. ONE or LOCAL_QUORUM)
    #[arg(long)]
    read_consistency: Option<String>,

    /// Write consistency level (uppercase name, e.g. ONE or LOCAL_QUORUM)
    #[arg(long)]
    write_consistency: Option<String>,

    /// Record key used for the smoke pass
    #[arg(long, default_value = "user1")]
    key: String,

    /// Enable statement tracing on the cluster side
    #[arg(long)]
    tracing: bool,

    /// Enable verbose adapter logging
    #[arg(long)]
    debug: bool,
}

impl Args {
    fn properties(&self) -> HashMap<String, String> {
        let mut properties = HashMap::new();
        properties.insert(config::HOSTS_PROPERTY.to_string(), self.hosts.clone());
        properties.insert(config::PORT_PROPERTY.to_string(), self.port.to_string());
        properties.insert(config::KEYSPACE_PROPERTY.to_string(), self.keyspace.clone());
        if let Some(datacenter) = &self.datacenter {
            properties.insert(config::DATACENTER_PROPERTY.to_string(), datacenter.clone());
        }
        if let Some(username) = &self.username {
            properties.insert(config::USERNAME_PROPERTY.to_string(), username.clone());
        }
        if let Some(password) = &self.password {
            properties.insert(config::PASSWORD_PROPERTY.to_string(), password.clone());
        }
        if let Some(level) = &self.read_consistency {
            properties.insert(config::READ_CONSISTENCY_PROPERTY.to_string(), level.clone());
        }
        if let Some(level) = &self.write_consistency {
            properties.insert(config::WRITE_CONSISTENCY_PROPERTY.to_string(), level.clone());
        }
        if self.tracing {
            properties.insert(config::TRACING_PROPERTY.to_string(), "true".to_string());
        }
        if self.debug {
            properties.insert(config::DEBUG_PROPERTY.to_string(), "true".to_string());
        }
        properties
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let manager = Arc::new(SessionManager::new());
    let mut client = CartBenchClient::new(args.properties(), manager);
    client
        .init()
        .await
        .context("adapter initialization failed")?;

    let key = args.key.as_str();
    let table = "shoppingcart";

    let status = client.insert(table, key, &RecordBlob::new()).await;
    println!("insert {key}: {status}");

    let mut record = RecordBlob::new();
    let status = client.read(table, key, None, &mut record).await;
    println!("read {key}: {status}");
    if let Some(blob) = record.get(key) {
        println!("  payload: {}", String::from_utf8_lossy(blob));
    }

    let mut records = Vec::new();
    let status = client.scan(table, key, 1, None, &mut records).await;
    println!("scan: {status} ({} record(s))", records.len());

    let status = client.update(table, key, &RecordBlob::new()).await;
    println!("update {key}: {status}");

    let status = client.delete(table, key).await;
    println!("delete {key}: {status}");

    let mut record = RecordBlob::new();
    let status = client.read(table, key, None, &mut record).await;
    println!("read after delete {key}: {status}");

    client.cleanup().await.context("adapter cleanup failed")?;
    Ok(())
}
