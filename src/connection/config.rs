use crate::core::{AdapterError, Result};
use scylla::statement::Consistency;
use std::collections::HashMap;
use std::fmt;

/// Property names recognized in the harness's configuration map.
pub const HOSTS_PROPERTY: &str = "hosts";
pub const PORT_PROPERTY: &str = "port";
pub const KEYSPACE_PROPERTY: &str = "cassandra.keyspace";
pub const USERNAME_PROPERTY: &str = "cassandra.username";
pub const PASSWORD_PROPERTY: &str = "cassandra.password";
pub const DATACENTER_PROPERTY: &str = "datacenter";
pub const READ_CONSISTENCY_PROPERTY: &str = "cassandra.readconsistencylevel";
pub const WRITE_CONSISTENCY_PROPERTY: &str = "cassandra.writeconsistencylevel";
pub const DEBUG_PROPERTY: &str = "debug";
pub const TRACING_PROPERTY: &str = "cassandra.tracing";
pub const USE_SSL_PROPERTY: &str = "cassandra.useSSL";

pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_KEYSPACE: &str = "ycsb";
pub const DEFAULT_CONSISTENCY: Consistency = Consistency::One;

/// Optional cluster credentials.
///
/// The Debug rendering never exposes the password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Adapter connection configuration
///
/// Built either from the harness's property map (`from_properties`) or
/// programmatically through the builder methods.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Cluster contact points, host names only
    pub hosts: Vec<String>,

    /// Connection port, shared by all contact points
    pub port: u16,

    /// Target keyspace
    pub keyspace: String,

    /// Local data-center label used for request routing
    pub datacenter: Option<String>,

    /// Optional credentials
    pub credentials: Option<Credentials>,

    /// Acknowledgement requirement for read statements
    pub read_consistency: Consistency,

    /// Acknowledgement requirement for write statements
    pub write_consistency: Consistency,

    /// Verbose adapter logging
    pub debug: bool,

    /// Per-statement tracing on the cluster side
    pub tracing: bool,

    /// Encrypted transport toggle; recognized but not applied by this
    /// adapter (the clusters it targets terminate TLS elsewhere)
    pub use_ssl: bool,
}

impl AdapterConfig {
    /// Create a configuration for the given contact points with defaults
    /// for everything else.
    pub fn new<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hosts: hosts.into_iter().map(Into::into).collect(),
            port: DEFAULT_PORT,
            keyspace: DEFAULT_KEYSPACE.to_string(),
            datacenter: None,
            credentials: None,
            read_consistency: DEFAULT_CONSISTENCY,
            write_consistency: DEFAULT_CONSISTENCY,
            debug: false,
            tracing: false,
            use_ssl: false,
        }
    }

    /// Set the port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the keyspace
    pub fn keyspace(mut self, keyspace: &str) -> Self {
        self.keyspace = keyspace.to_string();
        self
    }

    /// Set the local data-center label
    pub fn datacenter(mut self, datacenter: &str) -> Self {
        self.datacenter = Some(datacenter.to_string());
        self
    }

    /// Set credentials
    pub fn credentials(mut self, username: &str, password: &str) -> Self {
        self.credentials = Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        });
        self
    }

    /// Set the read consistency level
    pub fn read_consistency(mut self, level: Consistency) -> Self {
        self.read_consistency = level;
        self
    }

    /// Set the write consistency level
    pub fn write_consistency(mut self, level: Consistency) -> Self {
        self.write_consistency = level;
        self
    }

    /// Toggle verbose logging
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Toggle statement tracing
    pub fn tracing(mut self, tracing: bool) -> Self {
        self.tracing = tracing;
        self
    }

    /// Parse the harness's property map.
    ///
    /// `hosts` is the only required property; everything else falls back to
    /// the documented defaults.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let hosts_raw = properties.get(HOSTS_PROPERTY).ok_or_else(|| {
            AdapterError::Configuration(format!(
                "required property '{HOSTS_PROPERTY}' is missing"
            ))
        })?;
        let hosts: Vec<String> = hosts_raw
            .split(',')
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();

        let port = match properties.get(PORT_PROPERTY) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                AdapterError::Configuration(format!("invalid port '{raw}'"))
            })?,
            None => DEFAULT_PORT,
        };

        let keyspace = properties
            .get(KEYSPACE_PROPERTY)
            .cloned()
            .unwrap_or_else(|| DEFAULT_KEYSPACE.to_string());

        let credentials = match (
            properties.get(USERNAME_PROPERTY),
            properties.get(PASSWORD_PROPERTY),
        ) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            (None, None) => None,
            _ => {
                return Err(AdapterError::Configuration(format!(
                    "'{USERNAME_PROPERTY}' and '{PASSWORD_PROPERTY}' must be set together"
                )));
            }
        };

        let read_consistency = match properties.get(READ_CONSISTENCY_PROPERTY) {
            Some(raw) => parse_consistency(raw)?,
            None => DEFAULT_CONSISTENCY,
        };
        let write_consistency = match properties.get(WRITE_CONSISTENCY_PROPERTY) {
            Some(raw) => parse_consistency(raw)?,
            None => DEFAULT_CONSISTENCY,
        };

        let config = Self {
            hosts,
            port,
            keyspace,
            datacenter: properties.get(DATACENTER_PROPERTY).cloned(),
            credentials,
            read_consistency,
            write_consistency,
            debug: bool_property(properties, DEBUG_PROPERTY),
            tracing: bool_property(properties, TRACING_PROPERTY),
            use_ssl: bool_property(properties, USE_SSL_PROPERTY),
        };
        config.validate()?;
        Ok(config)
    }

    /// Contact points as `host:port` pairs for the session builder.
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| format!("{host}:{}", self.port))
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            return Err(AdapterError::Configuration(
                "contact point list is empty".to_string(),
            ));
        }
        if self.keyspace.is_empty() {
            return Err(AdapterError::Configuration(
                "keyspace cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn bool_property(properties: &HashMap<String, String>, name: &str) -> bool {
    properties
        .get(name)
        .is_some_and(|raw| raw.eq_ignore_ascii_case("true"))
}

/// Parse a consistency level from its canonical uppercase name.
pub fn parse_consistency(name: &str) -> Result<Consistency> {
    let level = match name {
        "ANY" => Consistency::Any,
        "ONE" => Consistency::One,
        "TWO" => Consistency::Two,
        "THREE" => Consistency::Three,
        "QUORUM" => Consistency::Quorum,
        "ALL" => Consistency::All,
        "LOCAL_QUORUM" => Consistency::LocalQuorum,
        "EACH_QUORUM" => Consistency::EachQuorum,
        "SERIAL" => Consistency::Serial,
        "LOCAL_SERIAL" => Consistency::LocalSerial,
        "LOCAL_ONE" => Consistency::LocalOne,
        other => {
            return Err(AdapterError::Configuration(format!(
                "unknown consistency level '{other}'"
            )));
        }
    };
    Ok(level)
}
