//! Redis-backed snapshot source.
//!
//! Each fetch opens a fresh TCP connection, optionally authenticates and
//! selects a database, issues one `GET` for the snapshot key and closes the
//! connection. Nothing is kept between fetches and nothing is retried.

pub mod resp;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use ciq_core::RetrievalError;
use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::cache::SnapshotSource;
use resp::RespValue;

/// Key the scanner writes the inventory under.
pub const DEFAULT_SNAPSHOT_KEY: &str = "Stock";

/// Connection settings for the snapshot store.
pub struct RedisConfig {
    /// `host:port`
    pub address: String,
    pub password: Option<SecretString>,
    pub database: u32,
    pub key: String,
    /// Applies to connect and to each command round trip.
    pub io_timeout: Duration,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:6379".to_string(),
            password: None,
            database: 0,
            key: DEFAULT_SNAPSHOT_KEY.to_string(),
            io_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Self::default()
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::new(password.into().into()));
        self
    }

    pub fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }
}

impl fmt::Debug for RedisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisConfig")
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("database", &self.database)
            .field("key", &self.key)
            .field("io_timeout", &self.io_timeout)
            .finish()
    }
}

/// Fetches the inventory blob from Redis over RESP2.
#[derive(Debug)]
pub struct RedisSnapshotClient {
    config: RedisConfig,
}

impl RedisSnapshotClient {
    pub fn new(config: RedisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    async fn connect(&self) -> Result<Connection, RetrievalError> {
        let address = &self.config.address;
        let connect = TcpStream::connect(address.as_str());
        let stream = match tokio::time::timeout(self.config.io_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(RetrievalError::Connect {
                    address: address.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RetrievalError::Connect {
                    address: address.clone(),
                    reason: format!("no connection within {:?}", self.config.io_timeout),
                })
            }
        };
        // Best effort; the fetch works either way.
        let _ = stream.set_nodelay(true);

        Ok(Connection {
            stream,
            buffer: BytesMut::with_capacity(8 * 1024),
            io_timeout: self.config.io_timeout,
        })
    }
}

#[async_trait]
impl SnapshotSource for RedisSnapshotClient {
    async fn fetch_snapshot(&self) -> Result<Bytes, RetrievalError> {
        let mut conn = self.connect().await?;

        if let Some(password) = &self.config.password {
            if let RespValue::Error(message) = conn
                .command(&[b"AUTH", password.expose_secret().as_bytes()])
                .await?
            {
                return Err(RetrievalError::Auth { reason: message });
            }
        }

        if self.config.database != 0 {
            let database = self.config.database.to_string();
            if let RespValue::Error(message) =
                conn.command(&[b"SELECT", database.as_bytes()]).await?
            {
                return Err(RetrievalError::Server { message });
            }
        }

        let reply = conn.command(&[b"GET", self.config.key.as_bytes()]).await?;
        // Dropping the connection closes it; no further round trip.
        drop(conn);

        match reply {
            RespValue::BulkString(Some(payload)) => Ok(payload),
            RespValue::BulkString(None) => Err(RetrievalError::KeyNotFound {
                key: self.config.key.clone(),
            }),
            RespValue::Error(message) => Err(RetrievalError::Server { message }),
            other => Err(RetrievalError::Protocol {
                reason: format!("unexpected {} reply to GET", other.kind()),
            }),
        }
    }

    fn describe(&self) -> String {
        format!(
            "redis://{}/{} key '{}'",
            self.config.address, self.config.database, self.config.key
        )
    }
}

/// One open connection, used for a single fetch.
struct Connection {
    stream: TcpStream,
    buffer: BytesMut,
    io_timeout: Duration,
}

impl Connection {
    /// Send one command and wait for its reply.
    async fn command(&mut self, args: &[&[u8]]) -> Result<RespValue, RetrievalError> {
        let mut out = BytesMut::new();
        resp::encode_command(args, &mut out);

        let io_timeout = self.io_timeout;
        match tokio::time::timeout(io_timeout, self.round_trip(&out)).await {
            Ok(result) => result,
            Err(_) => Err(RetrievalError::Timeout { after: io_timeout }),
        }
    }

    async fn round_trip(&mut self, request: &[u8]) -> Result<RespValue, RetrievalError> {
        self.stream.write_all(request).await?;
        self.read_reply().await
    }

    async fn read_reply(&mut self) -> Result<RespValue, RetrievalError> {
        loop {
            if let Some((value, consumed)) = resp::parse_reply(&self.buffer)? {
                let _ = self.buffer.split_to(consumed);
                return Ok(value);
            }

            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(RetrievalError::Protocol {
                    reason: if self.buffer.is_empty() {
                        "connection closed before reply".to_string()
                    } else {
                        "connection closed mid-reply".to_string()
                    },
                });
            }
        }
    }
}
