//! Connection pool with load-balancing checkout
//!
//! A [`Pool`] supervises a set of shared [`Connection`]s and picks one per
//! [`Pool::checkout`] according to a [`Strategy`]. There is no leasing:
//! `checkin` is a no-op and concurrent callers may drive the same
//! connection freely, because the request tracker is concurrent-safe.
//! Checkout is a pure function of the live set, the strategy, and the
//! shared round-robin counter.
//!
//! Membership is dynamic: connections can be added and removed at runtime,
//! and selection only ever observes connections currently in the `ready`
//! state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::config::PoolConfig;
use crate::connection::{Connection, ConnectionStatus};
use crate::error::{McpError, Result};

/// How [`Pool::checkout`] picks among live connections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Cycle through the live set with a shared atomic counter.
    #[default]
    RoundRobin,
    /// Uniform choice over the live set.
    Random,
    /// The connection with the fewest in-flight requests; ties broken
    /// arbitrarily.
    LeastBusy,
}

/// A supervised set of connections with strategy-based checkout.
///
/// # Examples
///
/// ```no_run
/// use mcpkit::config::{ConnectionConfig, PoolConfig, TransportConfig};
/// use mcpkit::pool::{Pool, Strategy};
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let template = ConnectionConfig::new(TransportConfig::stdio("my-mcp-server"));
/// let pool = Pool::connect(PoolConfig::homogeneous(3, template)).await?;
/// let conn = pool.checkout()?;
/// conn.ping().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Pool {
    connections: RwLock<Vec<Arc<Connection>>>,
    counter: AtomicUsize,
    strategy: Strategy,
}

impl Pool {
    /// Build a pool over already-established connections.
    pub fn new(connections: Vec<Arc<Connection>>, strategy: Strategy) -> Self {
        Self {
            connections: RwLock::new(connections),
            counter: AtomicUsize::new(0),
            strategy,
        }
    }

    /// Establish every member of `config` concurrently and build the pool.
    ///
    /// # Errors
    ///
    /// Returns the first connection failure; an all-or-nothing start keeps
    /// a misconfigured member from silently shrinking the pool.
    pub async fn connect(config: PoolConfig) -> Result<Self> {
        let members = config.members()?;
        let established =
            futures::future::try_join_all(members.into_iter().map(Connection::connect)).await?;
        Ok(Self::new(
            established.into_iter().map(Arc::new).collect(),
            config.strategy,
        ))
    }

    /// Pick a live connection according to the pool's strategy.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::NoConnections`] when no member is currently
    /// `ready`.
    pub fn checkout(&self) -> Result<Arc<Connection>> {
        let live: Vec<Arc<Connection>> = self
            .read()
            .iter()
            .filter(|c| c.status() == ConnectionStatus::Ready)
            .cloned()
            .collect();

        if live.is_empty() {
            return Err(McpError::NoConnections.into());
        }

        let chosen = match self.strategy {
            Strategy::RoundRobin => {
                let index = self.counter.fetch_add(1, Ordering::SeqCst) % live.len();
                Arc::clone(&live[index])
            }
            Strategy::Random => {
                use rand::Rng as _;
                let index = rand::rng().random_range(0..live.len());
                Arc::clone(&live[index])
            }
            Strategy::LeastBusy => live
                .iter()
                .min_by_key(|c| c.pending_count())
                .map(Arc::clone)
                .expect("live set is nonempty"),
        };
        Ok(chosen)
    }

    /// Return a connection to the pool.
    ///
    /// A no-op: the pool does not lease connections exclusively.
    pub fn checkin(&self, _conn: &Arc<Connection>) {}

    /// Check a connection out, run `f` against it, and check it back in on
    /// every exit path.
    pub async fn transaction<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(Arc<Connection>) -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let conn = self.checkout()?;
        let result = f(Arc::clone(&conn)).await;
        self.checkin(&conn);
        result
    }

    /// Add a connection to the pool at runtime.
    pub fn add_connection(&self, conn: Arc<Connection>) {
        self.write().push(conn);
    }

    /// Remove a connection from the pool at runtime.
    ///
    /// Membership is by identity; the connection itself is not
    /// disconnected. Returns whether it was present.
    pub fn remove_connection(&self, conn: &Arc<Connection>) -> bool {
        let mut connections = self.write();
        let before = connections.len();
        connections.retain(|c| !Arc::ptr_eq(c, conn));
        connections.len() != before
    }

    /// Total number of members, live or not.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the pool has no members at all.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of members currently `ready`.
    pub fn live_count(&self) -> usize {
        self.read()
            .iter()
            .filter(|c| c.status() == ConnectionStatus::Ready)
            .count()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<Connection>>> {
        self.connections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<Connection>>> {
        self.connections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
