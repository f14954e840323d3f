//! Idle connection pool for the pooled engine

use super::transport::{Connection, Target};
use crate::config::ConnectionPoolTuning;
use parking_lot::Mutex;
use std::time::Instant;

struct Idle {
    target: Target,
    conn: Connection,
    since: Instant,
}

/// Keep-alive connections waiting for their next request
///
/// Bounded by `max_idle_connections` across all targets; the oldest idle
/// connection is dropped first. Connections idle for longer than
/// `keep_alive` are never handed out.
pub struct ConnectionPool {
    tuning: ConnectionPoolTuning,
    idle: Mutex<Vec<Idle>>,
}

impl ConnectionPool {
    pub fn new(tuning: ConnectionPoolTuning) -> Self {
        ConnectionPool {
            tuning,
            idle: Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.tuning.max_idle_connections > 0
    }

    /// Take the most recently used idle connection for `target`
    pub fn checkout(&self, target: &Target) -> Option<Connection> {
        let mut idle = self.idle.lock();
        self.evict_expired(&mut idle);

        let pos = idle.iter().rposition(|i| &i.target == target)?;
        Some(idle.remove(pos).conn)
    }

    /// Return a connection after a complete exchange
    pub fn checkin(&self, target: Target, conn: Connection) {
        if !self.is_enabled() {
            return;
        }

        let mut idle = self.idle.lock();
        self.evict_expired(&mut idle);
        idle.push(Idle {
            target,
            conn,
            since: Instant::now(),
        });

        let excess = idle.len().saturating_sub(self.tuning.max_idle_connections);
        idle.drain(..excess);
    }

    pub fn idle_count(&self) -> usize {
        let mut idle = self.idle.lock();
        self.evict_expired(&mut idle);
        idle.len()
    }

    fn evict_expired(&self, idle: &mut Vec<Idle>) {
        let keep_alive = self.tuning.keep_alive;
        idle.retain(|i| i.since.elapsed() < keep_alive);
    }
}
