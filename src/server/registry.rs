//! Bounded store of live connections.

use std::time::{Duration, Instant};

use mio::Token;
use mio::net::TcpStream;
use thiserror::Error;

use crate::smtp::machine::{Machine, Readiness, Signal};
use crate::smtp::reply::Replies;

/// Inactivity timeout, refreshed whenever a read or write makes progress
/// (RFC 5321 §4.5.3.2.7: five minutes).
pub const SOFT_TIMEOUT: Duration = Duration::from_secs(300);

/// Absolute connection lifetime cap, never refreshed. A client that got its
/// 554 has nothing left to wait for.
pub const HARD_TIMEOUT: Duration = Duration::from_secs(900);

/// Returned by [`Registry::admit`] when every slot is taken.
#[derive(Debug, Error)]
#[error("connection registry full ({0} slots)")]
pub struct RegistryFull(pub usize);

/// One live client connection: the transport, its deadlines, and its
/// protocol state. The three are created together at admission and dropped
/// together at close.
#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    token: Token,
    soft_deadline: Instant,
    hard_deadline: Instant,
    machine: Machine,
}

impl Connection {
    fn new(stream: TcpStream, token: Token, now: Instant) -> Self {
        Self {
            stream,
            token,
            soft_deadline: now + SOFT_TIMEOUT,
            hard_deadline: now + HARD_TIMEOUT,
            machine: Machine::new(),
        }
    }

    pub fn token(&self) -> Token {
        self.token
    }

    pub fn soft_deadline(&self) -> Instant {
        self.soft_deadline
    }

    pub fn hard_deadline(&self) -> Instant {
        self.hard_deadline
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    pub fn stream_mut(&mut self) -> &mut TcpStream {
        &mut self.stream
    }

    /// Drives the protocol machine with the granted permissions, refreshing
    /// the idle deadline when any I/O made progress.
    pub fn ready(&mut self, ready: Readiness, now: Instant, replies: &Replies) -> Signal {
        let driven = self.machine.drive(&mut self.stream, ready, replies);
        if driven.progressed {
            self.soft_deadline = now + SOFT_TIMEOUT;
        }
        driven.signal
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.soft_deadline <= now || self.hard_deadline <= now
    }
}

/// Fixed-capacity table of live connections.
///
/// Entries are kept dense: removal swaps the last entry into the vacated
/// slot, so removal is O(1) but any held index is invalidated by it. All
/// cross-references are therefore by token, re-resolved with
/// [`Registry::find`] - a linear scan, which is fine at the bounded scale
/// this server runs at.
#[derive(Debug)]
pub struct Registry {
    connections: Vec<Connection>,
    capacity: usize,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self { connections: Vec::with_capacity(capacity), capacity }
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.connections.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admits a freshly accepted connection in the greeting phase, stamping
    /// both deadlines from `now`.
    pub fn admit(&mut self, stream: TcpStream, token: Token, now: Instant) -> Result<usize, RegistryFull> {
        if self.is_full() {
            return Err(RegistryFull(self.capacity));
        }
        self.connections.push(Connection::new(stream, token, now));
        Ok(self.connections.len() - 1)
    }

    /// Index of the connection with this token, if it is live.
    pub fn find(&self, token: Token) -> Option<usize> {
        self.connections.iter().position(|c| c.token == token)
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Connection> {
        let idx = self.find(token)?;
        Some(&mut self.connections[idx])
    }

    /// Removes and returns the connection with this token.
    ///
    /// The last entry is swapped into the vacated slot; any index held
    /// across this call is stale and must be re-resolved by token.
    pub fn remove(&mut self, token: Token) -> Option<Connection> {
        let idx = self.find(token)?;
        Some(self.connections.swap_remove(idx))
    }

    /// Tokens of every connection whose soft or hard deadline has elapsed,
    /// in reverse admission order so callers can close as they iterate.
    pub fn sweep_expired(&self, now: Instant) -> Vec<Token> {
        self.connections
            .iter()
            .rev()
            .filter(|c| c.is_expired(now))
            .map(|c| c.token)
            .collect()
    }

    /// Tokens of every live connection, in reverse admission order; used by
    /// the shutdown drain.
    pub fn tokens(&self) -> Vec<Token> {
        self.connections.iter().rev().map(|c| c.token).collect()
    }
}
