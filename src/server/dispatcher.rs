//! The readiness-driven event loop.
//!
//! Single-threaded and cooperative: all connection state is owned here and
//! touched only from this loop. Per-connection operations never block; when
//! one would, the connection simply waits for its next readiness event.

use std::io::{self, ErrorKind};
use std::net::Shutdown;
use std::os::fd::AsRawFd;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::server::registry::Registry;
use crate::smtp::machine::{Readiness, Signal};
use crate::smtp::reply::Replies;
use crate::smtp::writer::send_best_effort;

/// Upper bound on one readiness wait. Kept very short so the timeout sweep
/// stays responsive even on an idle server.
const POLL_TIMEOUT: Duration = Duration::from_millis(1);

/// Owns the poll instance, the listening socket and the connection registry,
/// and runs the event loop until shutdown.
pub struct Dispatcher {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    listener_token: Token,
    registry: Registry,
    replies: Replies,
    shutdown: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Registers the listener and sizes the event table for the configured
    /// connection limit plus the listener itself.
    pub fn new(
        mut listener: TcpListener,
        cfg: &Config,
        shutdown: Arc<AtomicBool>,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        let listener_token = Token(listener.as_raw_fd() as usize);
        poll.registry()
            .register(&mut listener, listener_token, Interest::READABLE)?;

        Ok(Self {
            poll,
            events: Events::with_capacity(cfg.max_connections + 1),
            listener,
            listener_token,
            registry: Registry::new(cfg.max_connections),
            replies: Replies::new(&cfg.hostname),
            shutdown,
        })
    }

    /// Runs until the shutdown flag is observed between batches, then drains
    /// every remaining connection with a 421 notice.
    ///
    /// Poll errors other than benign interruption abort the loop; every
    /// per-connection error stays contained to its connection.
    pub fn run(&mut self) -> io::Result<()> {
        while !self.shutdown.load(Ordering::Relaxed) {
            if let Err(e) = self.poll.poll(&mut self.events, Some(POLL_TIMEOUT)) {
                if e.kind() == ErrorKind::Interrupted {
                    continue;
                }
                return Err(e);
            }

            for event in self.events.iter() {
                let token = event.token();
                if token == self.listener_token {
                    accept_pending(&self.poll, &mut self.registry, &mut self.listener);
                } else if event.is_error() || (event.is_read_closed() && event.is_write_closed()) {
                    close(&self.poll, &mut self.registry, token, None);
                } else {
                    let ready = Readiness {
                        can_read: event.is_readable(),
                        can_write: event.is_writable(),
                    };
                    let now = Instant::now();
                    let signal = match self.registry.get_mut(token) {
                        Some(conn) => conn.ready(ready, now, &self.replies),
                        None => continue,
                    };
                    if signal == Signal::Close {
                        // any final reply was already queued and sent by the
                        // machine itself
                        close(&self.poll, &mut self.registry, token, None);
                    }
                }
            }

            if !self.shutdown.load(Ordering::Relaxed) {
                let now = Instant::now();
                for token in self.registry.sweep_expired(now) {
                    debug!("closing timed-out connection");
                    close(&self.poll, &mut self.registry, token, Some(&self.replies.timeout));
                }
            }
        }

        info!("Shutdown requested, draining {} connections", self.registry.len());
        for token in self.registry.tokens() {
            close(&self.poll, &mut self.registry, token, Some(&self.replies.unavailable));
        }
        Ok(())
    }
}

/// Drains the accept queue until it would block.
///
/// The listener registration is edge-triggered, so stopping short of the
/// would-block point could strand queued connections. Each failure affects
/// only the connection being accepted; the listener keeps running.
fn accept_pending(poll: &Poll, registry: &mut Registry, listener: &mut TcpListener) {
    loop {
        match listener.accept() {
            Ok((mut stream, peer)) => {
                if registry.is_full() {
                    debug!("rejecting connection from {}: registry full", peer);
                    let _ = stream.shutdown(Shutdown::Both);
                    continue;
                }
                let token = Token(stream.as_raw_fd() as usize);
                if let Err(e) = poll.registry().register(
                    &mut stream,
                    token,
                    Interest::READABLE | Interest::WRITABLE,
                ) {
                    warn!("failed to register connection from {}: {}", peer, e);
                    continue;
                }
                match registry.admit(stream, token, Instant::now()) {
                    Ok(_) => debug!("accepted connection from {}", peer),
                    Err(e) => debug!("rejecting connection from {}: {}", peer, e),
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!("accept failed: {}", e);
                break;
            }
        }
    }
}

/// Closes one connection in order: best-effort final notice, deregistration
/// from the poll, orderly transport shutdown, then slot release.
fn close(poll: &Poll, registry: &mut Registry, token: Token, notice: Option<&Bytes>) {
    let Some(conn) = registry.get_mut(token) else {
        return;
    };
    if let Some(payload) = notice {
        send_best_effort(conn.stream_mut(), payload);
    }
    if let Err(e) = poll.registry().deregister(conn.stream_mut()) {
        debug!("failed to deregister connection: {}", e);
    }
    let _ = conn.stream_mut().shutdown(Shutdown::Both);
    registry.remove(token);
    debug!("closed connection");
}
