//! Bouncer - SMTP tarpit daemon
//!
//! A single-threaded, non-blocking SMTP peer that greets every client with
//! 554 and never accepts mail, while staying a well-formed protocol citizen:
//! it parses command lines, answers QUIT and NOOP, and evicts idle or
//! overstaying connections.

pub mod config;
pub mod server;
pub mod smtp;
