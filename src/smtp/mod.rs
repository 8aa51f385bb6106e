//! SMTP refusal protocol.
//!
//! This module implements the client-facing half of the bouncer: a
//! per-connection state machine that greets with 554, reads command lines,
//! and answers QUIT and NOOP while refusing everything else.
//!
//! # Connection State Machine
//!
//! Each client connection goes through the following phases:
//!
//! ```text
//!        ┌─────────────┐
//!        │  Greeting   │ ← Send the 554 banner
//!        └──────┬──────┘
//!               │ Banner fully sent
//!               ▼
//!        ┌─────────────┐   QUIT   ┌─────────────┐        ┌──────┐
//!        │  AwaitLine  │────────▶│  QuitReply  │──────▶│ Done │
//!        └──────┬──────┘          └─────────────┘        └──────┘
//!               │ NOOP / empty line / anything else
//!               ▼
//!        ┌──────────────────────────────────────┐
//!        │ NoopReply / SyntaxReply / BadSeqReply│
//!        └──────┬───────────────────────────────┘
//!               │ Reply fully sent
//!               └─▶ back to AwaitLine
//!
//!   Any stream failure ─▶ Failed ─▶ one best-effort 421, then close
//! ```
//!
//! Every phase tolerates partial reads and partial writes at arbitrary
//! points: the machine is driven once per readiness event and drains until
//! the socket would block, as edge-triggered notification requires.

pub mod command;
pub mod machine;
pub mod reader;
pub mod reply;
pub mod writer;

pub use command::Command;
pub use machine::{Driven, Machine, Phase, Readiness, Signal};
pub use reply::Replies;
