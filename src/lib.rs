//! # async-agentx
//!
//! Async AgentX (RFC 2741) subagent library for Rust.
//!
//! A subagent registers regions of the OID namespace with a master SNMP
//! agent over a stream connection; the master forwards Get, GetNext and
//! GetBulk requests falling inside those regions and this library answers
//! them through a [`Handler`].
//!
//! ## Features
//!
//! - Async-first API built on Tokio
//! - Automatic reconnect with Open/Register replay
//! - Request timeouts and structured `tracing` instrumentation
//! - [`ListHandler`], a sorted-table handler for static OID sets
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_agentx::{Client, ListHandler, Value, oid};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<async_agentx::Error>> {
//!     let client = Client::builder("tcp", "127.0.0.1:705")
//!         .timeout(Duration::from_secs(60))
//!         .connect()
//!         .await?;
//!
//!     let mut handler = ListHandler::new();
//!     *handler.add("1.3.6.1.4.1.45995.3.1")? = Value::octet_string("test");
//!
//!     let subtree = oid!(1, 3, 6, 1, 4, 1, 45995);
//!     let session = client
//!         .session(subtree.clone(), "example agent", Some(Arc::new(handler)))
//!         .await?;
//!     session.register(127, subtree).await?;
//!
//!     // Serve until interrupted.
//!     tokio::signal::ctrl_c().await.ok();
//!     session.close().await?;
//!     client.close();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod handler;
pub mod list_handler;
pub mod oid;
pub mod pdu;
pub mod session;
pub mod value;
pub mod varbind;

pub(crate) mod pool;

// Re-exports for convenience
pub use client::{Client, ClientBuilder};
pub use error::{AgentxStatus, DecodeErrorKind, Error, Result};
pub use handler::Handler;
pub use list_handler::ListHandler;
pub use oid::Oid;
pub use pdu::{CloseReason, Frame, Header, Pdu, PduType, SearchRange, Timeout};
pub use session::Session;
pub use value::Value;
pub use varbind::VarBind;
