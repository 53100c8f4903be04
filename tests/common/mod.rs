//! Shared test infrastructure for async-agentx.
//!
//! Provides [`MockMaster`], an in-process AgentX master agent, plus the
//! OID fixtures the scenario tests run against.

// Allow dead code since not all test files use all utilities
#![allow(dead_code)]

pub mod master;

pub use master::MockMaster;

use async_agentx::{ListHandler, Oid, Value};

/// Subtree every scenario registers under.
pub fn subtree() -> Oid {
    Oid::parse("1.3.6.1.4.1.45995").unwrap()
}

pub fn entry(leaf: u32) -> Oid {
    subtree().child(3).child(leaf)
}

/// The four-entry table the walk scenarios expect.
pub fn populated_handler() -> ListHandler {
    let mut handler = ListHandler::new();
    *handler.add("1.3.6.1.4.1.45995.3.1").unwrap() = Value::octet_string("test");
    *handler.add("1.3.6.1.4.1.45995.3.3").unwrap() = Value::octet_string("test2");
    *handler.add("1.3.6.1.4.1.45995.3.5").unwrap() = Value::octet_string("test5");
    *handler.add("1.3.6.1.4.1.45995.3.7").unwrap() = Value::octet_string("test7");
    handler
}
