//! # dynd
//!
//! Demo server and shell client for the dynamic RPC runtime. The library half holds
//! the example `UserService` so the binary and the integration tests share it.

pub mod users;
