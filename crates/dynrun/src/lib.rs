//! # DynRun
//!
//! The runtime around the coercion engine: a registry of named services, a
//! dispatcher that turns calls into replies, a TCP server with one worker per
//! connection, and a client.

pub mod client;
pub mod config;
pub mod dispatch;
pub mod handler;
pub mod registry;
pub mod server;


pub use client::Connection;
pub use client::IntoArgs;
pub use client::Outcome;
pub use client::RpcError;
pub use config::ClientConfig;
pub use config::ServerConfig;
pub use dispatch::DispatchError;
pub use dispatch::Dispatcher;
pub use handler::Handler;
pub use registry::HandlerDescriptor;
pub use registry::Registry;
pub use registry::Service;
pub use server::Listener;
pub use server::Server;
pub use server::ServerError;
