//! Tunables for servers and clients.

use dynrpc::DEFAULT_MAX_FRAME_BYTES;
use dynrpc::LengthPolicy;
use dynrpc::Policy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// Largest envelope a connection worker will buffer.
    pub max_frame_bytes: usize,
    /// How fixed-length parameters treat arguments of the wrong length.
    pub fixed_len: LengthPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_frame_bytes: DEFAULT_MAX_FRAME_BYTES, fixed_len: LengthPolicy::Lenient }
    }
}

impl ServerConfig {
    pub fn policy(&self) -> Policy {
        Policy { fixed_len: self.fixed_len }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Largest reply the client will buffer.
    pub max_frame_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { max_frame_bytes: DEFAULT_MAX_FRAME_BYTES }
    }
}
