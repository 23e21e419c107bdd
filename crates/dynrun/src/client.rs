//! # RPC Client
//!
//! A `Connection` sends one `Call` at a time and waits for its `Reply`. Results come
//! back as an `Outcome`, which converts individual values lazily on request.

use dynpack::Value;
use dynrpc::Call;
use dynrpc::CodecError;
use dynrpc::CoercionError;
use dynrpc::FrameReader;
use dynrpc::Policy;
use dynrpc::Shape;
use dynrpc::Shaped;
use dynrpc::Typed;
use dynrpc::coerce;
use dynrpc::encode_call;
use dynrpc::serialize;
use tokio::io::AsyncRead;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::ToSocketAddrs;
use tracing::debug;

use crate::config::ClientConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum RpcError {
    /// The server answered with an error message.
    Remote(String),
    /// The connection failed or the reply could not be read.
    Transport(CodecError),
    /// An argument cannot be represented on the wire; nothing was sent.
    InvalidArgument { index: usize, reason: String },
    /// The reply has fewer results than the index asked for.
    MissingResult(usize),
    /// A result could not be converted to the requested shape.
    Decode(CoercionError),
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(msg) => write!(f, "Remote error: {}", msg),
            Self::Transport(e) => write!(f, "Transport error: {}", e),
            Self::InvalidArgument { index, reason } => {
                write!(f, "Invalid argument {}: {}", index, reason)
            }
            Self::MissingResult(i) => write!(f, "No result at index {}", i),
            Self::Decode(e) => write!(f, "Result decode failed: {}", e),
        }
    }
}

impl std::error::Error for RpcError {}

impl From<CodecError> for RpcError {
    fn from(e: CodecError) -> Self {
        Self::Transport(e)
    }
}

impl From<CoercionError> for RpcError {
    fn from(e: CoercionError) -> Self {
        Self::Decode(e)
    }
}

pub type Result<T> = std::result::Result<T, RpcError>;

/// Converts a `Shaped` value into its wire form.
pub fn to_value<T: Shaped>(value: T) -> Value {
    serialize(&value.into_typed())
}

/// Positional arguments built from `Shaped` values.
pub trait IntoArgs {
    fn into_args(self) -> Vec<Value>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<Value> {
        Vec::new()
    }
}

macro_rules! args_tuple {
    ($($name:ident),+) => {
        impl<$($name: Shaped),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<Value> {
                let ($($name,)+) = self;
                vec![$(to_value($name)),+]
            }
        }
    };
}

args_tuple!(A1);
args_tuple!(A1, A2);
args_tuple!(A1, A2, A3);
args_tuple!(A1, A2, A3, A4);
args_tuple!(A1, A2, A3, A4, A5);
args_tuple!(A1, A2, A3, A4, A5, A6);
args_tuple!(A1, A2, A3, A4, A5, A6, A7);
args_tuple!(A1, A2, A3, A4, A5, A6, A7, A8);

/// One client connection. Calls are sequential: `call` takes `&mut self`.
pub struct Connection<S = TcpStream> {
    frames: FrameReader<S>,
}

impl Connection<TcpStream> {
    /// Opens a TCP connection with the default configuration.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::connect_with(addr, ClientConfig::default()).await
    }

    pub async fn connect_with(addr: impl ToSocketAddrs, config: ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(CodecError::from)?;
        stream.set_nodelay(true).map_err(CodecError::from)?;
        Ok(Self::with_config(stream, config))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> Connection<S> {
    /// Wraps an already established stream.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ClientConfig::default())
    }

    pub fn with_config(stream: S, config: ClientConfig) -> Self {
        Self { frames: FrameReader::with_limit(stream, config.max_frame_bytes) }
    }

    /// Invokes `service.method` with dynamic arguments and waits for the reply.
    ///
    /// No retries and no timeout; wrap the future in `tokio::time::timeout` if one
    /// is needed.
    pub async fn call(&mut self, service: &str, method: &str, args: Vec<Value>) -> Result<Outcome> {
        if let Some(index) = args.iter().position(|arg| !arg.is_wire_safe()) {
            return Err(RpcError::InvalidArgument {
                index,
                reason: "non-finite floats cannot be sent".into(),
            });
        }

        debug!(service, method, args = args.len(), "call");
        let call = Call::new(service, method, args);
        encode_call(self.frames.get_mut(), &call).await?;

        let reply = self.frames.decode_reply().await?.ok_or(CodecError::Closed)?;
        let results = reply.into_result().map_err(RpcError::Remote)?;
        Ok(Outcome::new(results))
    }

    /// Like `call`, with arguments given as a tuple of `Shaped` values.
    pub async fn call_typed<A: IntoArgs>(
        &mut self,
        service: &str,
        method: &str,
        args: A,
    ) -> Result<Outcome> {
        self.call(service, method, args.into_args()).await
    }

    /// Shuts down the write side and drops the connection.
    pub async fn close(self) -> Result<()> {
        let mut stream = self.frames.into_inner();
        stream.shutdown().await.map_err(CodecError::from)?;
        Ok(())
    }
}

/// The results of a successful call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Outcome {
    values: Vec<Value>,
}

impl Outcome {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn get(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or(RpcError::MissingResult(index))
    }

    /// Coerces the result at `index` into `shape`.
    pub fn coerce(&self, index: usize, shape: &Shape) -> Result<Typed> {
        Ok(coerce(self.get(index)?, shape, &Policy::default())?)
    }

    /// Converts the result at `index` into a Rust type.
    pub fn decode<T: Shaped>(&self, index: usize) -> Result<T> {
        let typed = self.coerce(index, &T::shape())?;
        Ok(T::from_typed(typed)?)
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        self.decode(index)
    }

    pub fn bool(&self, index: usize) -> Result<bool> {
        self.decode(index)
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        self.decode(index)
    }

    pub fn string(&self, index: usize) -> Result<String> {
        self.decode(index)
    }
}
