//! dynd - serve the example user service, or call any method from the shell.

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use dynpack::Value;
use dynrpc::DEFAULT_MAX_FRAME_BYTES;
use dynrpc::LengthPolicy;
use dynrun::ClientConfig;
use dynrun::Connection;
use dynrun::Server;
use dynrun::ServerConfig;
use tracing::info;
use tracing_subscriber::EnvFilter;

use dynd::users;

#[derive(Parser, Debug)]
#[command(name = "dynd")]
#[command(about = "Dynamic-value RPC demo server and client")]
struct Args {
    /// Enable debug logging (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    debug: bool,

    /// Largest envelope to buffer, in bytes
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_FRAME_BYTES)]
    max_frame_bytes: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the example UserService
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:3456")]
        addr: String,

        /// Reject fixed-length arguments whose length does not match exactly
        #[arg(long)]
        strict_arrays: bool,
    },
    /// Call a method and print its results as a JSON array
    Call {
        /// Server address
        #[arg(long, default_value = "127.0.0.1:3456")]
        addr: String,

        service: String,

        method: String,

        /// Arguments, one JSON value each
        args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    match args.command {
        Command::Serve { addr, strict_arrays } => {
            let fixed_len = if strict_arrays { LengthPolicy::Exact } else { LengthPolicy::Lenient };
            serve(&addr, ServerConfig { max_frame_bytes: args.max_frame_bytes, fixed_len }).await
        }
        Command::Call { addr, service, method, args: raw } => {
            let config = ClientConfig { max_frame_bytes: args.max_frame_bytes };
            call(&addr, config, &service, &method, &raw).await
        }
    }
}

async fn serve(addr: &str, config: ServerConfig) -> Result<()> {
    let server = Server::with_config(config);
    server.register(users::SERVICE_NAME, users::user_service());

    let listener = server.bind(addr).await?;
    info!("RPC server running on {}", listener.local_addr()?);

    tokio::select! {
        _ = listener.run() => {}
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown signal received, exiting");
        }
    }
    Ok(())
}

async fn call(addr: &str, config: ClientConfig, service: &str, method: &str, raw: &[String]) -> Result<()> {
    let args = raw
        .iter()
        .enumerate()
        .map(|(i, text)| {
            serde_json::from_str::<Value>(text).with_context(|| format!("argument {} is not JSON: {}", i, text))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut conn = Connection::connect_with(addr, config)
        .await
        .with_context(|| format!("connecting to {}", addr))?;
    let outcome = conn.call(service, method, args).await?;
    conn.close().await?;

    println!("{}", serde_json::to_string(outcome.values())?);
    Ok(())
}
