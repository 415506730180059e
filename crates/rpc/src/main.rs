#![forbid(unsafe_code)]

mod entry;
mod handlers;
mod server;
mod support;

pub(crate) use server::LocationServer;
pub(crate) use support::*;

use loc_storage::SqliteStore;
use tracing_subscriber::EnvFilter;

const SERVER_NAME: &str = "loc_rpc";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn usage() -> &'static str {
    "loc_rpc: location hierarchy JSON-RPC server (newline-delimited, stdio)\n\n\
USAGE:\n\
  loc_rpc [--storage-dir DIR] [--log FILTER]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version and exit\n\
\n\
ENVIRONMENT:\n\
  LOCATIONS_STORAGE_DIR  Storage directory (default: .locations)\n\
  LOCATIONS_LOG          Log filter, e.g. info or loc_storage=debug (default: info)\n\
\n\
Logs go to stderr; stdout carries only protocol responses.\n"
}

fn version_line() -> String {
    format!("{SERVER_NAME} {SERVER_VERSION}")
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("{SERVER_NAME}: ignoring invalid log filter {filter:?}: {err}");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("{}", version_line());
        return Ok(());
    }

    let config = RuntimeConfig::from_process();
    init_tracing(&config.log_filter);

    let store = match SqliteStore::open(&config.storage_dir) {
        Ok(store) => store,
        Err(err) => {
            tracing::error!(
                storage_dir = %config.storage_dir.display(),
                code = err.code(),
                error = %err,
                "failed to open location store"
            );
            return Err(err.into());
        }
    };

    tracing::info!(version = SERVER_VERSION, "serving on stdio");
    let mut server = LocationServer::new(store);
    entry::run_stdio(&mut server)?;
    tracing::info!("stdin closed, shutting down");
    Ok(())
}
