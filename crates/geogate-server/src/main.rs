use std::process::ExitCode;

use geogate_server::ServerBuilder;
use geogate_server::config::loader::ConfigLocation;
use geogate_server::observability::{apply_logging_level, init_tracing};

/// Configuration or startup failed before the gateway accepted traffic.
const EXIT_STARTUP: u8 = 2;
/// The server stopped with an error after starting.
const EXIT_RUNTIME: u8 = 1;

fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => eprintln!("ignoring .env: {e}"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    load_dotenv();
    init_tracing();

    let location = ConfigLocation::from_process();
    let cfg = match location.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error ({location}): {e}");
            return ExitCode::from(EXIT_STARTUP);
        }
    };
    tracing::info!(
        path = %location.path().display(),
        source = %location,
        upstream = %cfg.upstream.url,
        redis = cfg.redis.enabled,
        "Configuration loaded"
    );

    apply_logging_level(&cfg.logging.level);

    let server = match ServerBuilder::new().with_config(cfg).build().await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "gateway failed to start");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    match server.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "gateway exited with error");
            ExitCode::from(EXIT_RUNTIME)
        }
    }
}
