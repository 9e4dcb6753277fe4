#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

use tls_client as _;

use std::process::ExitCode;

use config::{Config, args::AppMode, get_config};
use server::{ModerationBackend, api_doc::ApiDoc};
use tracing::error;
use tracing_subscriber::EnvFilter;

const BACKEND_SEMVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> ExitCode {
    let args = config::args::get_args();

    if let Some(AppMode::OpenApi) = args.mode {
        return match ApiDoc::open_api_json_string() {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("API documentation creation failed: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let config = match get_config(args.server, BACKEND_SEMVER_VERSION.to_string()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config loading failed: {:?}", e);
            return ExitCode::FAILURE;
        }
    };

    init_logging(&config);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Tokio runtime creation failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(ModerationBackend::new(config).run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if config.log_timestamp() {
        builder.init();
    } else {
        builder.without_time().init();
    }
}
