use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use tracing::{error, info};

use tubex::{
    common::{errors::ErrorReport, logger},
    configs::Config,
    sources::SourceManager,
    transport::ReqwestTransport,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Watch URL or bare video id
    input: String,

    /// Also query the iOS client
    #[arg(long, env = "TUBEX_FETCH_IOS")]
    ios: bool,

    /// Path to the config file
    #[arg(short, long, env = "TUBEX_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if args.ios {
        config.youtube.fetch_ios = true;
    }
    logger::init(&config);

    let transport = match ReqwestTransport::new(&config.http) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    let manager = SourceManager::new(&config, transport);
    info!("extracting {}", args.input);

    let (output, code) = match manager.fetch_stream_info(&args.input).await {
        Ok(result) => (serde_json::to_string_pretty(result.as_ref()), ExitCode::SUCCESS),
        Err(e) => {
            error!("extraction failed: {}", e);
            (
                serde_json::to_string_pretty(&ErrorReport::new(&e, &args.input)),
                ExitCode::FAILURE,
            )
        }
    };

    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize output: {}", e);
            return ExitCode::FAILURE;
        }
    }
    code
}
