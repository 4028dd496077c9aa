use std::process::ExitCode;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use webgis::app::{run, Command, RunOptions};
use webgis::config::AppConfig;
use webgis::feeds::{build_sources, http_client, resolve_feeds};
use webgis::session::{Session, SessionOptions};
use webgis::surfaces::{TracingDashboard, TracingMapSurface};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("invalid configuration: {err}");
            return ExitCode::from(2);
        }
    };
    let specs = match resolve_feeds(&config.feeds).await {
        Ok(specs) => specs,
        Err(err) => {
            error!("cannot resolve feeds: {err}");
            return ExitCode::from(2);
        }
    };
    let client = match http_client(config.http_timeout) {
        Ok(client) => client,
        Err(err) => {
            error!("cannot build http client: {err}");
            return ExitCode::FAILURE;
        }
    };
    let sources = Arc::new(build_sources(&specs, &client));

    info!(
        feeds = specs.len(),
        refresh_secs = config.refresh_interval.as_secs(),
        boundaries = %config.boundary_dir.display(),
        "starting webgis"
    );

    let mut session = Session::new(
        SessionOptions::from(&config),
        TracingMapSurface::new(config.map_center),
        TracingDashboard,
    );

    let (tx, rx) = mpsc::channel(32);
    tokio::spawn(read_commands(tx.clone()));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = tx.send(Command::Quit).await;
        }
    });

    run(&mut session, sources, RunOptions::from(&config), rx).await;
    info!(metrics = %session.metrics(), "webgis stopped");
    ExitCode::SUCCESS
}

async fn read_commands(tx: mpsc::Sender<Command>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => match Command::parse(&line) {
                Ok(command) => {
                    if tx.send(command).await.is_err() {
                        break;
                    }
                }
                Err(err) => warn!("{err}"),
            },
            Ok(None) => break,
            Err(err) => {
                warn!("stdin closed: {err}");
                break;
            }
        }
    }
}
