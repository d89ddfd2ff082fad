//! Entry point: argument parsing, PID-file lifecycle, config load, and the
//! pingora server that hosts one `GatewayApp` per listening port.

mod cli;
mod config;
mod error;
mod listener;
mod logging;
mod matching;
mod pages;
mod pidfile;
mod proxy;
mod service;
mod signal;
mod target;
mod variable;

use std::collections::HashMap;

use log::{error, info};
use pingora::server::{RunArgs, Server};
use pingora::services::Service as PingoraService;

use cli::{Cli, Signal};
use config::LoadedConfig;
use proxy::GatewayApp;

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    if let Some(signal) = cli.signal {
        if let Err(err) = dispatch_signal(&cli, signal) {
            error!("{err}");
            std::process::exit(1);
        }
        return;
    }

    if let Err(err) = pidfile::claim(&cli.pid_file) {
        error!("{err}");
        std::process::exit(1);
    }

    let exit_code = run(&cli);
    pidfile::release(&cli.pid_file);
    std::process::exit(exit_code);
}

fn dispatch_signal(cli: &Cli, signal: Signal) -> Result<(), String> {
    let pid = cli
        .pid
        .or_else(|| pidfile::read_pid(&cli.pid_file))
        .ok_or_else(|| "no pid given and no pid file found".to_string())?;
    signal::dispatch(pid, signal).map_err(|e| format!("failed to signal pid {pid}: {e}"))
}

/// Builds the pingora server, binds one listener per configured port, and
/// blocks in the signal loop until `SIGINT`. Returns the process exit code.
fn run(cli: &Cli) -> i32 {
    let loaded = match LoadedConfig::load(&cli.config) {
        Ok(loaded) => loaded,
        Err(err) => {
            error!("failed to load configuration: {err}");
            return 1;
        }
    };

    let handles_by_port = match listener::build_handles(&loaded.config) {
        Ok(handles) => handles,
        Err(err) => {
            error!("failed to build routing tables: {err}");
            return 1;
        }
    };

    let opt = Some(pingora::prelude::Opt::default());
    let mut server = match Server::new(opt) {
        Ok(server) => server,
        Err(err) => {
            error!("failed to create pingora server: {err}");
            return 1;
        }
    };
    server.bootstrap();

    let mut apps: HashMap<u16, GatewayApp> = HashMap::new();
    let mut services: Vec<Box<dyn PingoraService>> = Vec::new();

    for (port, (handles, tls)) in handles_by_port {
        let gateway = GatewayApp::new(handles);
        apps.insert(port, gateway.clone());

        let mut service = pingora::proxy::http_proxy_service(&server.configuration, gateway);
        let addr = format!("0.0.0.0:{port}");
        let has_tls = tls.is_some();
        match tls {
            Some((cert, key)) => service.add_tls(&addr, &cert, &key),
            None => service.add_tcp(&addr),
        }
        services.push(Box::new(service));
        info!("listening on {addr} ({})", if has_tls { "TLS" } else { "plain" });
    }

    server.add_services(services);

    let runtime = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    let entry = loaded.entry.clone();
    let apps_for_signals = apps.clone();
    runtime.spawn(async move {
        loop {
            match signal::next_event().await {
                signal::Event::Stop => {
                    info!("stop requested");
                    std::process::exit(0);
                }
                signal::Event::Reload => {
                    if let Err(err) = reload(&entry, &apps_for_signals) {
                        error!("reload failed, keeping previous routing tables: {err}");
                    }
                }
            }
        }
    });

    server.run(RunArgs::default());
    0
}

fn reload(entry: &std::path::Path, apps: &HashMap<u16, GatewayApp>) -> Result<(), error::ReloadError> {
    let loaded = LoadedConfig::load(entry)?;
    let known_ports: Vec<u16> = apps.keys().copied().collect();
    let handles_by_port = listener::reload::reload(&loaded.config, &known_ports)?;

    for (port, (handles, _tls)) in handles_by_port {
        if let Some(app) = apps.get(&port) {
            let _old = app.replace_handles(handles);
        }
    }
    Ok(())
}
