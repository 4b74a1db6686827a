//! `policyd`: CLI, signal handling, and the wiring that turns
//! `policy-engine` and `policy-server` into a running daemon (spec §6
//! "External interfaces", §4.1 "Signals").
//!
//! Structured the way `kannader::run` is: a `structopt::Opt`, a
//! `tracing_subscriber` init that respects `-v`, and a thread-pool
//! executor built with `easy_parallel::Parallel` so the accept loop and
//! every connection task share the same pool `yuubind::main` uses.

mod opt;
mod signals;
mod srs;

use std::sync::Arc;

use anyhow::Context;
use easy_parallel::Parallel;
use structopt::StructOpt;
use tracing::info;

use opt::Opt;
use policy_dns::DnsGateway;
use policy_engine::{Engine, SharedEngine};
use signals::SignalEvent;

const NUM_THREADS: usize = 4;

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(opt.tracing_filter()))
        .init();

    if opt.check_conf {
        return check_conf(&opt);
    }

    info!("policyd starting up");
    if opt.unsafe_ {
        tracing::warn!("--unsafe given: this build never drops privileges on its own");
    }
    if opt.foreground {
        tracing::info!("--foreground given: staying attached to the controlling terminal");
    }

    if let Some(pid_file) = &opt.pid_file {
        std::fs::write(pid_file, format!("{}\n", std::process::id()))
            .with_context(|| format!("writing pid file {}", pid_file.display()))?;
    }

    let ex = Arc::new(smol::Executor::new());
    let (stop_signal, shutdown) = smol::channel::unbounded::<()>();
    let (signal_tx, signal_rx) = smol::channel::unbounded::<SignalEvent>();
    signals::spawn(signal_tx).context("installing signal handlers")?;

    let (_, res): (_, anyhow::Result<()>) = Parallel::new()
        .each(0..NUM_THREADS, |_| smol::block_on(ex.run(shutdown.recv())))
        .finish(|| smol::block_on(run(ex.clone(), opt, signal_rx, stop_signal)));

    res
}

fn check_conf(opt: &Opt) -> anyhow::Result<()> {
    if let Err(err) = validate_conf(&opt.config) {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
    Ok(())
}

/// The part of `--check-conf` that is actually worth unit testing: load
/// the file and report whether it is valid, without touching the
/// process (spec §6: "`--check-conf` parses the configuration, prints
/// errors, and exits non-zero on failure").
fn validate_conf(path: &std::path::Path) -> anyhow::Result<()> {
    let config = policy_config::load_file(path)?;
    info!(
        filters = config.filters.len(),
        port = ?config.listener.port,
        socketfile = ?config.listener.socketfile,
        "configuration is valid"
    );
    Ok(())
}

async fn run(
    ex: Arc<smol::Executor<'static>>,
    opt: Opt,
    signal_rx: smol::channel::Receiver<SignalEvent>,
    stop_signal: smol::channel::Sender<()>,
) -> anyhow::Result<()> {
    info!(path = %opt.config.display(), "loading configuration");
    let dns = DnsGateway::from_system_conf()
        .await
        .context("configuring the DNS resolver")?;
    let dns = Arc::new(dns);
    let srs_codec = srs::codec();

    let engine = Engine::load(opt.config.clone(), Some(dns), Some(srs_codec))
        .context("loading the initial configuration")?;
    let listener = engine.current().config.listener.clone();
    let engine = SharedEngine::new(engine);

    let port = opt.port.or(listener.port);
    let socketfile = opt.socketfile.clone().or(listener.socketfile);

    ex.spawn(reload_on_signal(engine.clone(), signal_rx, stop_signal)).detach();

    policy_server::serve_listeners(ex, port, socketfile.as_deref(), engine).await
}

/// Reacts to [`SignalEvent`]s for as long as the process runs: `SIGHUP`
/// reloads in place (spec §4.5), `SIGINT`/`SIGTERM` drop `stop_signal`,
/// which is what lets every worker thread's `ex.run(shutdown.recv())`
/// return and the process exit cleanly (spec §4.1).
async fn reload_on_signal(
    engine: SharedEngine,
    signal_rx: smol::channel::Receiver<SignalEvent>,
    stop_signal: smol::channel::Sender<()>,
) {
    while let Ok(event) = signal_rx.recv().await {
        match event {
            SignalEvent::Reload => match engine.reload().await {
                Ok(()) => info!("configuration reloaded"),
                Err(err) => tracing::error!(error = %err, "configuration reload failed; keeping the previous generation"),
            },
            SignalEvent::Shutdown => {
                info!("shutting down");
                std::mem::drop(stop_signal);
                return;
            }
        }
    }
}
