use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use scriptdbg_debug::{
    AdapterOptions, ConfigOverrides, DebugServer, DebuggerConfig, FsSourceResolver,
    MemorySourceResolver,
};
use scriptdbg_runtime::debug::{
    BridgeFrontend, DebugControl, DisconnectPolicy, SessionWait, TraceDispatcher,
};
use scriptdbg_runtime::harness::{demo_program, Interpreter, RunOutcome};

/// Run the demo script under the debugger and serve debug clients over TCP.
#[derive(Debug, Parser)]
#[command(name = "scriptdbg", version)]
struct Cli {
    /// TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 127.0.0.1:5678.
    #[arg(long)]
    listen: Option<String>,

    #[arg(long, conflicts_with = "no_stop_on_entry")]
    stop_on_entry: bool,

    #[arg(long)]
    no_stop_on_entry: bool,

    /// Start running without waiting for a client.
    #[arg(long, conflicts_with = "wait_timeout_ms")]
    no_wait: bool,

    /// Wait at most this long for a client before running on.
    #[arg(long)]
    wait_timeout_ms: Option<u64>,

    /// `resume` or `stay-stopped`.
    #[arg(long)]
    disconnect_policy: Option<DisconnectPolicy>,

    #[arg(long)]
    request_timeout_ms: Option<u64>,

    #[arg(long)]
    thread_name: Option<String>,

    /// Run the demo program this many times.
    #[arg(long, default_value_t = 1)]
    rounds: u32,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let stop_on_entry = if self.no_stop_on_entry {
            Some(false)
        } else if self.stop_on_entry {
            Some(true)
        } else {
            None
        };
        let wait_for_client = if self.no_wait {
            Some(SessionWait::NoWait)
        } else {
            self.wait_timeout_ms
                .map(|ms| SessionWait::Timeout(Duration::from_millis(ms)))
        };
        ConfigOverrides {
            listen: self.listen.clone(),
            stop_on_entry,
            wait_for_client,
            disconnect_policy: self.disconnect_policy,
            request_timeout: self
                .request_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis),
            thread_name: self.thread_name.clone(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = DebuggerConfig::resolve(cli.config.as_deref(), cli.overrides())
        .context("load debugger configuration")?;
    info!(listen = %config.listen, stop_on_entry = config.stop_on_entry, "starting scriptdbg");

    let program = demo_program();
    let control = DebugControl::new();
    control.set_disconnect_policy(config.disconnect_policy);

    let resolver =
        MemorySourceResolver::from_program(&program).with_fallback(Arc::new(FsSourceResolver));
    let server = DebugServer::bind(
        &config.listen,
        control.clone(),
        AdapterOptions::from(&config),
        Arc::new(resolver),
    )
    .context("start debug server")?;
    let addr = server.local_addr().context("read listen address")?;
    eprintln!("scriptdbg listening on {addr}");
    let _server = server.spawn();

    let frontend = BridgeFrontend::new(control.clone())
        .with_stop_on_entry(config.stop_on_entry)
        .with_session_wait(config.wait_for_client);
    let dispatcher = TraceDispatcher::new(control, frontend);
    for round in 1..=cli.rounds.max(1) {
        dispatcher.reset();
        match Interpreter::new(&program, &dispatcher).run() {
            RunOutcome::Completed(value) => {
                info!(round, result = %value.repr(), "demo finished");
            }
            RunOutcome::Raised {
                type_name,
                message,
            } => {
                info!(round, %type_name, %message, "demo raised");
            }
            RunOutcome::Aborted => {
                info!(round, "demo aborted by the debugger");
                break;
            }
        }
    }
    Ok(())
}
