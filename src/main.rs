mod blackboard; // ranging statistics shared with the monitor
mod bus; // broadcast topic carrying cycle reports
mod config; // settings from config/default.toml and SONAR__* variables
mod ranging; // the blocking trigger/poll/report loop
mod report; // console sink and monitor task
mod sim; // host stand-ins for the sensor hardware

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use sonar_echo::{EchoRanger, EchoState};
use tracing::{error, info};
use tracing_subscriber::{self, EnvFilter};

use blackboard::Blackboard;
use bus::{CycleReport, Topic};
use ranging::LoopPolicy;
use report::ConsoleSink;
use sim::{EchoSimulator, InstantClock, SimTrigger, SpinDelay, TokioAlarm};

/// Shared between the ranging loop, the edge producer and the alarm tasks.
static ECHO: EchoState = EchoState::new();

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let settings = config::load_config().context("loading configuration")?;
    info!(
        echo_pin = settings.pins.echo,
        trigger_pin = settings.pins.trigger,
        timeout_ms = settings.timing.timeout_ms,
        "Sonar ranger started against a simulated sensor."
    );

    let clock = InstantClock::new();
    let (trigger, triggers) = SimTrigger::new(clock);
    let echo_sim = EchoSimulator::new(&ECHO, clock, &settings.simulation)
        .spawn(triggers)
        .context("spawning echo simulator")?;

    let alarm = TokioAlarm::new(tokio::runtime::Handle::current());
    let mut ranger = EchoRanger::new(
        &ECHO,
        trigger,
        SpinDelay::new(),
        alarm,
        settings.timing,
        settings.limits,
    )
    .map_err(|e| -> anyhow::Error { match e {} })?;

    let bb: Blackboard = Arc::default();
    let topic: Topic<CycleReport> = Topic::new(16);
    let monitor_rx = topic.subscribe();
    let policy = LoopPolicy {
        settle: Duration::from_millis(settings.timing.settle_ms as u64),
        max_cycles: settings.simulation.max_cycles,
    };

    info!("Spawning ranging thread...");
    let ranging = std::thread::Builder::new()
        .name("ranging".into())
        .spawn({
            let bb = Arc::clone(&bb);
            move || {
                let mut sink = ConsoleSink::default();
                // `ranger` and `topic` drop with this closure, which closes the
                // trigger line and the cycle topic.
                let result = ranging::run(&mut ranger, &mut sink, &topic, &bb, policy);
                info!(lines = sink.lines(), "Console sink closed.");
                result
            }
        })?;

    report::monitor_task(
        monitor_rx,
        bb,
        Duration::from_millis(settings.telemetry.stats_interval_ms),
    )
    .await;

    let cycles = match ranging.join() {
        Ok(Ok(cycles)) => cycles,
        Ok(Err(e)) => {
            error!("Ranging loop failed: {:?}", e);
            return Err(e);
        }
        Err(_) => return Err(anyhow!("ranging thread panicked")),
    };
    echo_sim
        .join()
        .map_err(|_| anyhow!("echo simulator thread panicked"))?;

    info!(cycles, "Sonar ranger stopped.");
    Ok(())
}
