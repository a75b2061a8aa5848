//! Watch commands: run the scheduler, edit and show the watch list.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use sitewatch::config::MIN_INTERVAL_SECS;
use sitewatch::fetch::{parse_url, HttpFetcher};
use sitewatch::notify::{CompositeNotifier, DesktopNotifier, LogNotifier};
use sitewatch::utils::PidFileGuard;
use sitewatch::{Config, Engine, ResourceId, Scheduler, TickReport, WatchError};

/// Parse interval string like "1h", "30m", "15m", "60s" into seconds.
pub fn parse_interval(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    if let Some(hours) = s.strip_suffix('h') {
        let n: u64 = hours.parse().with_context(|| "Invalid hours value")?;
        n.checked_mul(3600).context("Interval too large")
    } else if let Some(mins) = s.strip_suffix('m') {
        let n: u64 = mins.parse().with_context(|| "Invalid minutes value")?;
        n.checked_mul(60).context("Interval too large")
    } else if let Some(secs) = s.strip_suffix('s') {
        let n: u64 = secs.parse().with_context(|| "Invalid seconds value")?;
        Ok(n)
    } else {
        s.parse::<u64>()
            .with_context(|| "Invalid interval. Use formats like 1h, 30m, or 60s")
    }
}

fn build_engine(config: &Config) -> Result<Arc<Engine>> {
    let fetcher = HttpFetcher::from_config(config)?;

    let mut notifier = CompositeNotifier::new().with(Arc::new(LogNotifier));
    if config.desktop_notifications {
        notifier = notifier.with(Arc::new(DesktopNotifier));
    }

    let engine = Engine::from_config(config, Arc::new(fetcher), Arc::new(notifier))
        .with_context(|| format!("Failed to open data directory {:?}", config.data_dir))?;
    Ok(Arc::new(engine))
}

fn stamp() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

pub(crate) async fn cmd_run(config: Config, interval: Option<String>, once: bool) -> Result<()> {
    let interval_secs = match interval.as_deref() {
        Some(raw) => parse_interval(raw)?.max(MIN_INTERVAL_SECS),
        None => config.interval_secs,
    };

    let _pid = PidFileGuard::acquire_at(config.pid_path())?;
    let engine = build_engine(&config)?;

    if once {
        let report = engine.run_once().await;
        print_report(&report);
        return Ok(());
    }

    let count = engine.current_list().await.len();
    println!("Watching {} page(s) from {:?}", count, config.watch_list_path());
    println!("Interval: {}s", interval_secs);
    println!();
    println!("Press Ctrl+C to stop.");
    println!();

    let scheduler = Scheduler::new(engine, Duration::from_secs(interval_secs));
    scheduler.start().await;

    tokio::signal::ctrl_c()
        .await
        .with_context(|| "Failed to listen for Ctrl+C")?;
    scheduler.stop().await;
    println!("[{}] Stopped", stamp());
    Ok(())
}

pub(crate) async fn cmd_add(config: Config, url: String) -> Result<()> {
    let id = ResourceId::new(&url)?;
    parse_url(&id).map_err(|e| WatchError::Precondition(e.to_string()))?;

    let engine = build_engine(&config)?;
    if engine.add_resource(id.clone()).await? {
        println!("{} has been added", id);
    } else {
        println!("{} is already being watched", id);
    }
    Ok(())
}

pub(crate) async fn cmd_remove(config: Config, url: String) -> Result<()> {
    let id = ResourceId::new(&url)?;
    let engine = build_engine(&config)?;

    if !engine.remove_resource(&id).await? {
        bail!(WatchError::Precondition(format!("{} is not being watched", id)));
    }
    println!("{} has been removed", id);
    Ok(())
}

pub(crate) async fn cmd_list(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;
    let ids = engine.current_list().await;

    if ids.is_empty() {
        println!("No websites watched. Add one with: sitewatch add <url>");
        return Ok(());
    }

    println!("My Websites:");
    for id in ids {
        let marker = if engine.store().contains(&id) { " " } else { "*" };
        println!("{} {}", marker, id);
    }
    Ok(())
}

pub(crate) async fn cmd_check(config: Config) -> Result<()> {
    let engine = build_engine(&config)?;
    let report = engine.run_once().await;
    print_report(&report);
    Ok(())
}

fn print_report(report: &TickReport) {
    for resource in &report.resources {
        match &resource.result {
            Ok(outcome) => println!("[{}] {:<9} {}", stamp(), outcome.label(), resource.id),
            Err(e) => println!("[{}] {:<9} {} ({})", stamp(), "error", resource.id, e),
        }
    }
    println!(
        "{} changed, {} unchanged, {} new, {} failed",
        report.changed(),
        report.unchanged(),
        report.baseline(),
        report.failed()
    );
}
