// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Simulated browser session driving the reaper.
//!
//! Demonstrates:
//! 1. Loading config the way an options page stores it (`maxTabs` as a string)
//! 2. Seeding tabs that are already open at startup
//! 3. Browsing past capacity and watching tabs move into the grace queue
//! 4. Pinning the active tab with the exclusion toggle
//! 5. Rescuing a pending tab by switching back to it
//! 6. Displaying metrics and shutting down
//!
//! # Run
//!
//! ```bash
//! cargo run --example simulated_browser
//! ```

use std::sync::Arc;
use std::time::Duration;

use lru_reaper::{EvictionCoordinator, HandleId, InMemoryHost, ReaperConfig};
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lru_reaper=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           lru-reaper: Simulated Browser                       ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Configure
    // ─────────────────────────────────────────────────────────────────────────
    let config = ReaperConfig::from_json(
        r#"{
            "maxTabs": "3",
            "grace_period_ms": 2000,
            "sweep_interval_ms": 250
        }"#,
    )?;
    println!("📦 Capacity {} tabs, grace {} ms", config.capacity, config.grace_period().as_millis());

    let browser = Arc::new(InMemoryHost::new());
    let tab = HandleId::new;

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Seed tabs already open
    // ─────────────────────────────────────────────────────────────────────────
    let mut coordinator = EvictionCoordinator::new(config, browser.clone())?;
    for raw in 1..=2 {
        browser.open(tab(raw));
    }
    browser.open_protected(tab(99)); // audible tab, never reclaimed
    coordinator.seed([tab(1), tab(2), tab(99)]).await;

    let shutdown = CancellationToken::new();
    let (reaper, task) = coordinator.spawn(shutdown.clone());

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Browse past capacity
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🌐 Opening tabs 3..=6");
    for raw in 3..=6 {
        browser.open(tab(raw));
        browser.activate(tab(raw));
        reaper.created(tab(raw)).await?;
        reaper.activated(tab(raw)).await?;
    }
    let snapshot = reaper.snapshot().await?;
    println!("   Tracked: {:?}", snapshot.tracked);
    println!("   Pending: {:?}", snapshot.pending);

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Pin the active tab
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📌 Excluding active tab {}", tab(6));
    reaper.toggle_exclusion().await?;

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Switch back to a pending tab before its grace period ends
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n↩️  Switching back to {}", tab(2));
    browser.activate(tab(2));
    reaper.activated(tab(2)).await?;

    println!("\n⏳ Waiting out the grace period...");
    tokio::time::sleep(Duration::from_millis(2600)).await;

    let snapshot = reaper.snapshot().await?;
    println!("   Tracked:  {:?}", snapshot.tracked);
    println!("   Pending:  {:?}", snapshot.pending);
    println!("   Excluded: {:?}", snapshot.excluded);
    println!("   Closed by reaper: {:?}", browser.destroyed());
    println!("   Still open: {} tabs", browser.len());

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Metrics and shutdown
    // ─────────────────────────────────────────────────────────────────────────
    shutdown.cancel();
    task.await?;

    println!("\n📊 Metrics");
    let mut lines = Vec::new();
    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };
        let rendered = match value {
            DebugValue::Counter(v) => v.to_string(),
            DebugValue::Gauge(v) => v.into_inner().to_string(),
            DebugValue::Histogram(samples) => format!("{} samples", samples.len()),
        };
        lines.push(format!("   {}{} = {}", key.name(), label_str, rendered));
    }
    lines.sort();
    for line in lines {
        println!("{}", line);
    }

    println!("\n✅ Done");
    Ok(())
}
