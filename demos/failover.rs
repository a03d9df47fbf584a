//! Failover example demonstrating level escalation and recovery.
//!
//! This example shows how to:
//! - Build a chain of adapters and wrap it in a failover coordinator
//! - Watch traffic move to the fallback when the primary keeps failing
//! - See the primary probed again after the level reset interval
//! - Read coordinator metrics and audit events
//!
//! Run with: cargo run --example failover
//! Set RUST_LOG=busbridge::audit=info to see only the audit trail.

use busbridge::backends::MockAdapter;
use busbridge::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("busbridge=info")),
        )
        .init();

    println!("=== Failover Example ===\n");

    // A flaky primary and a reliable fallback
    let primary = Arc::new(MockAdapter::new().with_name("pulsar"));
    let fallback = Arc::new(MockAdapter::new().with_name("redis"));

    let config = FailoverConfig::new()
        .with_max_attempts(3)
        .with_level_reset_interval(Duration::from_millis(500));

    println!("Failover Configuration:");
    println!("  Attempts per backend: {}", config.max_attempts);
    println!("  Level reset interval: {:?}", config.level_reset_interval);
    println!();

    let chain = AdapterChain::new(vec![
        primary.clone() as ArcAdapter,
        fallback.clone() as ArcAdapter,
    ])?;
    let coordinator = FailoverCoordinator::new(chain, config);

    println!("Primary healthy:");
    coordinator.send("orders", "order-1").await?;
    report(&coordinator, &primary, &fallback);

    println!("Primary goes down:");
    primary.set_failing(true);
    for i in 2..=4 {
        coordinator.send("orders", &format!("order-{i}")).await?;
    }
    report(&coordinator, &primary, &fallback);

    println!("Primary recovers, but the coordinator waits for the reset interval:");
    primary.set_failing(false);
    coordinator.send("orders", "order-5").await?;
    report(&coordinator, &primary, &fallback);

    tokio::time::sleep(Duration::from_millis(600)).await;
    println!("After the reset interval:");
    coordinator.send("orders", "order-6").await?;
    report(&coordinator, &primary, &fallback);

    println!("Everything down:");
    primary.set_failing(true);
    fallback.set_failing(true);
    match coordinator.send("orders", "order-7").await {
        Ok(()) => println!("  Unexpected success"),
        Err(e) => println!("  Failed: {e}"),
    }
    println!();

    let drained = fallback.receive("orders").await;
    println!("Fallback held {:?}", drained.map(|m| m.len()));

    let metrics = coordinator.metrics();
    println!("\nFinal Metrics:");
    println!("  Total calls: {}", metrics.total_calls);
    println!("  Successful: {}", metrics.successful_calls);
    println!("  Failed attempts: {}", metrics.failed_attempts);
    println!("  Escalations: {}", metrics.escalations);
    println!("  Exhaustions: {}", metrics.exhaustions);
    println!("  Resets: {}", metrics.resets);
    println!("  Success rate: {:.1}%", metrics.success_rate() * 100.0);

    println!("\nAudit Trail:");
    for event in coordinator.recent_events() {
        println!(
            "  {} {:<16} {}",
            event.timestamp.format("%H:%M:%S%.3f"),
            event.event_type.as_str(),
            event.detail.unwrap_or_default()
        );
    }

    for failure in coordinator.shutdown().await {
        println!("Close failed: {failure}");
    }

    println!("\n=== Example Complete ===");
    Ok(())
}

fn report(coordinator: &FailoverCoordinator, primary: &MockAdapter, fallback: &MockAdapter) {
    let snapshot = coordinator.snapshot();
    println!(
        "  level = {}, attempts = {}, primary sends = {}, fallback sends = {}\n",
        snapshot.level,
        snapshot.attempts,
        primary.send_count(),
        fallback.send_count()
    );
}
