use ferrumring::{Bin, Config, Consistent, RingStats, Settings, XxDigest};
use std::sync::Arc;
use tracing::info;

/// Small placement simulation: four bins, a batch of keys, one bin leaving.
fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("FerrumRing simulation starting...");

    let settings = match std::env::var("FERRUMRING_SETTINGS") {
        Ok(json) => Settings::from_json(&json)?,
        Err(_) => Settings::default(),
    };
    let config = Config::new(Arc::new(XxDigest::new()), settings);

    let bins = (0..4).map(|i| Bin::new(format!("node{}", i)));
    let ring = Consistent::new(config, bins)?;

    for i in 0..1000 {
        ring.locate(&format!("key_{}", i));
    }

    report(&ring.stats())?;

    ring.remove("node1")?;
    info!("node1 left the ring");

    report(&ring.stats())?;

    Ok(())
}

fn report(stats: &RingStats) -> anyhow::Result<()> {
    if let Some((bin, load)) = stats.busiest() {
        info!(
            "{} partitions assigned, busiest bin {} holds {} (ceiling {})",
            stats.assigned_partitions(),
            bin,
            load,
            stats.maximum_load
        );
    }
    println!("{}", serde_json::to_string_pretty(stats)?);
    Ok(())
}
