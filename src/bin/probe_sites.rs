//! Probe every registered provider once and print latencies, fastest first.
//! Reads the same config / registry files as the server (`AGGREGATOR_CONFIG_PATH`, `SITES_DB_PATH`).

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let facade = vod_aggregator::build_facade()?;
    let reports = facade.probe_all().await;

    for r in &reports {
        let latency = if r.latency == vod_aggregator::fanout::PROBE_FAILURE_LATENCY {
            "unreachable".to_string()
        } else {
            format!("{}ms", r.latency)
        };
        let flag = if r.active { "" } else { " (inactive)" };
        println!("{:<10} {:<16} {}{}", r.key, r.name, latency, flag);
    }

    println!("probe-sites done: {} providers", reports.len());
    Ok(())
}
