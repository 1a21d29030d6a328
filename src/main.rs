mod aggregate;
mod api;
mod chunker;
mod config;
mod decoding;
mod error;
mod models;
mod pipeline;
mod storage;
mod utils;

use log::{error, info, warn};

use api::{ChunkFetcher, SofarClient};
use config::{EtlConfig, SpotterTarget};
use error::EtlError;
use pipeline::{fetch_sensor_data, fetch_wave_data};
use storage::{write_groups, write_wave_data, OutputLayout};
use utils::{
    calculate_summary, format_datetime, RunSummary, METER_TO_FEET, M_PER_S_TO_KNOTS,
    NEWTON_TO_LBF,
};

/// Fetch, decode and persist everything for one spotter.
async fn process_spotter<F: ChunkFetcher>(
    client: &F,
    config: &EtlConfig,
    target: &SpotterTarget,
) -> Result<RunSummary, EtlError> {
    info!(
        "Processing data for {} from {} to {}",
        target.spotter_id,
        format_datetime(&target.range.start),
        format_datetime(&target.range.end)
    );

    let layout = OutputLayout::new(&config.output_dir, &target.spotter_id);

    let waves = fetch_wave_data(
        client,
        &target.spotter_id,
        &target.range,
        config.chunk_size_days,
    )
    .await?;
    if waves.is_empty() {
        warn!("No wave data returned for {}", target.spotter_id);
    }
    let wave_rows = write_wave_data(&layout, &waves)?;
    info!("Wave data processing complete: {} rows saved", wave_rows);

    let groups = fetch_sensor_data(
        client,
        &target.spotter_id,
        &target.range,
        config.chunk_size_days,
        &config.classifier,
    )
    .await?;
    if groups.is_empty() {
        warn!("No decodable sensor data returned for {}", target.spotter_id);
    }
    let sensor_rows = write_groups(&layout, &groups)?;
    info!(
        "Smart mooring processing complete: {} of {} records saved in {} groups",
        sensor_rows,
        groups.record_count(),
        groups.group_count()
    );
    info!("Unique Node IDs found: {:?}", groups.node_ids());

    Ok(calculate_summary(&waves, &groups))
}

fn log_summary(spotter_id: &str, summary: &RunSummary) {
    info!("Summary for {}:", spotter_id);
    info!(
        "  Samples: {} waves, {} wind, {} surface temp, {} barometer",
        summary.waves, summary.wind, summary.surface_temp, summary.barometer
    );
    if let Some(height) = summary.mean_wave_height {
        info!(
            "  Mean significant wave height: {:.2} m ({:.2} ft)",
            height,
            height * METER_TO_FEET
        );
    }
    if let Some(speed) = summary.mean_wind_speed {
        info!(
            "  Mean wind speed: {:.2} m/s ({:.2} knots)",
            speed,
            speed * M_PER_S_TO_KNOTS
        );
    }
    for (position, count) in &summary.positions {
        info!("  Sensor position {}: {} readings", position, count);
    }
    for node in &summary.nodes {
        info!("  Node {}: {} load cell samples", node.node_id, node.samples);
        if let Some(mean) = node.mean_force {
            info!(
                "    Mean force: {:.2} N ({:.2} lbf)",
                mean,
                mean * NEWTON_TO_LBF
            );
        }
        if let Some(max) = node.max_force {
            info!("    Max force: {:.2} N ({:.2} lbf)", max, max * NEWTON_TO_LBF);
        }
    }

    if summary.waves == 0 && summary.nodes.is_empty() && summary.positions.is_empty() {
        warn!("No data collected for {}!", spotter_id);
    }
}

async fn main_loop<F: ChunkFetcher>(
    client: &F,
    config: &EtlConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting Spotter data collection");

    let mut failures = 0;

    for target in &config.spotters {
        match process_spotter(client, config, target).await {
            Ok(summary) => log_summary(&target.spotter_id, &summary),
            Err(e) => {
                failures += 1;
                error!("Failed to process {}: {}", target.spotter_id, e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} spotters failed", failures, config.spotters.len()).into());
    }

    Ok(())
}

/// Run to completion or stop on Ctrl+C. Failed spotters fail the run.
async fn run<F: ChunkFetcher>(
    client: &F,
    config: &EtlConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    tokio::select! {
        result = main_loop(client, config) => {
            match result {
                Ok(_) => info!("Program completed successfully"),
                Err(e) => {
                    error!("Fatal error: {}", e);
                    return Err(e);
                }
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match EtlConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let client = SofarClient::new(&config.api)?;
    run(&client, &config).await
}
