//! Plans every configured instance and logs the resulting schedules

use anyhow::{bail, Context, Result};
use log::{error, info};
use std::sync::Arc;
use vertiport_planner::instance::{InstanceData, InstanceFile};
use vertiport_planner::planner::{plan_batch, Planner};
use vertiport_planner::*;

fn load_instance(path: &str, config: &Config) -> Result<InstanceData> {
    let file = InstanceFile::from_path(path)?;
    InstanceData::new(file, &config.validation_options())
        .with_context(|| format!("Instance file [{}] is invalid", path))
}

/// Fails the run when nothing was planned or any instance failed
fn check_failures(failed: usize, total: usize) -> Result<()> {
    if total == 0 {
        bail!("No instances configured; set INSTANCE_PATHS");
    }

    if failed > 0 {
        bail!("{} of {} instances could not be planned", failed, total);
    }

    Ok(())
}

#[tokio::main]
#[cfg(not(tarpaulin_include))]
async fn main() -> Result<()> {
    // Will use default config settings if no environment vars are found.
    let config = Config::try_from_env().context("Failed to load configuration from environment")?;

    info!("(main) Loading config.");

    // Try to load log configuration from the provided log file.
    // Will default to stdout debug logging if the file can not be loaded.
    if let Err(e) = load_logger_config_from_file(config.log_config.as_str()).await {
        error!("(main) {}", e);
    }

    let planner = Arc::new(Planner::from_config(&config)?);

    let paths = config.instance_paths();
    let total = paths.len();
    let mut failed = 0;
    let mut labels = vec![];
    let mut instances = vec![];
    for path in paths {
        match load_instance(&path, &config) {
            Ok(instance) => {
                labels.push(path);
                instances.push(instance);
            }
            Err(e) => {
                error!("(main) Skipping [{}]: {:#}", path, e);
                failed += 1;
            }
        }
    }

    info!("(main) Planning {} instances.", instances.len());
    let results = plan_batch(planner, instances, config.max_parallel_runs).await;

    for (label, result) in labels.iter().zip(results) {
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                error!("(main) [{}] {}", label, e);
                failed += 1;
                continue;
            }
        };

        let extraction = &report.extraction;
        info!(
            "(main) [{}] Status: {}, served passengers: {:?}",
            label, extraction.status, extraction.served_passengers
        );

        for flight in &extraction.flights {
            info!(
                "(main) [{}] Flight from {} to {} at time {} by aircraft {}",
                label, flight.origin, flight.destination, flight.departure_time, flight.aircraft_id
            );
        }

        match serde_json::to_string(&report) {
            Ok(json) => log::debug!("(main) [{}] {}", label, json),
            Err(e) => error!("(main) [{}] Could not serialize report: {}", label, e),
        }
    }

    info!("(main) Planning finished.");
    let result = check_failures(failed, total);
    if let Err(e) = &result {
        error!("(main) {}", e);
    }

    // Make sure all log message are written/ displayed before shutdown
    log::logger().flush();

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ut_check_failures() {
        assert!(check_failures(0, 3).is_ok());

        let e = check_failures(1, 3).unwrap_err();
        assert_eq!(e.to_string(), "1 of 3 instances could not be planned");

        let e = check_failures(0, 0).unwrap_err();
        assert!(e.to_string().starts_with("No instances configured"));
    }

    #[test]
    fn ut_load_instance_reports_bad_path() {
        let config = Config::default();
        let e = load_instance("/nonexistent/instance.json", &config).unwrap_err();
        assert!(format!("{:#}", e).contains("/nonexistent/instance.json"));
    }
}
