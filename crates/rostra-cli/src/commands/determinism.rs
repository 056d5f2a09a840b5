/// Determinism proof: N solves, one expected hash.
use rostra_core::{prove_determinism, SolverConfig};

use crate::commands::load_forecast;
use crate::exit::{emit_anyhow, EXIT_FAIL, EXIT_OK, EXIT_WARN};

/// Exit 0 = all hashes equal, 1 = hashes differ, 2 = infra error.
pub fn run(forecast_path: &str, seed: u32, runs: usize) -> i32 {
    let tours = match load_forecast(forecast_path) {
        Ok((_, tours)) => tours,
        Err(err) => {
            emit_anyhow(&err);
            return EXIT_FAIL;
        }
    };

    match prove_determinism(&tours, &SolverConfig::default(), seed, runs) {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
            if report.passed {
                EXIT_OK
            } else {
                EXIT_WARN
            }
        }
        Err(err) => {
            emit_anyhow(&err.into());
            EXIT_FAIL
        }
    }
}
