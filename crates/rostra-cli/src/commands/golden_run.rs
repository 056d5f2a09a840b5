/// Golden run: solve a forecast and write the canonical artifact set.
use std::path::Path;

use rostra_core::proofpack::{render_matrix, render_rosters};
use rostra_core::{solve_forecast, SolverConfig};
use tracing::info;

use crate::commands::{ensure_dir, load_forecast};
use crate::exit::{emit_anyhow, EXIT_FAIL, EXIT_OK, EXIT_WARN};

pub fn run(forecast_path: &str, out_dir: &str, seed: u32) -> i32 {
    match run_inner(forecast_path, out_dir, seed) {
        Ok(all_audits_pass) => {
            if all_audits_pass {
                EXIT_OK
            } else {
                EXIT_WARN
            }
        }
        Err(err) => {
            emit_anyhow(&err);
            EXIT_FAIL
        }
    }
}

fn run_inner(forecast_path: &str, out_dir: &str, seed: u32) -> anyhow::Result<bool> {
    let (forecast, tours) = load_forecast(forecast_path)?;
    ensure_dir(out_dir)?;

    let cfg = SolverConfig::default();
    let outcome = solve_forecast(&tours, &cfg, seed)?;

    let out = Path::new(out_dir);
    std::fs::write(out.join("matrix.csv"), render_matrix(&outcome)?)?;
    std::fs::write(out.join("rosters.csv"), render_rosters(&outcome)?)?;
    std::fs::write(
        out.join("kpis.json"),
        serde_json::to_vec_pretty(&outcome.kpis)?,
    )?;

    let metadata = serde_json::json!({
        "tenant_code": forecast.tenant_code,
        "site_code": forecast.site_code,
        "week_anchor_date": forecast.week_anchor_date,
        "forecast_source": forecast_path,
        "seed": outcome.seed,
        "status": outcome.status.as_str(),
        "solver_arch": outcome.solver_arch,
        "headcount": outcome.headcount,
        "input_hash": outcome.input_hash,
        "solver_config_hash": outcome.solver_config_hash,
        "output_hash": outcome.output_hash,
        "generated_at": chrono::Utc::now().to_rfc3339(),
    });
    std::fs::write(
        out.join("metadata.json"),
        serde_json::to_vec_pretty(&metadata)?,
    )?;

    info!(
        out = out_dir,
        headcount = outcome.headcount,
        output_hash = %&outcome.output_hash[..12],
        "golden run written"
    );
    Ok(outcome.audit.all_pass())
}
