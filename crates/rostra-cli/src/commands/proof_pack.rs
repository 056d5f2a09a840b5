/// Evidence pack export and verification.
use std::path::Path;

use rostra_core::{
    build_proof_pack, solve_forecast, verify_proof_pack, ProofPackMeta, SolverConfig,
};
use tracing::info;

use crate::commands::{ensure_dir, load_forecast};
use crate::exit::{emit_anyhow, emit_error, EXIT_FAIL, EXIT_OK, EXIT_WARN};

/// Exit 0 = exported and audits clean, 1 = exported with audit warnings,
/// 2 = failure.
pub fn export(
    forecast_path: &str,
    out_dir: &str,
    seed: u32,
    plan_id: i64,
    tenant: &str,
    site: &str,
) -> i32 {
    match export_inner(forecast_path, out_dir, seed, plan_id, tenant, site) {
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

fn export_inner(
    forecast_path: &str,
    out_dir: &str,
    seed: u32,
    plan_id: i64,
    tenant: &str,
    site: &str,
) -> anyhow::Result<bool> {
    let (_, tours) = load_forecast(forecast_path)?;
    ensure_dir(out_dir)?;

    let cfg = SolverConfig::default();
    let outcome = solve_forecast(&tours, &cfg, seed)?;

    let meta = ProofPackMeta {
        plan_version_id: plan_id,
        tenant_id: tenant.to_string(),
        site_id: site.to_string(),
        forecast_source: forecast_path.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
    };
    let zip_bytes = build_proof_pack(&outcome, &cfg, &meta)?;

    let run_id = &outcome.output_hash[..12];
    let zip_path = Path::new(out_dir).join(format!("evidence_pack_{run_id}.zip"));
    std::fs::write(&zip_path, &zip_bytes)?;

    info!(
        path = %zip_path.display(),
        bytes = zip_bytes.len(),
        "evidence pack exported"
    );
    println!("{}", zip_path.display());
    Ok(outcome.audit.all_pass())
}

/// Exit 0 = every checksum matches, 1 = mismatch or missing file.
pub fn verify(zip_path: &str) -> i32 {
    let bytes = match std::fs::read(zip_path) {
        Ok(b) => b,
        Err(e) => {
            emit_error("VALIDATION_ERROR", &format!("reading {zip_path}: {e}"));
            return EXIT_WARN;
        }
    };

    match verify_proof_pack(&bytes) {
        Ok(report) if report.passed => {
            println!(
                "PASS: {} file(s) verified, checksums match",
                report.files_checked
            );
            EXIT_OK
        }
        Ok(report) => {
            emit_error(
                "CHECKSUM_MISMATCH",
                &format!(
                    "mismatched: {:?}, missing: {:?}",
                    report.mismatches, report.missing
                ),
            );
            EXIT_WARN
        }
        Err(err) => {
            emit_error("VALIDATION_ERROR", &err.to_string());
            EXIT_WARN
        }
    }
}
