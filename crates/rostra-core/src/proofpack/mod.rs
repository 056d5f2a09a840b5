/// Proof pack builder: a deterministic ZIP binding input, config, seed,
/// assignments and audit results, with a self-contained verifier.
///
/// The archive bytes themselves are part of the contract: entries are
/// sorted, timestamps fixed, compression disabled (see scripts.rs for the
/// rationale shipped with every pack).
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};
use tracing::info;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::config::SolverConfig;
use crate::domain::errors::{Result, SolveError};
use crate::domain::models::{RosterType, Weekday};
use crate::forecast::minutes_to_hhmm;
use crate::hash;
use crate::solver::pipeline::SolveOutcome;

mod scripts;

#[cfg(test)]
mod proofpack_tests;

pub const MANIFEST_VERSION: &str = "v3.2";

/// Identifiers stamped into metadata.json. `generated_at` is supplied by
/// the caller so replays can pin it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofPackMeta {
    pub plan_version_id: i64,
    pub tenant_id: String,
    pub site_id: String,
    pub forecast_source: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyReport {
    pub passed: bool,
    pub files_checked: usize,
    pub mismatches: Vec<String>,
    pub missing: Vec<String>,
}

/// Build the proof pack ZIP for a solved plan.
pub fn build_proof_pack(
    outcome: &SolveOutcome,
    cfg: &SolverConfig,
    meta: &ProofPackMeta,
) -> Result<Vec<u8>> {
    let mut files: BTreeMap<String, Vec<u8>> = BTreeMap::new();

    files.insert(
        "solver_config.json".to_string(),
        pretty_json(&serde_json::to_value(cfg).unwrap_or_default()),
    );
    files.insert(
        "kpis.json".to_string(),
        pretty_json(&serde_json::to_value(&outcome.kpis).unwrap_or_default()),
    );
    files.insert(
        "audit_summary.json".to_string(),
        pretty_json(&serde_json::to_value(&outcome.audit).unwrap_or_default()),
    );

    let metadata = serde_json::json!({
        "plan_version_id": meta.plan_version_id,
        "tenant_id": meta.tenant_id,
        "site_id": meta.site_id,
        "forecast_source": meta.forecast_source,
        "generated_at": meta.generated_at,
        "seed": outcome.seed,
        "status": outcome.status.as_str(),
        "solver_arch": outcome.solver_arch,
        "input_hash": outcome.input_hash,
        "solver_config_hash": outcome.solver_config_hash,
        "output_hash": outcome.output_hash,
    });
    files.insert("metadata.json".to_string(), pretty_json(&metadata));

    files.insert("matrix.csv".to_string(), render_matrix(outcome)?);
    files.insert("rosters.csv".to_string(), render_rosters(outcome)?);

    let repro = scripts::REPRODUCIBILITY_MD
        .replace("@INPUT_HASH@", &outcome.input_hash)
        .replace("@CONFIG_HASH@", &outcome.solver_config_hash)
        .replace("@OUTPUT_HASH@", &outcome.output_hash)
        .replace("@SEED@", &outcome.seed.to_string())
        .replace("@GENERATED_AT@", &meta.generated_at)
        .replace("@PLAN_VERSION_ID@", &meta.plan_version_id.to_string());
    files.insert("REPRODUCIBILITY.md".to_string(), repro.into_bytes());
    files.insert("verify.py".to_string(), scripts::VERIFY_PY.as_bytes().to_vec());

    // Manifest lists every other file's checksum plus the hash chain.
    let file_hashes: BTreeMap<&String, String> = files
        .iter()
        .map(|(name, content)| (name, hash::sha256_hex(content)))
        .collect();
    let manifest = serde_json::json!({
        "version": MANIFEST_VERSION,
        "plan_version_id": meta.plan_version_id,
        "generated_at": meta.generated_at,
        "files": file_hashes,
        "input_hash": outcome.input_hash,
        "solver_config_hash": outcome.solver_config_hash,
        "output_hash": outcome.output_hash,
        "verification": { "algorithm": "SHA256", "verify_script": "verify.py" },
    });
    files.insert("manifest.json".to_string(), pretty_json(&manifest));

    write_zip(&files)
}

/// Verify a proof pack ZIP: every manifest checksum must match.
pub fn verify_proof_pack(zip_bytes: &[u8]) -> Result<VerifyReport> {
    let mut archive = ZipArchive::new(Cursor::new(zip_bytes))
        .map_err(|e| SolveError::Validation(format!("not a zip archive: {e}")))?;

    let mut contents: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| SolveError::Validation(format!("zip entry {i}: {e}")))?;
        let mut buf = Vec::new();
        entry
            .read_to_end(&mut buf)
            .map_err(|e| SolveError::Validation(format!("zip entry {i}: {e}")))?;
        contents.insert(entry.name().to_string(), buf);
    }

    let manifest_bytes = contents
        .get("manifest.json")
        .ok_or_else(|| SolveError::Validation("manifest.json missing".to_string()))?;
    let manifest: serde_json::Value = serde_json::from_slice(manifest_bytes)
        .map_err(|e| SolveError::Validation(format!("manifest.json: {e}")))?;

    let mut mismatches = Vec::new();
    let mut missing = Vec::new();
    let mut checked = 0usize;

    if let Some(file_map) = manifest.get("files").and_then(|f| f.as_object()) {
        for (name, expected) in file_map {
            let expected = expected.as_str().unwrap_or_default();
            match contents.get(name) {
                None => missing.push(name.clone()),
                Some(content) => {
                    checked += 1;
                    if hash::sha256_hex(content) != expected {
                        mismatches.push(name.clone());
                    }
                }
            }
        }
    }

    let report = VerifyReport {
        passed: mismatches.is_empty() && missing.is_empty() && checked > 0,
        files_checked: checked,
        mismatches,
        missing,
    };
    info!(
        passed = report.passed,
        files = report.files_checked,
        "proof pack verified"
    );
    Ok(report)
}

fn pretty_json(value: &serde_json::Value) -> Vec<u8> {
    let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    text.push('\n');
    text.into_bytes()
}

/// Driver x day grid, semicolon-separated, German day headers.
pub fn render_matrix(outcome: &SolveOutcome) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());

    let mut header = vec!["driver_id".to_string()];
    header.extend(Weekday::ALL.iter().map(|d| d.matrix_abbr().to_string()));
    header.push("total_hours".to_string());
    writer
        .write_record(&header)
        .map_err(|e| SolveError::Validation(format!("matrix.csv: {e}")))?;

    for roster in &outcome.rosters {
        let mut row = vec![roster.driver_id.clone()];
        for day in Weekday::ALL {
            let cells: Vec<String> = roster
                .blocks
                .iter()
                .filter(|b| b.day == day)
                .map(|b| {
                    format!(
                        "{} {}-{}",
                        b.block_type.as_str(),
                        minutes_to_hhmm(b.first_start),
                        minutes_to_hhmm(b.last_end % (24 * 60))
                    )
                })
                .collect();
            row.push(cells.join(" + "));
        }
        row.push(format!("{:.1}", roster.total_hours()));
        writer
            .write_record(&row)
            .map_err(|e| SolveError::Validation(format!("matrix.csv: {e}")))?;
    }

    writer
        .into_inner()
        .map_err(|e| SolveError::Validation(format!("matrix.csv: {e}")))
}

/// Per-driver per-assignment detail rows.
pub fn render_rosters(outcome: &SolveOutcome) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "driver_id",
            "driver_type",
            "day",
            "tour_instance_id",
            "block_id",
            "block_type",
            "start",
            "end",
            "work_min",
        ])
        .map_err(|e| SolveError::Validation(format!("rosters.csv: {e}")))?;

    for roster in &outcome.rosters {
        let driver_type = match roster.roster_type {
            RosterType::Fte => "FTE",
            RosterType::Pt => "PT",
        };
        for block in &roster.blocks {
            for tour in &block.tours {
                writer
                    .write_record([
                        roster.driver_id.as_str(),
                        driver_type,
                        tour.day.as_str(),
                        tour.id.as_str(),
                        block.id.as_str(),
                        block.block_type.as_str(),
                        &minutes_to_hhmm(tour.start_min),
                        &minutes_to_hhmm(tour.end_min),
                        &tour.duration_min().to_string(),
                    ])
                    .map_err(|e| SolveError::Validation(format!("rosters.csv: {e}")))?;
            }
        }
    }

    writer
        .into_inner()
        .map_err(|e| SolveError::Validation(format!("rosters.csv: {e}")))
}

/// Lexicographic entries, fixed timestamp, stored (uncompressed) data.
fn write_zip(files: &BTreeMap<String, Vec<u8>>) -> Result<Vec<u8>> {
    let timestamp = zip::DateTime::from_date_and_time(2026, 1, 1, 0, 0, 0)
        .map_err(|_| SolveError::Validation("fixed zip timestamp".to_string()))?;
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .last_modified_time(timestamp);

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| SolveError::Validation(format!("zip {name}: {e}")))?;
        writer
            .write_all(content)
            .map_err(|e| SolveError::Validation(format!("zip {name}: {e}")))?;
    }

    let cursor = writer
        .finish()
        .map_err(|e| SolveError::Validation(format!("zip finish: {e}")))?;
    Ok(cursor.into_inner())
}
