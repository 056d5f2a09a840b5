pub mod determinism;
pub mod drills;
pub mod golden_run;
pub mod proof_pack;

use std::path::Path;

use anyhow::Context;
use rostra_core::{Forecast, Tour};

/// Load and expand a canonical forecast JSON file.
pub fn load_forecast(path: &str) -> anyhow::Result<(Forecast, Vec<Tour>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading forecast file {path}"))?;
    let forecast = Forecast::from_json(&text)?;
    let tours = forecast.expand_tours()?;
    Ok((forecast, tours))
}

pub fn ensure_dir(path: &str) -> anyhow::Result<()> {
    std::fs::create_dir_all(Path::new(path))
        .with_context(|| format!("creating output directory {path}"))
}
