use clap::{Parser, Subcommand};

mod commands;
mod exit;

/// Rostra - deterministic workforce rostering engine
#[derive(Parser)]
#[command(name = "rostra")]
#[command(about = "Deterministic rostering: solve, audit, publish, repair, prove", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve a forecast and write the golden-run artifact set
    GenerateGoldenRun {
        /// Canonical forecast JSON file
        #[arg(long)]
        forecast: String,
        /// Output directory for matrix.csv, rosters.csv, kpis.json, metadata.json
        #[arg(long, default_value = "golden_run")]
        out: String,
        /// Solver seed
        #[arg(long, default_value_t = 94)]
        seed: u32,
    },
    /// Solve and export the verifiable evidence pack ZIP
    ExportProofPack {
        #[arg(long)]
        forecast: String,
        #[arg(long, default_value = "artifacts")]
        out: String,
        #[arg(long, default_value_t = 94)]
        seed: u32,
        /// Plan id stamped into metadata (defaults to 1 for ad-hoc runs)
        #[arg(long, default_value_t = 1)]
        plan_id: i64,
        #[arg(long, default_value = "wien")]
        tenant: String,
        #[arg(long, default_value = "hub-1")]
        site: String,
    },
    /// Verify an evidence pack: recompute every checksum
    VerifyProofPack {
        /// Path to the evidence pack ZIP
        zip: String,
    },
    /// Gate H1: publish a baseline, mark drivers absent, repair, audit
    RunSickCallDrill {
        #[arg(long)]
        forecast: String,
        #[arg(long, default_value = "artifacts/drills")]
        out: String,
        #[arg(long, default_value_t = 94)]
        seed: u32,
        /// How many drivers to mark absent
        #[arg(long, default_value_t = 1)]
        absent_count: usize,
        /// Plan database (in-memory by default; the drill is self-contained)
        #[arg(long, default_value = ":memory:")]
        db: String,
    },
    /// Gate H2: prove the freeze window blocks instead of warns
    RunFreezeWindowDrill {
        #[arg(long)]
        forecast: String,
        #[arg(long, default_value = "artifacts/drills")]
        out: String,
        #[arg(long, default_value_t = 94)]
        seed: u32,
        #[arg(long, default_value = ":memory:")]
        db: String,
    },
    /// Solve repeatedly and require identical output hashes
    DeterminismProof {
        #[arg(long)]
        forecast: String,
        #[arg(long, default_value_t = 94)]
        seed: u32,
        #[arg(long, default_value_t = 3)]
        runs: usize,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let code = match cli.command {
        Commands::GenerateGoldenRun { forecast, out, seed } => {
            commands::golden_run::run(&forecast, &out, seed)
        }
        Commands::ExportProofPack {
            forecast,
            out,
            seed,
            plan_id,
            tenant,
            site,
        } => commands::proof_pack::export(&forecast, &out, seed, plan_id, &tenant, &site),
        Commands::VerifyProofPack { zip } => commands::proof_pack::verify(&zip),
        Commands::RunSickCallDrill {
            forecast,
            out,
            seed,
            absent_count,
            db,
        } => commands::drills::sick_call(&forecast, &out, seed, absent_count, &db).await,
        Commands::RunFreezeWindowDrill {
            forecast,
            out,
            seed,
            db,
        } => commands::drills::freeze_window(&forecast, &out, seed, &db).await,
        Commands::DeterminismProof {
            forecast,
            seed,
            runs,
        } => commands::determinism::run(&forecast, seed, runs),
    };

    std::process::exit(code);
}
