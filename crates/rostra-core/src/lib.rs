pub mod audit;
pub mod config;
pub mod determinism;
pub mod domain;
pub mod forecast;
pub mod hash;
pub mod ports;
pub mod proofpack;
pub mod repair;
pub mod solver;

// Re-export commonly used types
pub use config::SolverConfig;
pub use domain::{
    sort_assignments,
    AbortReason,
    Assignment,
    Block,
    BlockInfo,
    BlockRules,
    BlockType,
    ColumnSignature,
    DriverRoster,
    PauseZone,
    PlanSnapshot,
    PlanStatus,
    PlanVersion,
    Result,
    RosterColumn,
    RosterType,
    SlotState,
    SolveError,
    Tour,
    Weekday,
    DAY_MINUTES,
};

pub use audit::{can_release, run_audits, AuditCheckKind, AuditReport, AuditStatus};

pub use forecast::{canonical_forecast_text, input_hash, Forecast, ForecastTour};

pub use solver::{solve_forecast, SolveKpis, SolveOutcome, SolveStatus};

pub use determinism::{ensure_deterministic, prove_determinism, DeterminismReport};

pub use repair::{
    churn_metrics, commit_payload_hash, propose_repairs, ChurnMetrics, RepairOutcome,
    RepairProposal, RepairRequest, ValidationMode,
};

pub use proofpack::{build_proof_pack, verify_proof_pack, ProofPackMeta, VerifyReport};

pub use ports::{
    ArtifactMetadata, ArtifactStore, NewPlanVersion, PlanRepository, RepairCommitRequest,
    RepairCommitResult,
};
