use thiserror::Error;

/// Error taxonomy carried through every layer.
///
/// Solver layers return these as values for expected failures
/// (infeasibility, timeout); they never panic for them.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Infeasible instance: {0}")]
    InfeasibleInstance(String),

    #[error("Solver timeout: {0}")]
    SolverTimeout(String),

    #[error("Illegal plan transition: {from} -> {to}")]
    StateMachineViolation { from: String, to: String },

    #[error("Freeze violation: {0}")]
    FreezeViolation(String),

    #[error("Idempotency key {key} reused with a different payload")]
    IdempotencyConflict { key: String },

    #[error("Determinism broken: {unique_hashes} distinct output hashes over {runs} runs")]
    DeterminismBroken { unique_hashes: usize, runs: usize },

    #[error("Integrity fault: {0}")]
    IntegrityFault(String),
}

impl SolveError {
    /// Stable machine-readable code for the CLI error line.
    pub fn error_code(&self) -> &'static str {
        match self {
            SolveError::Validation(_) => "VALIDATION_ERROR",
            SolveError::InfeasibleInstance(_) => "INFEASIBLE_INSTANCE",
            SolveError::SolverTimeout(_) => "SOLVER_TIMEOUT",
            SolveError::StateMachineViolation { .. } => "STATE_MACHINE_VIOLATION",
            SolveError::FreezeViolation(_) => "FREEZE_VIOLATION",
            SolveError::IdempotencyConflict { .. } => "IDEMPOTENCY_KEY_MISMATCH",
            SolveError::DeterminismBroken { .. } => "DETERMINISM_BROKEN",
            SolveError::IntegrityFault(_) => "INTEGRITY_FAULT",
        }
    }
}

pub type Result<T> = std::result::Result<T, SolveError>;
