pub mod candidate;
pub mod orchestrator;
pub mod simulator;

#[cfg(test)]
mod repair_tests;

pub use candidate::{find_candidates, CandidateDriver, CandidateResult};
pub use orchestrator::{
    churn_metrics, commit_payload_hash, is_frozen, propose_repairs, ChurnMetrics, ProposalKind,
    Reassignment, RepairOutcome, RepairProposal, RepairRequest,
};
pub use simulator::{simulate_violations, SimulatedViolations, ValidationMode};
