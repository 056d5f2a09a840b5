pub mod artifact_store;
pub mod plan_repository;

pub use artifact_store::{ArtifactMetadata, ArtifactStore};
pub use plan_repository::{
    NewPlanVersion, PlanRepository, RepairCommitRequest, RepairCommitResult,
};
