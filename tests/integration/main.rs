//! End-to-end tests: the run coordinator, tracking store and scheduler
//! wired together over in-memory collaborators.

mod mock_collaborators;

mod cycle;
mod scheduling;
