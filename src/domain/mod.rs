//! Pure core of the AMI roll-forward: name grammar, catalog reconciliation,
//! grouping, synthesis, planning, and the convergence monitor.
//!
//! Nothing here talks to kubectl or aws directly; see `ports`.

pub mod catalog;
pub mod error;
pub mod image_name;
pub mod monitor;
pub mod planner;
pub mod ports;
pub mod registry;
pub mod rollout;
pub mod synthesizer;
pub mod types;
