//! Seeded workloads and scenario drivers for the voxel edit sender.

pub mod scenarios;
pub mod workload;
