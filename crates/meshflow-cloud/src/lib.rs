//! Meshflow Cloud Control-Plane Abstraction
//!
//! This crate defines the boundary between the topology provisioner and the
//! cloud provider: a per-region client trait, typed resource records, the
//! peering-connection state machine, and the error taxonomy every operation
//! reports through. All side effects against the cloud go through
//! [`RegionClient`]; everything above it is pure sequencing.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  Meshflow CLI                    │
//! │              (mesh up/down/status)               │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │            meshflow-provisioner                  │
//! │     converge / teardown / status phases          │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               meshflow-cloud                     │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │        Control-Plane Abstraction          │   │
//! │  │  trait RegionClient { ... }               │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Typed records│  │ Bounded wait │            │
//! │  └──────────────┘  └──────────────┘            │
//! └─────────────────────────┬───────────────────────┘
//!                           │
//!                   ┌───────▼───────┐
//!                   │ cloud-aws     │
//!                   │ (aws-sdk-ec2) │
//!                   └───────────────┘
//! ```

pub mod client;
pub mod error;
pub mod types;
pub mod wait;

// Re-exports
pub use client::RegionClient;
pub use error::{CloudError, Result};
pub use types::{
    IgwInfo, InstanceInfo, InstanceState, PeeringInfo, PeeringState, ResourceKind, RouteInfo,
    RouteTableAssociation, RouteTableInfo, RouteTarget, RunInstanceRequest, SgInfo, SgRule,
    SubnetInfo, VpcInfo,
};
pub use wait::wait_until;
