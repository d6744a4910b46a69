//! AWS backend for Meshflow.
//!
//! Implements [`meshflow_cloud::RegionClient`] on top of the EC2 API,
//! one client per region. Resources are discovered by their `Name` tag
//! plus a mesh tag, so a second converge run finds what the first one
//! built instead of creating duplicates.
//!
//! # Example
//!
//! ```ignore
//! use meshflow_cloud_aws::AwsRegionClient;
//!
//! let client = AwsRegionClient::connect("labnet", "ap-northeast-1").await;
//! let vpc = client.find_vpc("labnet-ap-northeast-1-vpc").await?;
//! ```

pub mod client;
pub mod tags;

mod error;

// Re-exports
pub use client::AwsRegionClient;
pub use tags::{TAG_MANAGED, TAG_MESH};
