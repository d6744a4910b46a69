//! Tags stamped on every resource Meshflow creates.
//!
//! Discovery runs the other way round: the `find_*` calls filter on
//! `tag:Name` plus the mesh tag, so two meshes can share an account
//! without claiming each other's resources.

use aws_sdk_ec2::types::{Filter, ResourceType, Tag, TagSpecification};

/// Tag key marking a resource as managed by Meshflow.
pub const TAG_MANAGED: &str = "meshflow:managed";

/// Value stored under [`TAG_MANAGED`].
pub const TAG_MANAGED_VALUE: &str = "true";

/// Tag key carrying the mesh the resource belongs to.
pub const TAG_MESH: &str = "meshflow:mesh";

/// Tag specification applied at create time: `Name`, the managed marker
/// and the owning mesh.
pub(crate) fn tag_spec(resource_type: ResourceType, mesh: &str, name: &str) -> TagSpecification {
    TagSpecification::builder()
        .resource_type(resource_type)
        .tags(Tag::builder().key("Name").value(name).build())
        .tags(
            Tag::builder()
                .key(TAG_MANAGED)
                .value(TAG_MANAGED_VALUE)
                .build(),
        )
        .tags(Tag::builder().key(TAG_MESH).value(mesh).build())
        .build()
}

/// Filters matching a resource previously created with [`tag_spec`].
pub(crate) fn name_filters(mesh: &str, name: &str) -> Vec<Filter> {
    vec![
        Filter::builder().name("tag:Name").values(name).build(),
        Filter::builder()
            .name(format!("tag:{TAG_MESH}"))
            .values(mesh)
            .build(),
    ]
}
