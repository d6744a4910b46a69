//! Mapping EC2 service errors onto the [`CloudError`] taxonomy.
//!
//! EC2 reports everything as an error code plus a message. Only a handful
//! of codes change how the provisioner behaves (the resource is already
//! gone, or something still depends on it); every other code surfaces
//! verbatim as a rejection.

use aws_sdk_ec2::error::{ProvideErrorMetadata, SdkError};
use meshflow_cloud::{CloudError, ResourceKind};

/// Codes meaning the referenced resource does not exist any more.
/// Deletion paths treat these as success.
const NOT_FOUND_CODES: &[&str] = &[
    "InvalidVpcID.NotFound",
    "InvalidSubnetID.NotFound",
    "InvalidInternetGatewayID.NotFound",
    "InvalidRouteTableID.NotFound",
    "InvalidRoute.NotFound",
    "InvalidAssociationID.NotFound",
    "InvalidVpcPeeringConnectionID.NotFound",
    "InvalidGroup.NotFound",
    "InvalidPermission.NotFound",
    "InvalidInstanceID.NotFound",
];

/// Codes meaning another resource still references this one.
const DEPENDENCY_CODES: &[&str] = &["DependencyViolation"];

/// Code returned when an ingress rule already exists on a security group.
pub(crate) const DUPLICATE_RULE: &str = "InvalidPermission.Duplicate";

/// Extract the service error code, if the response carried one.
pub(crate) fn code_of<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    SdkError<E, R>: ProvideErrorMetadata,
{
    ProvideErrorMetadata::meta(err).code()
}

/// Map a failed EC2 call onto [`CloudError`].
pub(crate) fn classify<E, R>(kind: ResourceKind, name: &str, err: &SdkError<E, R>) -> CloudError
where
    SdkError<E, R>: ProvideErrorMetadata + std::fmt::Debug,
{
    let meta = ProvideErrorMetadata::meta(err);
    let code = meta.code().map(str::to_string);
    let message = match meta.message() {
        Some(message) => message.to_string(),
        // Dispatch and timeout failures carry no service message.
        None => format!("{err:?}"),
    };
    from_code(kind, name, code, message)
}

/// Classification from a bare error code, split out so it can be tested
/// without constructing SDK errors.
pub(crate) fn from_code(
    kind: ResourceKind,
    name: &str,
    code: Option<String>,
    message: String,
) -> CloudError {
    match code.as_deref() {
        Some(c) if NOT_FOUND_CODES.contains(&c) => CloudError::not_found(kind, name),
        Some(c) if DEPENDENCY_CODES.contains(&c) => CloudError::violation(kind, name, message),
        _ => CloudError::rejected(kind, name, code, message),
    }
}
