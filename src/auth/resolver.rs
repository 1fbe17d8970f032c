//! Which provider a request refers to

use crate::context::RequestContext;
use crate::error::{AppError, Result};

/// Name of the override local, path segment and query parameter
pub const PROVIDER_KEY: &str = "provider";

/// Request extension naming the provider, set by upstream middleware
///
/// Picked up by the [`RequestContext`] extractor as an override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderOverride(pub String);

/// Attach a provider override to this request
pub fn with_provider(ctx: &mut RequestContext, provider: impl Into<String>) {
    ctx.set_local(PROVIDER_KEY, provider);
}

/// Resolve the provider for this request
///
/// First non-empty of: override, `:provider` path segment,
/// `provider` query parameter.
///
/// # Errors
/// `ProviderNotFound` if none is set
pub fn resolve(ctx: &RequestContext) -> Result<String> {
    ctx.local(PROVIDER_KEY)
        .filter(|name| !name.is_empty())
        .or_else(|| ctx.path_param(PROVIDER_KEY))
        .or_else(|| ctx.query_param(PROVIDER_KEY))
        .map(str::to_owned)
        .ok_or(AppError::ProviderNotFound)
}
