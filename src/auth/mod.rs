//! OAuth login flow
//!
//! Handles:
//! - Anti-forgery state tokens
//! - Provider boundary, registry and a stub provider
//! - Provider resolution per request
//! - The begin / complete / logout lifecycle
//! - HTTP endpoints

mod faux;
mod flow;
mod handlers;
mod provider;
mod resolver;
pub mod state;

pub use faux::FauxProvider;
pub use flow::{AuthSession, Authenticator, CompleteAuthOptions, session_key};
pub use handlers::auth_router;
pub use provider::{Provider, ProviderError, ProviderRegistry, User};
pub use resolver::{PROVIDER_KEY, ProviderOverride, resolve as resolve_provider, with_provider};
