//! Anti-forgery state tokens
//!
//! A token is generated when a login begins, travels to the provider
//! and back in the `state` query parameter, and is compared with the
//! copy kept in the session when the callback arrives.

use base64::{Engine as _, engine::general_purpose};
use rand::RngCore;
use rand::rngs::OsRng;
use subtle::ConstantTimeEq;

use crate::context::RequestContext;

/// Raw entropy per state token
pub const STATE_BYTES: usize = 64;

/// Query parameter carrying the state token
pub const STATE_PARAM: &str = "state";

/// Generate a fresh state token
///
/// 64 bytes from the OS RNG, URL-safe base64 without padding:
/// always 86 characters.
pub fn generate() -> String {
    random_token(STATE_BYTES)
}

/// State token supplied by the caller on this request, if any
///
/// Never generates; see [`set_state`].
pub fn extract_incoming(ctx: &RequestContext) -> Option<String> {
    ctx.query_param(STATE_PARAM).map(str::to_owned)
}

/// State token carried by the current request
///
/// On a callback this is the token the provider echoed back.
pub fn read(ctx: &RequestContext) -> Option<&str> {
    ctx.query_param(STATE_PARAM)
}

/// State for a new login: the caller's token if supplied, else a fresh one
pub fn set_state(ctx: &RequestContext) -> String {
    extract_incoming(ctx).unwrap_or_else(generate)
}

/// Compare a presented token with the stored one in constant time
pub fn matches(presented: &str, stored: &str) -> bool {
    presented.as_bytes().ct_eq(stored.as_bytes()).into()
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
