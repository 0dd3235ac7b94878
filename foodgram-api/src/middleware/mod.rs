/// Middleware for the API server
///
/// Authentication lives in `foodgram_shared::auth::middleware`; only
/// response hardening is specific to the HTTP server.

pub mod security;
