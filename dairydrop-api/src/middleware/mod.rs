/// Middleware modules for the API server
///
/// - `security`: helmet-style response headers
/// - `rate_limit`: per-client token bucket

pub mod rate_limit;
pub mod security;
