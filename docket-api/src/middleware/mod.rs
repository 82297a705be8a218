/// Middleware modules for the API server
///
/// Authentication middleware lives in `docket_shared::auth::middleware`;
/// this module holds the HTTP-only layers.

pub mod security;
