pub mod auth;
pub mod client_ip;
pub mod maybe_auth;
pub mod role;
