pub mod monitoring;
pub mod rate_limit;
pub mod security;
