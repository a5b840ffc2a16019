//! Identity is owned by an external provider; this module only verifies the
//! bearer tokens it issues.

mod claims;
pub(crate) mod extractors;
pub mod jwt;

pub use extractors::AuthUser;
#[cfg(test)]
pub use jwt::JwtKeys;
