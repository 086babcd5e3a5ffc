//! Principal and role domain types.

pub mod principal;
pub mod role;

pub use principal::Principal;
pub use role::UserRole;
