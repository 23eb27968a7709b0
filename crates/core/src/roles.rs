//! Well-known role names stored in the `user.role` field.
//!
//! Roles are compared as plain strings; any other value is accepted and
//! simply grants nothing beyond what callers check for.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";
