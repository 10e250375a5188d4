//! Request handlers

pub mod moisture;
pub mod plants;
