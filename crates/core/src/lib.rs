#![forbid(unsafe_code)]

pub mod closure;
pub mod location;
