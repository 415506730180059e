#![forbid(unsafe_code)]

mod locations;
mod params;
mod render;

pub(crate) use locations::*;
