#![forbid(unsafe_code)]

mod stdio;

pub(crate) use stdio::*;
