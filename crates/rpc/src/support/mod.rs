#![forbid(unsafe_code)]

mod jsonrpc;
mod runtime;
mod time;

pub(crate) use jsonrpc::*;
pub(crate) use runtime::*;
pub(crate) use time::*;
