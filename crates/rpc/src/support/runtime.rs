#![forbid(unsafe_code)]

use std::path::PathBuf;

pub(crate) const STORAGE_DIR_ENV: &str = "LOCATIONS_STORAGE_DIR";
pub(crate) const LOG_ENV: &str = "LOCATIONS_LOG";
const DEFAULT_STORAGE_DIR: &str = ".locations";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RuntimeConfig {
    pub(crate) storage_dir: PathBuf,
    pub(crate) log_filter: String,
}

impl RuntimeConfig {
    pub(crate) fn from_process() -> Self {
        let args = std::env::args().skip(1).collect::<Vec<_>>();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Flags win over environment variables, which win over defaults.
    pub(crate) fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            storage_dir: parse_storage_dir(args, &env),
            log_filter: parse_log_filter(args, &env),
        }
    }
}

fn flag_value(args: &[String], flag: &str) -> Option<String> {
    let mut found = None;
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg.as_str() == flag
            && let Some(value) = iter.next()
        {
            found = Some(value.clone());
        } else if let Some(value) = arg
            .strip_prefix(flag)
            .and_then(|rest| rest.strip_prefix('='))
        {
            found = Some(value.to_string());
        }
    }
    found
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_storage_dir(args: &[String], env: &impl Fn(&str) -> Option<String>) -> PathBuf {
    non_empty(flag_value(args, "--storage-dir"))
        .or_else(|| non_empty(env(STORAGE_DIR_ENV)))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
}

pub(crate) fn parse_log_filter(args: &[String], env: &impl Fn(&str) -> Option<String>) -> String {
    non_empty(flag_value(args, "--log"))
        .or_else(|| non_empty(env(LOG_ENV)))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}
