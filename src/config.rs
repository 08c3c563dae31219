//! Runtime configuration from `VERSES_*` environment variables.
//!
//! Every setting has a default, so an empty environment is a valid setup.
//! Unparseable numbers fall back to the default with a warning.

use crate::hover::HoverTimings;
use crate::session::KeyBindings;
use crate::{BIBLE_PATH, BIND_ADDR, DB_PATH, SERVER_URL};
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL the lookup client queries.
    pub server_url: String,
    /// Address the lookup service listens on.
    pub bind_addr: String,
    pub bible_path: PathBuf,
    pub db_path: PathBuf,
    /// Directory holding the service executable.
    pub plugin_dir: PathBuf,
    pub timings: HoverTimings,
    pub keys: KeyBindings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: SERVER_URL.to_string(),
            bind_addr: BIND_ADDR.to_string(),
            bible_path: PathBuf::from(BIBLE_PATH),
            db_path: PathBuf::from(DB_PATH),
            plugin_dir: PathBuf::from("."),
            timings: HoverTimings::default(),
            keys: KeyBindings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `lookup` returns `None` for unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let millis = |name: &str, default: Duration| match var(name) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    warn!("Ignoring {}={:?}: not a number of milliseconds", name, raw);
                    default
                }
            },
            None => default,
        };
        let key = |name: &str, default: String| var(name).map(|k| k.to_lowercase()).unwrap_or(default);

        Self {
            server_url: var("VERSES_SERVER_URL").unwrap_or(defaults.server_url),
            bind_addr: var("VERSES_BIND").unwrap_or(defaults.bind_addr),
            bible_path: var("VERSES_BIBLE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.bible_path),
            db_path: var("VERSES_DB_PATH").map(PathBuf::from).unwrap_or(defaults.db_path),
            plugin_dir: var("VERSES_PLUGIN_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.plugin_dir),
            timings: HoverTimings {
                open_delay: millis("VERSES_OPEN_DELAY_MS", defaults.timings.open_delay),
                close_delay: millis("VERSES_CLOSE_DELAY_MS", defaults.timings.close_delay),
                scroll_quiet: millis("VERSES_SCROLL_QUIET_MS", defaults.timings.scroll_quiet),
            },
            keys: KeyBindings {
                save: key("VERSES_SAVE_KEY", defaults.keys.save),
                delete: key("VERSES_DELETE_KEY", defaults.keys.delete),
                undo: key("VERSES_UNDO_KEY", defaults.keys.undo),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config, Config::default());
        assert_eq!(config.server_url, "http://127.0.0.1:8000");
        assert_eq!(config.timings.open_delay, Duration::from_millis(600));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("VERSES_SERVER_URL", "http://localhost:9000"),
            ("VERSES_DB_PATH", "/tmp/verses"),
            ("VERSES_OPEN_DELAY_MS", "250"),
            ("VERSES_SAVE_KEY", "S"),
        ]);
        assert_eq!(config.server_url, "http://localhost:9000");
        assert_eq!(config.db_path, PathBuf::from("/tmp/verses"));
        assert_eq!(config.timings.open_delay, Duration::from_millis(250));
        assert_eq!(config.keys.save, "s");
        assert_eq!(config.keys.delete, "d");
    }

    #[test]
    fn test_bad_numbers_and_blanks_fall_back() {
        let config = config(&[("VERSES_CLOSE_DELAY_MS", "soon"), ("VERSES_BIND", "  ")]);
        assert_eq!(config.timings.close_delay, Duration::from_millis(300));
        assert_eq!(config.bind_addr, "127.0.0.1:8000");
    }
}
