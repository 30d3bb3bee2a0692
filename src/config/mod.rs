use std::{
    collections::HashMap,
    env, fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use directories::BaseDirs;

/// KEY=value configuration: defaults, then `.datachatrc`, then environment
/// variables, later layers winning.
#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().flatten() {
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    if let Some((k, v)) = line.split_once('=') {
                        map.insert(k.trim().to_string(), v.trim().to_string());
                    }
                }
            }
        }

        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map, config_path }
    }

    /// Build a config from explicit pairs, bypassing files and environment.
    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert((*k).to_string(), (*v).to_string());
        }
        Self { inner: map, config_path: PathBuf::new() }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "OPENAI_API_KEY",
        "API_BASE_URL",
        "REQUEST_TIMEOUT",
        "DEFAULT_MODEL",
        "SAMPLE_ROWS",
        "PRETTIFY_MARKDOWN",
    ];

    KEYS.contains(&k) || k.starts_with("DATACHAT_") || k.starts_with("OPENAI_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("datachat").join(".datachatrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("DEFAULT_MODEL".into(), "gpt-4o".into());
    m.insert("API_BASE_URL".into(), "default".into());
    m.insert("SAMPLE_ROWS".into(), "5".into());
    m.insert("PRETTIFY_MARKDOWN".into(), "true".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_required_keys() {
        let cfg = Config::from_pairs(&[]);
        assert_eq!(cfg.get("DEFAULT_MODEL").as_deref(), Some("gpt-4o"));
        assert_eq!(cfg.get_usize("SAMPLE_ROWS"), Some(5));
        assert!(cfg.get_bool("PRETTIFY_MARKDOWN"));
    }

    #[test]
    fn explicit_pairs_override_defaults() {
        let cfg = Config::from_pairs(&[("SAMPLE_ROWS", "3")]);
        assert_eq!(cfg.get_usize("SAMPLE_ROWS"), Some(3));
    }
}
