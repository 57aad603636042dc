use std::env;
use std::path::PathBuf;

pub const DEFAULT_RECIPES_PATH: &str = "data/recipes.json";
pub const DEFAULT_ASSETS_DIR: &str = ".";

/// Settings read from the environment (and `.env`). The bot token itself is
/// picked up by `Bot::from_env` from `TELOXIDE_TOKEN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub recipes_path: PathBuf,
    pub assets_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let path_or = |key: &str, default: &str| {
            let value = lookup(key).filter(|v| !v.is_empty());
            PathBuf::from(value.unwrap_or_else(|| default.to_string()))
        };
        Config {
            recipes_path: path_or("RECIPES_PATH", DEFAULT_RECIPES_PATH),
            assets_dir: path_or("ASSETS_DIR", DEFAULT_ASSETS_DIR),
        }
    }
}
