//! Environment and file-name constants shared by the config loader and the CLI.

// Environment variables
pub const CONFIG_PATH_ENV: &str = "SHOP_ACTIVITY_CONFIG";
pub const STORAGE_BACKEND_ENV: &str = "SHOP_ACTIVITY_STORAGE";
pub const DB_PATH_ENV: &str = "SHOP_ACTIVITY_DB_PATH";

// Defaults used when no config file is present
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_DB_PATH: &str = "data/activity.db";
pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_FILE: &str = "shop_activity.log";
pub const DEFAULT_LOG_DIRECTIVE: &str = "shop_activity=info";

/// Number of rows `recent` returns when no limit is given on the command line
pub const DEFAULT_RECENT_LIMIT: usize = 20;
