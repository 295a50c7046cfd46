use std::env;
use std::path::PathBuf;

/// Current version of the persisted data layout
pub const DATA_VERSION: &str = "1.0.0";

/// Get the path to the Guichet directory (~/.guichet)
pub fn guichet_dir() -> PathBuf {
    // First try HOME environment variable (useful for tests)
    if let Ok(home) = env::var("HOME") {
        PathBuf::from(home).join(".guichet")
    } else {
        // Fall back to dirs crate for normal usage
        dirs::home_dir()
            .expect("Unable to get home directory")
            .join(".guichet")
    }
}

/// Get the path to the SQLite database file (~/.guichet/guichet.db)
pub fn database_file() -> PathBuf {
    guichet_dir().join("guichet.db")
}

/// Get the path to the attachment store directory (~/.guichet/attachments)
pub fn attachments_dir() -> PathBuf {
    guichet_dir().join("attachments")
}
