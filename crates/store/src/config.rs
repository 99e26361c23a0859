use std::path::PathBuf;

/// Store configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding persisted snapshot blobs.
    pub snapshot_dir: PathBuf,
    /// Whether live subscriptions persist each snapshot to disk.
    pub persist_snapshots: bool,
}

impl StoreConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var            | Default               |
    /// |--------------------|-----------------------|
    /// | `SNAPSHOT_DIR`     | `.crewlink/snapshots` |
    /// | `SNAPSHOT_PERSIST` | `true`                |
    pub fn from_env() -> Self {
        let snapshot_dir = std::env::var("SNAPSHOT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".crewlink/snapshots"));

        let persist_snapshots = std::env::var("SNAPSHOT_PERSIST")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        Self {
            snapshot_dir,
            persist_snapshots,
        }
    }
}
