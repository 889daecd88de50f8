use std::path::PathBuf;
use std::sync::OnceLock;

static VIBECRAFT_HOME: OnceLock<PathBuf> = OnceLock::new();

/// Returns the VibeCraft home directory (`~/.vibecraft/`).
/// Supports a `$VIBECRAFT_HOME` env override. Cached via `OnceLock`.
pub fn vibecraft_home() -> &'static PathBuf {
    VIBECRAFT_HOME.get_or_init(|| {
        if let Ok(val) = std::env::var("VIBECRAFT_HOME") {
            let p = PathBuf::from(val);
            if !p.as_os_str().is_empty() {
                return p;
            }
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vibecraft")
    })
}

/// `~/.vibecraft/logs/`
pub fn logs_dir() -> PathBuf {
    vibecraft_home().join("logs")
}
