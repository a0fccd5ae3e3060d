use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// Where preferences and the log live
    pub fn state_dir() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            Some(
                PathBuf::from(home)
                    .join(".local")
                    .join("state")
                    .join("nazotimer"),
            )
        } else {
            ProjectDirs::from("", "", "nazotimer")
                .map(|proj_dirs| proj_dirs.data_local_dir().to_path_buf())
        }
    }

    pub fn prefs_path(state_dir: &Path) -> PathBuf {
        state_dir.join("prefs.json")
    }

    pub const LOG_FILE: &'static str = "nazotimer.log";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefs_live_in_state_dir() {
        let dir = Path::new("/tmp/nazo");
        assert_eq!(AppDirs::prefs_path(dir), PathBuf::from("/tmp/nazo/prefs.json"));
    }
}
