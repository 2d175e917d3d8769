use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the lifetime timer table inside the storage directory.
pub const LIFETIME_FILE: &str = "lifetime.json";
/// Name of the vertical expansion table inside the storage directory.
pub const VERTICAL_FILE: &str = "vertical.json";
/// Name of the flag rental table inside the storage directory.
pub const FLAGS_FILE: &str = "flags.json";
/// Name of the outline record file inside the storage directory.
pub const OUTLINES_FILE: &str = "outlines.bin";
/// Name of the optional configuration file inside the storage directory.
pub const CONFIG_FILE: &str = "config.json";

/// Create the storage directory if it does not exist, and make sure it is a directory if it does.
pub fn prepare_storage_dir(dir: &Path) -> io::Result<()> {
    if !dir.is_dir() {
        info!("Create storage directory: {}", dir.display());
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

/// This returns the default storage directory for plotkeeper on unix, `$HOME/.plotkeeper`.
#[cfg(not(target_os = "windows"))]
pub fn get_storage_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(|home| {
        let mut d = PathBuf::from(home);
        d.push(".plotkeeper");
        d
    })
}

#[cfg(target_os = "windows")]
pub fn get_storage_dir() -> Option<PathBuf> {
    env::var_os("APPDATA").map(|appdata| {
        let mut d = PathBuf::from(appdata);
        d.push("plotkeeper");
        d
    })
}

/// Return the formal name of this executable.
pub fn get_client_name() -> String {
    "Plotkeeper v".to_owned() + env!("CARGO_PKG_VERSION")
}
