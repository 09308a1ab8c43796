use std::path::PathBuf;

use anyhow::{Result, anyhow};
use mint::Vector3;

/// Returns the directory where this mod keeps its configuration and logs.
///
/// This is the `UserData` directory the mod loader creates next to the game
/// executable, which is shared by every mod it loads.
pub fn mod_directory() -> Result<PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe
        .parent()
        .ok_or_else(|| anyhow!("game executable {} has no parent directory", exe.display()))?;
    Ok(dir.join("UserData"))
}

/// Returns the straight-line distance between two world positions.
pub fn distance(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    let (x, y, z) = (a.x - b.x, a.y - b.y, a.z - b.z);
    (x * x + y * y + z * z).sqrt()
}
