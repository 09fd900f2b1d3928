use std::path::Path;

use tracing::{info, warn};

/// Layered configuration: shared defaults, then the profile file, then
/// local secrets. Later files override earlier ones.
pub fn load_environment() -> Result<(), Box<dyn std::error::Error>> {
    let profile = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "development".to_string());
    let profile_file = match profile.as_str() {
        "production" => "config/prod.env",
        _ => "config/dev.env",
    };

    for path in ["config/common.env", profile_file, ".secrets.env"] {
        load_env_file(path)?;
    }

    Ok(())
}

fn load_env_file(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if !Path::new(path).exists() {
        warn!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
