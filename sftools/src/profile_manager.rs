use std::{
    fs,
    io,
    io::{Error, ErrorKind},
    path::PathBuf,
};

use chrono::{DateTime, Utc};
use dirs::home_dir;
use log::info;
use serde::{Deserialize, Serialize};

/// Saved server profiles, kept in `~/.sftools/config.toml`.
#[derive(Serialize, Deserialize, Default)]
pub struct UserData {
    pub profiles: Vec<Profile>,
}

impl UserData {
    pub fn profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Replaces the profile with the same name, or adds it.
    pub fn upsert(&mut self, profile: Profile) {
        match self.profiles.iter_mut().find(|p| p.name == profile.name) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Profile {
    pub name: String,
    pub server: String,
    pub username: String,
    pub access_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// The saved admin token, if it has not expired yet.
    pub fn valid_token(&self) -> Option<&str> {
        match self.expires_at {
            Some(expiry) if expiry <= Utc::now() => None,
            _ => self.access_token.as_deref(),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Profile {
            name: "default".to_string(),
            server: "http://localhost:8360".to_string(),
            username: "admin".to_string(),
            access_token: None,
            expires_at: None,
        }
    }
}

pub fn get_config_path() -> io::Result<PathBuf> {
    let home = home_dir().ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Home directory not found"))?;
    let config_dir = home.join(".sftools");
    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
        set_permissions(&config_dir, 0o700)?;
    }
    let config_file = config_dir.join("config.toml");
    if !config_file.exists() {
        info!("Creating default config file");
        let config_str =
            toml::to_string(&UserData::default()).map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
        fs::write(&config_file, config_str)?;
        set_permissions(&config_file, 0o600)?;
    }
    Ok(config_file)
}

fn set_permissions(path: &PathBuf, perms: u32) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut permissions = fs::metadata(path)?.permissions();
        // Tokens are bearer credentials: owner access only
        permissions.set_mode(perms);
        fs::set_permissions(path, permissions)?;
    }
    #[cfg(not(unix))]
    let _ = (path, perms);
    Ok(())
}

pub fn read_config() -> io::Result<UserData> {
    let config_path = get_config_path()?;
    let config_str = fs::read_to_string(config_path)?;
    let config: UserData =
        toml::from_str(&config_str).map_err(|e| Error::new(ErrorKind::InvalidData, e.to_string()))?;
    Ok(config)
}

pub fn write_config(config: &UserData) -> anyhow::Result<()> {
    let config_path = get_config_path()?;
    let config_str = toml::to_string(config)?;
    fs::write(config_path, config_str)?;
    Ok(())
}
