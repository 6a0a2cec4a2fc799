//! Clipper configuration.
//!
//! [`ClipperConfig`] can be built in code with [`ClipperConfig::builder`] or
//! loaded from a TOML file. Every field is optional in the file; missing
//! fields take their defaults.
//!
//! ```toml
//! default_attachment_folder = "Attachments"
//! attachment_folder = ""
//! fetch_images = true
//! debug = false
//!
//! [fetch]
//! timeout = 30
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::fetch::FetchConfig;
use crate::{Result, VaultclipError};

/// Settings for one clip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipperConfig {
    /// Folder created next to the note when no override is set (default: "Attachments").
    pub default_attachment_folder: String,

    /// Vault-relative attachment folder used for every note when non-empty (default: "").
    pub attachment_folder: String,

    /// Whether to download images and render them in the note (default: true).
    pub fetch_images: bool,

    /// Verbose logging (default: false).
    pub debug: bool,

    /// HTTP settings for page and image requests.
    pub fetch: FetchConfig,
}

impl Default for ClipperConfig {
    fn default() -> Self {
        Self {
            default_attachment_folder: "Attachments".to_string(),
            attachment_folder: String::new(),
            fetch_images: true,
            debug: false,
            fetch: FetchConfig::default(),
        }
    }
}

impl ClipperConfig {
    /// Creates a new builder for ClipperConfig.
    ///
    /// # Example
    ///
    /// ```rust
    /// use vaultclip_core::ClipperConfig;
    ///
    /// let config = ClipperConfig::builder()
    ///     .attachment_folder("MyResources/Images")
    ///     .fetch_images(false)
    ///     .build();
    /// assert!(!config.fetch_images);
    /// ```
    pub fn builder() -> ClipperConfigBuilder {
        ClipperConfigBuilder::new()
    }

    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| VaultclipError::ConfigError(e.to_string()))
    }

    /// Loads a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(VaultclipError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| VaultclipError::ConfigError(format!("{}: {}", path.display(), e)))
    }

    /// `{config dir}/vaultclip/config.toml`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vaultclip").join("config.toml"))
    }

    /// Loads an explicit path, or the default path if it exists, or defaults.
    ///
    /// An explicit path that does not exist is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::load(&path),
                None => Ok(Self::default()),
            },
        }
    }

    /// Serializes the config as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VaultclipError::ConfigError(e.to_string()))
    }
}

/// Builder for ClipperConfig.
pub struct ClipperConfigBuilder {
    config: ClipperConfig,
}

impl ClipperConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ClipperConfig::default() }
    }

    /// Sets the per-note default attachment folder.
    pub fn default_attachment_folder(mut self, value: impl Into<String>) -> Self {
        self.config.default_attachment_folder = value.into();
        self
    }

    /// Sets the vault-wide attachment folder override.
    pub fn attachment_folder(mut self, value: impl Into<String>) -> Self {
        self.config.attachment_folder = value.into();
        self
    }

    pub fn fetch_images(mut self, value: bool) -> Self {
        self.config.fetch_images = value;
        self
    }

    pub fn debug(mut self, value: bool) -> Self {
        self.config.debug = value;
        self
    }

    /// Sets the HTTP request timeout in seconds.
    pub fn timeout(mut self, value: u64) -> Self {
        self.config.fetch.timeout = value;
        self
    }

    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Builds the config.
    pub fn build(self) -> ClipperConfig {
        self.config
    }
}

impl Default for ClipperConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClipperConfig::default();
        assert_eq!(config.default_attachment_folder, "Attachments");
        assert!(config.attachment_folder.is_empty());
        assert!(config.fetch_images);
        assert!(!config.debug);
        assert_eq!(config.fetch.timeout, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClipperConfig::from_toml_str(
            r#"
            attachment_folder = "MyResources/Images"

            [fetch]
            timeout = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.attachment_folder, "MyResources/Images");
        assert_eq!(config.default_attachment_folder, "Attachments");
        assert_eq!(config.fetch.timeout, 5);
        assert!(config.fetch.user_agent.contains("Vaultclip"));
    }

    #[test]
    fn test_invalid_toml() {
        let result = ClipperConfig::from_toml_str("fetch_images = \"maybe\"");
        assert!(matches!(result, Err(VaultclipError::ConfigError(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "fetch_images = false\ndebug = true\n").unwrap();

        let config = ClipperConfig::load_or_default(Some(&path)).unwrap();
        assert!(!config.fetch_images);
        assert!(config.debug);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let result = ClipperConfig::load_or_default(Some(Path::new("/nonexistent/vaultclip.toml")));
        assert!(matches!(result, Err(VaultclipError::FileNotFound(_))));
    }

    #[test]
    fn test_builder_and_toml_round_trip() {
        let config = ClipperConfig::builder().default_attachment_folder("assets").timeout(10).debug(true).build();

        let text = config.to_toml_string().unwrap();
        assert_eq!(ClipperConfig::from_toml_str(&text).unwrap(), config);
    }
}
