//! Configuration for shelf.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (SHELF_HOME, SHELF_EXPORT_DIR, SHELF_TRANSCRIPT_ENDPOINT)
//! 2. Config file (.shelf/config.yaml)
//! 3. Defaults (~/.shelf)
//!
//! Config file discovery:
//! - Searches current directory and parents for .shelf/config.yaml
//! - `paths.home` is relative to the .shelf/ directory, other paths to its parent

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::viewer::{TransportSettings, ViewerSettings, Volume};

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub transcript: TranscriptConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .shelf/)
    pub home: Option<String>,
    /// Where exported transcripts and downloads go
    pub exports: Option<String>,
    /// Alternative catalog JSON file
    pub catalog: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewerConfig {
    pub poll_interval_ms: Option<u64>,
    pub skip_seconds: Option<f64>,
    pub initial_volume: Option<i32>,
    pub initial_page: Option<u32>,
    /// Length of videos on the simulated platform
    pub video_duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptConfig {
    pub provider: Option<ProviderKind>,
    pub endpoint: Option<String>,
    pub mock_delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentsConfig {
    pub timeout_seconds: Option<u64>,
}

/// Transcript source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Mock,
    Http,
}

/// Resolved transcript settings
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSettings {
    pub provider: ProviderKind,
    pub endpoint: Option<String>,
    pub mock_delay: Duration,
    pub timeout: Duration,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Mock,
            endpoint: None,
            mock_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// State directory
    pub home: PathBuf,
    /// Export directory
    pub exports: PathBuf,
    /// Catalog JSON to use instead of the built-in samples
    pub catalog: Option<PathBuf>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub viewer: ViewerSettings,
    pub transcript: TranscriptSettings,
    pub document_timeout: Duration,
    pub video_duration: f64,
}

/// Environment overrides
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub exports: Option<String>,
    pub transcript_endpoint: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            home: std::env::var("SHELF_HOME").ok(),
            exports: std::env::var("SHELF_EXPORT_DIR").ok(),
            transcript_endpoint: std::env::var("SHELF_TRANSCRIPT_ENDPOINT").ok(),
        }
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".shelf").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to `base`
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Combine defaults, an optional config file and env overrides
fn resolve(
    default_home: PathBuf,
    config_path: Option<&Path>,
    file: ConfigFile,
    env: EnvOverrides,
) -> ResolvedConfig {
    // Directory holding config.yaml, and the project root above it
    let shelf_dir = config_path.and_then(Path::parent);
    let base_dir = shelf_dir.and_then(Path::parent);

    let home = match (env.home, shelf_dir, &file.paths.home) {
        (Some(home), _, _) => PathBuf::from(home),
        (None, Some(dir), Some(home)) => resolve_path(dir, home),
        _ => default_home,
    };

    let exports = match (env.exports, base_dir, &file.paths.exports) {
        (Some(exports), _, _) => PathBuf::from(exports),
        (None, Some(dir), Some(exports)) => resolve_path(dir, exports),
        _ => home.join("exports"),
    };

    let catalog = match (base_dir, &file.paths.catalog) {
        (Some(dir), Some(catalog)) => Some(resolve_path(dir, catalog)),
        (None, Some(catalog)) => Some(PathBuf::from(catalog)),
        _ => None,
    };

    let defaults = TransportSettings::default();
    let viewer = ViewerSettings {
        initial_page: file.viewer.initial_page.unwrap_or(1).max(1),
        transport: TransportSettings {
            poll_interval: file
                .viewer
                .poll_interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            skip_seconds: file.viewer.skip_seconds.unwrap_or(defaults.skip_seconds),
            initial_volume: file
                .viewer
                .initial_volume
                .map(Volume::new)
                .unwrap_or(defaults.initial_volume),
        },
    };

    let endpoint = env.transcript_endpoint.or(file.transcript.endpoint);
    let transcript_defaults = TranscriptSettings::default();
    let transcript = TranscriptSettings {
        // An endpoint alone is enough to switch to the HTTP source
        provider: file.transcript.provider.unwrap_or(if endpoint.is_some() {
            ProviderKind::Http
        } else {
            ProviderKind::Mock
        }),
        endpoint,
        mock_delay: file
            .transcript
            .mock_delay_ms
            .map(Duration::from_millis)
            .unwrap_or(transcript_defaults.mock_delay),
        timeout: file
            .transcript
            .timeout_seconds
            .map(Duration::from_secs)
            .unwrap_or(transcript_defaults.timeout),
    };

    ResolvedConfig {
        home,
        exports,
        catalog,
        config_file: config_path.map(Path::to_path_buf),
        viewer,
        transcript,
        document_timeout: Duration::from_secs(file.documents.timeout_seconds.unwrap_or(30)),
        video_duration: file.viewer.video_duration_seconds.unwrap_or(212.0).max(0.0),
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".shelf");

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => load_config_file(path)?,
        None => ConfigFile::default(),
    };

    Ok(resolve(
        default_home,
        config_file.as_deref(),
        file,
        EnvOverrides::from_env(),
    ))
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(temp: &TempDir, yaml: &str) -> PathBuf {
        let shelf_dir = temp.path().join(".shelf");
        std::fs::create_dir_all(&shelf_dir).unwrap();

        let config_path = shelf_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "{}", yaml).unwrap();
        config_path
    }

    #[test]
    fn test_defaults_without_file() {
        let config = resolve(
            PathBuf::from("/home/me/.shelf"),
            None,
            ConfigFile::default(),
            EnvOverrides::default(),
        );

        assert_eq!(config.home, PathBuf::from("/home/me/.shelf"));
        assert_eq!(config.exports, PathBuf::from("/home/me/.shelf/exports"));
        assert!(config.catalog.is_none());
        assert_eq!(config.viewer, ViewerSettings::default());
        assert_eq!(config.transcript, TranscriptSettings::default());
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            &temp,
            r#"
version: "1.0"
paths:
  exports: ./out
viewer:
  poll_interval_ms: 250
  skip_seconds: 5
  initial_volume: 180
transcript:
  provider: http
  endpoint: https://transcripts.example/api
  timeout_seconds: 3
"#,
        );

        let file = load_config_file(&path).unwrap();
        assert_eq!(file.version.as_deref(), Some("1.0"));
        assert_eq!(file.transcript.provider, Some(ProviderKind::Http));

        let config = resolve(
            PathBuf::from("/unused"),
            Some(&path),
            file,
            EnvOverrides::default(),
        );
        assert_eq!(config.exports, temp.path().join("out"));
        assert_eq!(
            config.viewer.transport.poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.viewer.transport.skip_seconds, 5.0);
        assert_eq!(config.viewer.transport.initial_volume.value(), 100);
        assert_eq!(config.transcript.timeout, Duration::from_secs(3));
        assert_eq!(config.config_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_env_overrides_win() {
        let file: ConfigFile = serde_yaml::from_str(
            r#"
paths:
  home: ./state
transcript:
  endpoint: https://from-file.example
"#,
        )
        .unwrap();

        let config = resolve(
            PathBuf::from("/default"),
            Some(Path::new("/project/.shelf/config.yaml")),
            file,
            EnvOverrides {
                home: Some("/env/home".to_string()),
                exports: Some("/env/exports".to_string()),
                transcript_endpoint: Some("https://from-env.example".to_string()),
            },
        );

        assert_eq!(config.home, PathBuf::from("/env/home"));
        assert_eq!(config.exports, PathBuf::from("/env/exports"));
        assert_eq!(
            config.transcript.endpoint.as_deref(),
            Some("https://from-env.example")
        );
        assert_eq!(config.transcript.provider, ProviderKind::Http);
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project");

        assert_eq!(
            resolve_path(&base, "./subdir"),
            PathBuf::from("/home/user/project/subdir")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
