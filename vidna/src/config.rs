use anyhow::{Context, Result, bail};
use camera::CameraConfig;
use derivative::Derivative;
use filter_gen::APIConfig;
use log::{debug, info};
use once_cell::sync::Lazy;
use platform_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

pub const APP_NAME: &str = "vidna";

/// Takes precedence over `api.api_key` when set and non-empty.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

static CONFIG: Lazy<Mutex<Config>> = Lazy::new(|| Mutex::new(Config::default()));

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(skip)]
    pub db_path: PathBuf,

    #[serde(skip)]
    pub is_first_run: bool,

    #[serde(default)]
    pub api: Api,

    #[serde(default)]
    pub camera: Camera,

    #[serde(default)]
    pub pipeline: Pipeline,

    #[serde(default)]
    pub output: Output,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Api {
    #[derivative(Default(value = "filter_gen::OPENROUTER_BASE_URL.to_string()"))]
    pub base_url: String,

    #[derivative(Default(value = "filter_gen::DEFAULT_MODEL.to_string()"))]
    pub model: String,

    #[derivative(Default(value = "filter_gen::DEFAULT_VISION_MODEL.to_string()"))]
    pub vision_model: String,

    pub api_key: String,

    #[derivative(Default(value = "0.3"))]
    pub temperature: f32,

    #[derivative(Default(value = "60"))]
    pub timeout_secs: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Camera {
    /// Empty picks the first working camera.
    pub name: String,

    #[derivative(Default(value = "30"))]
    pub fps: u32,

    pub width: Option<u32>,
    pub height: Option<u32>,

    #[derivative(Default(value = "true"))]
    pub mirror_horizontal: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Derivative)]
#[derivative(Default)]
#[serde(default)]
pub struct Pipeline {
    #[derivative(Default(value = "true"))]
    pub noise_reduction: bool,

    #[derivative(Default(value = "photo_filter::export::DEFAULT_JPEG_QUALITY"))]
    pub jpeg_quality: u8,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct Output {
    pub save_dir: String,
}

impl Api {
    pub fn key(&self) -> String {
        self.key_with_env(std::env::var(API_KEY_ENV).ok())
    }

    fn key_with_env(&self, env_key: Option<String>) -> String {
        env_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.api_key.trim().to_string())
    }

    pub fn has_key(&self) -> bool {
        !self.key().is_empty()
    }

    pub fn to_api_config(&self) -> APIConfig {
        APIConfig {
            api_base_url: self.base_url.clone(),
            api_model: self.model.clone(),
            api_vision_model: self.vision_model.clone(),
            api_key: self.key(),
            temperature: Some(self.temperature),
            timeout_secs: self.timeout_secs,
        }
    }
}

impl Camera {
    pub fn to_camera_config(&self) -> CameraConfig {
        let config = CameraConfig::default()
            .with_fps(self.fps)
            .with_mirror_horizontal(self.mirror_horizontal);

        match (self.width, self.height) {
            (Some(w), Some(h)) => config.with_width(w).with_height(h),
            _ => config,
        }
    }
}

impl Config {
    pub fn init(&mut self) -> Result<()> {
        let app_dirs =
            AppDirs::new(Some(APP_NAME), true).context("no config directory on this platform")?;
        self.init_in(&app_dirs.config_dir, &app_dirs.data_dir)
    }

    fn init_in(&mut self, config_dir: &Path, data_dir: &Path) -> Result<()> {
        self.config_path = config_dir.join(format!("{APP_NAME}.toml"));
        self.db_path = data_dir.join(format!("{APP_NAME}.db"));

        fs::create_dir_all(config_dir)?;
        fs::create_dir_all(data_dir)?;

        let default_save_dir = data_dir.join("captures").to_string_lossy().to_string();
        if self.output.save_dir.is_empty() {
            self.output.save_dir = default_save_dir.clone();
        }

        self.load().with_context(|| "load config file failed")?;

        if self.output.save_dir.is_empty() {
            self.output.save_dir = default_save_dir;
        }

        if self.is_first_run {
            info!("wrote default config to {}", self.config_path.display());
        }
        debug!("{:?}", self);
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        match fs::read_to_string(&self.config_path) {
            Ok(text) => match toml::from_str::<Config>(&text) {
                Ok(mut c) => {
                    c.config_path = self.config_path.clone();
                    c.db_path = self.db_path.clone();
                    c.is_first_run = self.is_first_run;
                    *self = c;
                    Ok(())
                }
                Err(e) => {
                    log::warn!("invalid config {}: {e}", self.config_path.display());
                    self.is_first_run = true;

                    let mut bak_file = self.config_path.clone().into_os_string();
                    bak_file.push(".bak");
                    _ = fs::copy(&self.config_path, bak_file);

                    self.save()
                }
            },
            Err(_) => {
                self.is_first_run = true;
                self.save()
            }
        }
    }

    pub fn save(&self) -> Result<()> {
        match toml::to_string_pretty(self) {
            Ok(text) => Ok(fs::write(&self.config_path, text)
                .with_context(|| format!("save config {}", self.config_path.display()))?),
            Err(e) => bail!("convert config to toml format failed. {e:?}"),
        }
    }

    pub fn save_dir(&self) -> PathBuf {
        PathBuf::from(&self.output.save_dir)
    }
}

fn lock() -> MutexGuard<'static, Config> {
    CONFIG.lock().unwrap_or_else(|e| e.into_inner())
}

/// Load (or create) the config file. Call once at startup.
pub fn init() -> Result<()> {
    lock().init()
}

pub fn all() -> Config {
    lock().clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_temp(dir: &Path) -> Result<Config> {
        let mut config = Config::default();
        config.init_in(&dir.join("config"), &dir.join("data"))?;
        Ok(config)
    }

    #[test]
    fn test_first_run_writes_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = init_temp(dir.path())?;

        assert!(config.is_first_run);
        assert!(config.config_path.exists());
        assert_eq!(config.db_path, dir.path().join("data").join("vidna.db"));
        assert_eq!(config.save_dir(), dir.path().join("data").join("captures"));

        assert_eq!(config.api.model, "openai/gpt-4o");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.camera.fps, 30);
        assert!(config.camera.mirror_horizontal);
        assert!(config.pipeline.noise_reduction);
        assert_eq!(config.pipeline.jpeg_quality, 95);
        Ok(())
    }

    #[test]
    fn test_saved_values_reload() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut config = init_temp(dir.path())?;
        config.camera.name = "USB Camera".to_string();
        config.pipeline.jpeg_quality = 80;
        config.save()?;

        let reloaded = init_temp(dir.path())?;
        assert!(!reloaded.is_first_run);
        assert_eq!(reloaded.camera.name, "USB Camera");
        assert_eq!(reloaded.pipeline.jpeg_quality, 80);
        Ok(())
    }

    #[test]
    fn test_partial_file_fills_defaults() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join("vidna.toml"), "[pipeline]\nnoise_reduction = false\n")?;

        let config = init_temp(dir.path())?;
        assert!(!config.pipeline.noise_reduction);
        assert_eq!(config.pipeline.jpeg_quality, 95);
        assert_eq!(config.api.base_url, "https://openrouter.ai/api/v1");
        assert!(!config.output.save_dir.is_empty());
        Ok(())
    }

    #[test]
    fn test_broken_file_is_backed_up() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config_dir = dir.path().join("config");
        fs::create_dir_all(&config_dir)?;
        fs::write(config_dir.join("vidna.toml"), "[camera\nfps = ")?;

        let config = init_temp(dir.path())?;
        assert!(config.is_first_run);
        assert_eq!(fs::read_to_string(config_dir.join("vidna.toml.bak"))?, "[camera\nfps = ");

        let rewritten = fs::read_to_string(&config.config_path)?;
        assert!(toml::from_str::<Config>(&rewritten).is_ok());
        Ok(())
    }

    #[test]
    fn test_env_key_overrides_file() {
        let api = Api {
            api_key: "from-file".to_string(),
            ..Default::default()
        };

        assert_eq!(api.key_with_env(Some("from-env".to_string())), "from-env");
        assert_eq!(api.key_with_env(Some("  ".to_string())), "from-file");
        assert_eq!(api.key_with_env(None), "from-file");
    }

    #[test]
    fn test_camera_config_needs_both_dimensions() {
        let camera = Camera {
            width: Some(1280),
            ..Default::default()
        };
        assert_eq!(camera.to_camera_config().width, None);

        let camera = Camera {
            width: Some(1280),
            height: Some(720),
            ..Default::default()
        };
        let config = camera.to_camera_config();
        assert_eq!((config.width, config.height), (Some(1280), Some(720)));
        assert_eq!(config.fps, Some(30));
    }
}
