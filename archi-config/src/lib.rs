use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "ARCHI_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub editor: EditorConfig,
    #[serde(default)]
    pub eraser: EraserConfig,
    #[serde(default)]
    pub canvas: CanvasConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `ARCHI_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV_VAR) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

/// 编辑器可调参数。缺省值与编辑器内置默认一致。
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub history_limit: usize,
    pub eraser_diameter: f64,
    pub min_area_size: f64,
    pub min_resize_size: f64,
    pub min_radius: f64,
    pub min_fragment_length: f64,
    pub erase_wedge_degrees: f64,
    pub arc_segments: usize,
    pub line_hit_threshold: f64,
    pub dimension_hit_threshold: f64,
    pub handle_size: f64,
    pub handle_tolerance: f64,
    pub rotation_handle_distance: f64,
    pub paste_offset: f64,
    pub text_erase_width: f64,
    pub grid_size: f64,
    pub snap_to_grid: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: 50,
            eraser_diameter: 20.0,
            min_area_size: 20.0,
            min_resize_size: 10.0,
            min_radius: 5.0,
            min_fragment_length: 10.0,
            erase_wedge_degrees: 45.0,
            arc_segments: 20,
            line_hit_threshold: 5.0,
            dimension_hit_threshold: 10.0,
            handle_size: 8.0,
            handle_tolerance: 5.0,
            rotation_handle_distance: 40.0,
            paste_offset: 20.0,
            text_erase_width: 100.0,
            grid_size: 20.0,
            snap_to_grid: false,
        }
    }
}

/// 按种类名覆盖擦除策略（接受别名）。
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EraserConfig {
    pub atomic_kinds: Vec<String>,
    pub decompose_kinds: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
