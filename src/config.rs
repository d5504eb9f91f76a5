//! 标定拟合配置
//! 集中管理数据库位置与拟合参数，提供默认值和配置验证

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sensefit.toml";
/// Points to an alternative config file.
pub const CONFIG_ENV: &str = "SENSEFIT_CONFIG";
/// Overrides `database.path`.
pub const DATABASE_ENV: &str = "SENSEFIT_DB";

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub fit: FitConfig,
}

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub training_table: String,
    pub coefficient_table: String,
}

/// 拟合配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FitConfig {
    pub min_samples: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "training_new.db".to_string(),
            training_table: "trainingData".to_string(),
            coefficient_table: "coefficients".to_string(),
        }
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self { min_samples: 1 }
    }
}

impl AppConfig {
    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::IoError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::SerializeError)?;
        std::fs::write(path, content).map_err(ConfigError::IoError)?;
        Ok(())
    }

    /// Resolve the configuration for a run: `.env`, then the config file
    /// (`SENSEFIT_CONFIG` or `sensefit.toml` if present, defaults otherwise),
    /// then the `SENSEFIT_DB` override.
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::load_from_file(path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };

        if let Ok(path) = std::env::var(DATABASE_ENV) {
            config.database.path = path;
        }

        config.validate()?;
        Ok(config)
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::ValidationError("Database path must not be empty".to_string()));
        }

        for table in [&self.database.training_table, &self.database.coefficient_table] {
            if !is_sql_identifier(table) {
                return Err(ConfigError::ValidationError(format!(
                    "Invalid table name: {:?}",
                    table
                )));
            }
        }

        if self.database.training_table == self.database.coefficient_table {
            return Err(ConfigError::ValidationError(
                "Training and coefficient tables must differ".to_string(),
            ));
        }

        if self.fit.min_samples < 1 {
            return Err(ConfigError::ValidationError(
                "Minimum samples must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    /// 获取数据库文件路径
    pub fn get_database_path(&self) -> PathBuf {
        PathBuf::from(&self.database.path)
    }
}

fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(toml::de::Error),
    #[error("Serialize error: {0}")]
    SerializeError(toml::ser::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
}
