use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// 每日抽奖次数上限默认值
pub const DEFAULT_DAILY_SPIN_CAP: i64 = 10;
/// 库存提交冲突后的默认重试次数
pub const DEFAULT_MAX_COMMIT_RETRIES: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub spin: SpinPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// 奖品中奖率如何转换为抽签权重
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightingMode {
    /// 原样使用中奖率；总和超过 1 时不再有未中奖区间，id 靠后的奖品可能抽不到
    #[default]
    Raw,
    /// 总和超过 1 时按比例缩放到恰好为 1
    Normalized,
}

impl FromStr for WeightingMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(WeightingMode::Raw),
            "normalized" | "normalised" => Ok(WeightingMode::Normalized),
            other => Err(AppError::ConfigError(format!(
                "Unknown weighting mode: {other}"
            ))),
        }
    }
}

/// 抽奖引擎策略配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinPolicy {
    #[serde(default = "default_daily_spin_cap")]
    pub daily_spin_cap: i64,
    #[serde(default = "default_max_commit_retries")]
    pub max_commit_retries: u32,
    #[serde(default)]
    pub weighting_mode: WeightingMode,
    /// 为 true 时使用活动地点的有效每日上限（若已配置）替代 daily_spin_cap
    #[serde(default)]
    pub use_location_daily_limit: bool,
}

fn default_daily_spin_cap() -> i64 {
    DEFAULT_DAILY_SPIN_CAP
}

fn default_max_commit_retries() -> u32 {
    DEFAULT_MAX_COMMIT_RETRIES
}

impl Default for SpinPolicy {
    fn default() -> Self {
        Self {
            daily_spin_cap: DEFAULT_DAILY_SPIN_CAP,
            max_commit_retries: DEFAULT_MAX_COMMIT_RETRIES,
            weighting_mode: WeightingMode::Raw,
            use_location_daily_limit: false,
        }
    }
}

impl SpinPolicy {
    pub fn validate(&self) -> AppResult<()> {
        if self.daily_spin_cap < 0 {
            return Err(AppError::ConfigError(
                "daily_spin_cap cannot be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml() -> AppResult<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let mut config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => Self::parse(&config_str)?,
            Err(e) if e.kind() == ErrorKind::NotFound => Config {
                database: None,
                spin: SpinPolicy::default(),
            },
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "无法读取配置文件 {config_path}: {e}"
                )));
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        config.apply_overrides(|name| env::var(name).ok())?;
        config.spin.validate()?;
        Ok(config)
    }

    pub fn parse(config_str: &str) -> AppResult<Self> {
        toml::from_str(config_str)
            .map_err(|e| AppError::ConfigError(format!("解析配置文件失败: {e}")))
    }

    /// 在解析结果之上应用 `DATABASE_URL`、`DB_MAX_CONNECTIONS` 与 `SPIN_*` 环境变量
    pub fn apply_overrides<F>(&mut self, get_env: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get_env("DATABASE_URL") {
            let max_connections = self
                .database
                .as_ref()
                .map(|db| db.max_connections)
                .unwrap_or(10);
            self.database = Some(DatabaseConfig {
                url,
                max_connections,
            });
        }
        if let Some(v) = get_env("DB_MAX_CONNECTIONS")
            && let Some(db) = self.database.as_mut()
        {
            db.max_connections = parse_var("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = get_env("SPIN_DAILY_CAP") {
            self.spin.daily_spin_cap = parse_var("SPIN_DAILY_CAP", &v)?;
        }
        if let Some(v) = get_env("SPIN_MAX_COMMIT_RETRIES") {
            self.spin.max_commit_retries = parse_var("SPIN_MAX_COMMIT_RETRIES", &v)?;
        }
        if let Some(v) = get_env("SPIN_WEIGHTING_MODE") {
            self.spin.weighting_mode = v.parse()?;
        }
        if let Some(v) = get_env("SPIN_USE_LOCATION_DAILY_LIMIT") {
            self.spin.use_location_daily_limit = parse_var("SPIN_USE_LOCATION_DAILY_LIMIT", &v)?;
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(name: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| AppError::ConfigError(format!("Invalid value for {name}: {value}")))
}
