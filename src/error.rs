use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态机违规（例如：存在未结算的抽奖时停用参与记录）
    #[error("State error: {0}")]
    StateError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AppError {
    /// 稳定的错误码，供上层编排/接口层映射
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::StateError(_) => "STATE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::ConfigError(_) => "CONFIG_ERROR",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// 失败出口处记录一次日志，按错误类别选择级别
    pub fn log(&self) {
        let code = self.error_code();
        match self {
            AppError::ValidationError(_) | AppError::StateError(_) | AppError::NotFound(_) => {
                log::warn!("{code}: {self}");
            }
            AppError::ConfigError(_) | AppError::DatabaseError(_) | AppError::InternalError(_) => {
                log::error!("{code}: {self}");
            }
        }
    }
}
