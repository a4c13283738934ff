use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

/// 统一状态码: 1 启用 / 0 停用 / -1 删除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
#[repr(i16)]
pub enum StatusCode {
    Active = 1,
    Inactive = 0,
    Deleted = -1,
}

impl From<StatusCode> for i16 {
    fn from(code: StatusCode) -> Self {
        code as i16
    }
}

impl TryFrom<i16> for StatusCode {
    type Error = AppError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(StatusCode::Active),
            0 => Ok(StatusCode::Inactive),
            -1 => Ok(StatusCode::Deleted),
            other => Err(AppError::ValidationError(format!(
                "Unknown status code: {other}"
            ))),
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Active => "active",
            StatusCode::Inactive => "inactive",
            StatusCode::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// 各活动实体内嵌的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub code: StatusCode,
    pub activated_at: Option<DateTime<Utc>>,
    pub deactivated_at: Option<DateTime<Utc>>,
}

impl Status {
    pub fn active() -> Self {
        Self {
            code: StatusCode::Active,
            activated_at: None,
            deactivated_at: None,
        }
    }

    pub fn inactive() -> Self {
        Self {
            code: StatusCode::Inactive,
            activated_at: None,
            deactivated_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.code == StatusCode::Active
    }

    pub fn is_deleted(&self) -> bool {
        self.code == StatusCode::Deleted
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::active()
    }
}

/// 启用。已删除的实体不可再启用；重复启用为幂等操作
pub fn activate(status: &mut Status, now: DateTime<Utc>) -> AppResult<()> {
    match status.code {
        StatusCode::Deleted => Err(AppError::StateError(
            "Cannot activate a deleted entity".into(),
        )),
        StatusCode::Active => Ok(()),
        StatusCode::Inactive => {
            status.code = StatusCode::Active;
            status.activated_at = Some(now);
            Ok(())
        }
    }
}

/// 停用。已删除的实体保持删除状态
pub fn deactivate(status: &mut Status, now: DateTime<Utc>) -> AppResult<()> {
    match status.code {
        StatusCode::Deleted => Err(AppError::StateError(
            "Cannot deactivate a deleted entity".into(),
        )),
        StatusCode::Inactive => Ok(()),
        StatusCode::Active => {
            status.code = StatusCode::Inactive;
            status.deactivated_at = Some(now);
            Ok(())
        }
    }
}

/// 软删除，不可逆
pub fn mark_deleted(status: &mut Status, now: DateTime<Utc>) {
    if status.code != StatusCode::Deleted {
        status.code = StatusCode::Deleted;
        status.deactivated_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_code_round_trip_values() {
        assert_eq!(i16::from(StatusCode::Active), 1);
        assert_eq!(i16::from(StatusCode::Inactive), 0);
        assert_eq!(i16::from(StatusCode::Deleted), -1);
        assert_eq!(StatusCode::try_from(-1).unwrap(), StatusCode::Deleted);
        assert!(StatusCode::try_from(2).is_err());
    }

    #[test]
    fn test_status_serializes_as_integer() {
        let json = serde_json::to_string(&StatusCode::Deleted).unwrap();
        assert_eq!(json, "-1");
        let code: StatusCode = serde_json::from_str("1").unwrap();
        assert_eq!(code, StatusCode::Active);
    }

    #[test]
    fn test_activate_and_deactivate() {
        let now = Utc::now();
        let mut status = Status::inactive();
        activate(&mut status, now).unwrap();
        assert!(status.is_active());
        assert_eq!(status.activated_at, Some(now));

        deactivate(&mut status, now).unwrap();
        assert!(!status.is_active());
        assert_eq!(status.deactivated_at, Some(now));

        mark_deleted(&mut status, now);
        assert!(status.is_deleted());
        assert!(activate(&mut status, now).is_err());
        assert!(deactivate(&mut status, now).is_err());
    }
}
