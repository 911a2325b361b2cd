// ==========================================
// 运维工单分析驾驶舱 - API层错误类型
// ==========================================
// 职责: 定义驾驶舱错误分类，转换Repository错误为用户可读的错误消息
// 说明: 本子系统没有致命错误，所有失败都可通过重新触发取数周期恢复
// ==========================================

use crate::domain::filter::FilterError;
use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 取数错误（可恢复，以提示条呈现）
    // ==========================================
    /// 指标聚合调用失败（本期或上期任一失败）
    #[error("指标聚合失败: {0}")]
    AggregationError(String),

    /// 表格分页查询失败
    #[error("表格查询失败: {0}")]
    TableFetchError(String),

    /// 导出查询或文档序列化失败
    #[error("导出失败: {0}")]
    ExportError(String),

    // ==========================================
    // 输入错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 稳定错误码（提示条/前端使用）
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::AggregationError(_) => "AGGREGATION_ERROR",
            ApiError::TableFetchError(_) => "TABLE_FETCH_ERROR",
            ApiError::ExportError(_) => "EXPORT_ERROR",
            ApiError::InvalidInput(_) => "INVALID_INPUT",
            ApiError::ConfigError(_) => "CONFIG_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 按取数场景包装仓储错误
    pub fn aggregation(err: RepositoryError) -> Self {
        ApiError::AggregationError(err.to_string())
    }

    pub fn table_fetch(err: RepositoryError) -> Self {
        ApiError::TableFetchError(err.to_string())
    }

    pub fn export(err: RepositoryError) -> Self {
        ApiError::ExportError(err.to_string())
    }

    /// 转换为可序列化的错误响应
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(err: FilterError) -> Self {
        ApiError::InvalidInput(err.to_string())
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Other(e) => ApiError::Other(e),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

/// 错误响应（返回给前端）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
