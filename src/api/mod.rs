// ==========================================
// 运维工单分析驾驶舱 - API 层
// ==========================================
// 职责: 提供业务 API 接口，供会话层与启动入口调用
// ==========================================

pub mod config_api;
pub mod dashboard_api;
pub mod error;

// 重导出核心类型
pub use config_api::{ConfigApi, ConfigItem};
pub use dashboard_api::{BreakdownViews, DashboardApi, DashboardMetrics, ExportRequest};
pub use error::{ApiError, ApiResult, ErrorResponse};
