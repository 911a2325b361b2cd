// ==========================================
// 运维工单分析驾驶舱 - 核心库
// ==========================================
// 技术栈: Rust + tokio + SQLite
// 系统定位: 工单聚合统计、环比对比、下钻与导出
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 过滤条件、指标、工单记录
pub mod domain;

// 数据仓储层 - 数据服务契约与 SQLite 参考实现
pub mod repository;

// 引擎层 - 聚合/环比/下钻/分页/导出
pub mod engine;

// 配置层 - 运行配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态容器与会话
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

pub use domain::{
    BreakdownDimension, ComparisonDelta, FilterAction, FilterState, MetricsSnapshot, PageCursor,
    RecordStatus, WorkRecord,
};

pub use engine::{
    ComparisonCalculator, DrillDownCorrelator, ExportDocument, ExportSnapshotBuilder,
    MetricsAggregator, PaginatedTableSynchronizer, StalledRecordsMonitor,
};

pub use api::{ApiError, ApiResult, DashboardApi};

pub use app::{AppState, ConsoleAction, ConsoleSession, ConsoleView};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "运维工单分析驾驶舱";
