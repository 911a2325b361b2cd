// ==========================================
// 运维工单分析驾驶舱 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑（口径由查询参数表达）
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod error;
pub mod record_store;
pub mod sql_builder;
pub mod sqlite_store;

pub use error::{RepositoryError, RepositoryResult};
pub use record_store::{
    AggregationQuery, AggregationResponse, AreaRow, ExportBatchQuery, InstallationRow, MonthRow,
    OverallRow, RecordPage, RecordStore, StalledQuery, SupervisorRow, TablePageQuery,
};
pub use sqlite_store::SqliteRecordStore;
