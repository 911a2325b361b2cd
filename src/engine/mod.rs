// ==========================================
// 运维工单分析驾驶舱 - 引擎层
// ==========================================
// 职责: 聚合 / 环比 / 下钻 / 分页 / 导出 / 滞留监视
// 红线: Engine 不拼 SQL，数据访问一律经 RecordStore
// ==========================================

pub mod aggregator;
pub mod comparison;
pub mod drill_down;
pub mod export;
pub mod stalled;
pub mod table_sync;

// 重导出核心引擎
pub use aggregator::MetricsAggregator;
pub use comparison::ComparisonCalculator;
pub use drill_down::DrillDownCorrelator;
pub use export::{ExportDocument, ExportSnapshotBuilder};
pub use stalled::StalledRecordsMonitor;
pub use table_sync::{PaginatedTableSynchronizer, TablePage};
