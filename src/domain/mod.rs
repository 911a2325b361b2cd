// ==========================================
// 运维工单分析驾驶舱 - 领域层
// ==========================================
// 职责: 过滤条件、指标快照、工单记录与分组标签
// ==========================================

pub mod filter;
pub mod label;
pub mod metrics;
pub mod record;
pub mod types;

pub use filter::{FilterAction, FilterError, FilterState, YearMonth};
pub use label::{decorate, strip_percentage_suffix, BreakdownLabel};
pub use metrics::{
    BreakdownEntry, ComparisonDelta, InstallationEntry, KeyDelta, MetricsSnapshot, MonthEntry,
    Totals,
};
pub use record::{PageCursor, StalledRecord, TableRow, WorkRecord};
pub use types::{BreakdownDimension, Priority, RecordStatus, STALE_THRESHOLD_DAYS};
