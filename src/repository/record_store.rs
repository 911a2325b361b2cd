// ==========================================
// 运维工单分析驾驶舱 - 数据服务契约
// ==========================================
// 职责: 定义远端数据服务（聚合 RPC / 分页查询 / 导出批量 / 滞留查询）的接口
// 说明: 上层只依赖 RecordStore trait；SQLite 实现见 sqlite_store.rs
// ==========================================

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::filter::{FilterState, YearMonth};
use crate::domain::record::WorkRecord;
use crate::repository::error::RepositoryResult;

// ==========================================
// 聚合查询（请求/响应与远端 RPC 字段一致）
// ==========================================

/// 聚合查询请求
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub area: Option<String>,
    pub supervisor: Option<String>,
    pub installation: Option<String>,
    pub month: Option<YearMonth>,
}

impl AggregationQuery {
    /// 以过滤条件的维度 + 指定日期范围构造请求
    pub fn for_period(filter: &FilterState, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            area: filter.area.clone(),
            supervisor: filter.supervisor.clone(),
            installation: filter.installation.clone(),
            month: filter.month,
        }
    }

    /// 还原为过滤条件（critical_only 不属于聚合契约）
    pub fn to_filter(&self) -> FilterState {
        FilterState {
            start_date: self.start_date,
            end_date: self.end_date,
            area: self.area.clone(),
            supervisor: self.supervisor.clone(),
            installation: self.installation.clone(),
            month: self.month,
            critical_only: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverallRow {
    pub total: u64,
    pub executed: u64,
    pub coverage: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaRow {
    pub area: String,
    pub total: u64,
    pub executed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorRow {
    pub supervisor: String,
    pub total: u64,
    pub executed: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRow {
    pub name: String,
    pub total: u64,
    pub executed: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthRow {
    pub month_key: String,
    pub total: u64,
    pub executed: u64,
}

/// 聚合查询响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResponse {
    pub overall: OverallRow,
    #[serde(default)]
    pub areas: Vec<AreaRow>,
    #[serde(default)]
    pub supervisors: Vec<SupervisorRow>,
    #[serde(default)]
    pub installations: Vec<InstallationRow>,
    #[serde(default)]
    pub months: Vec<MonthRow>,
}

// ==========================================
// 分页 / 导出 / 滞留查询
// ==========================================

/// 表格分页查询
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TablePageQuery {
    pub filter: FilterState,
    pub today: NaiveDate,
    pub stale_threshold_days: i64,
    pub offset: u64,
    pub limit: u64,
}

/// 分页查询结果: 当前页原始行 + 精确总数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPage {
    pub records: Vec<WorkRecord>,
    pub total_count: u64,
}

/// 导出批量查询（按 id 降序的键集分页）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBatchQuery {
    pub filter: FilterState,
    pub today: NaiveDate,
    pub stale_threshold_days: i64,
    /// 只取 id 小于该值的记录；None 表示从最新开始
    pub before_id: Option<i64>,
    pub limit: u64,
}

/// 滞留工单查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalledQuery {
    pub today: NaiveDate,
    pub stale_threshold_days: i64,
    pub limit: u64,
}

/// 数据服务接口
///
/// 实现方只负责 I/O；口径（终结状态排除、滞留阈值）由查询参数表达
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 聚合 RPC
    async fn aggregate(&self, query: AggregationQuery) -> RepositoryResult<AggregationResponse>;

    /// 表格分页（排除终结状态，id 降序）
    async fn fetch_table_page(&self, query: TablePageQuery) -> RepositoryResult<RecordPage>;

    /// 导出批量（不分页口径，id 降序）
    async fn fetch_export_batch(&self, query: ExportBatchQuery) -> RepositoryResult<Vec<WorkRecord>>;

    /// 滞留工单（最久未处理优先）
    async fn fetch_stalled(&self, query: StalledQuery) -> RepositoryResult<Vec<WorkRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_query_wire_shape() {
        let mut filter = FilterState::with_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        filter.area = Some("Civil".into());
        filter.month = Some(YearMonth::new(2024, 1).unwrap());

        let q = AggregationQuery::for_period(&filter, filter.start_date, filter.end_date);
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["start_date"], "2024-01-01");
        assert_eq!(json["area"], "Civil");
        assert_eq!(json["month"], "2024-01");
        assert!(json["supervisor"].is_null());
    }

    #[test]
    fn test_aggregation_response_tolerates_missing_lists() {
        let raw = r#"{"overall":{"total":3,"executed":1,"coverage":2}}"#;
        let resp: AggregationResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.overall.total, 3);
        assert!(resp.areas.is_empty());
    }
}
