// ==========================================
// 运维工单分析驾驶舱 - 驾驶舱 API
// ==========================================
// 职责: 组合各引擎，向应用层提供指标/表格/滞留/导出四类操作
// 架构: App 层 → DashboardApi → Engine 层 → RecordStore
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConsoleConfig;
use crate::domain::filter::FilterState;
use crate::domain::label::{label_breakdown, label_installations, label_months, BreakdownLabel};
use crate::domain::metrics::{ComparisonDelta, MetricsSnapshot};
use crate::domain::record::StalledRecord;
use crate::engine::{
    ComparisonCalculator, ExportDocument, ExportSnapshotBuilder, MetricsAggregator,
    PaginatedTableSynchronizer, StalledRecordsMonitor, TablePage,
};
use crate::repository::record_store::RecordStore;

// ==========================================
// DTO
// ==========================================

/// 一次指标周期的完整结果（本期 + 上期 + 环比）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardMetrics {
    /// 计算时使用的过滤条件
    pub filter: FilterState,
    pub current: MetricsSnapshot,
    pub previous: MetricsSnapshot,
    pub comparison: ComparisonDelta,
}

/// 分组视图（渲染边界使用的 {key, label} 对）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownViews {
    pub areas: Vec<BreakdownLabel>,
    pub supervisors: Vec<BreakdownLabel>,
    pub installations: Vec<BreakdownLabel>,
    pub months: Vec<BreakdownLabel>,
}

impl BreakdownViews {
    /// 以本期全局总量为分母计算占比
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        let total = snapshot.totals.count;
        Self {
            areas: label_breakdown(&snapshot.by_area, total),
            supervisors: label_breakdown(&snapshot.by_supervisor, total),
            installations: label_installations(&snapshot.by_installation, total),
            months: label_months(&snapshot.by_month, total),
        }
    }
}

/// 导出请求: 调用时刻的过滤条件 + 当时展示的指标（可能属于别的过滤条件）
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRequest {
    pub filter: FilterState,
    pub displayed: Option<DashboardMetrics>,
}

// ==========================================
// DashboardApi - 驾驶舱 API
// ==========================================

pub struct DashboardApi {
    aggregator: MetricsAggregator,
    table: PaginatedTableSynchronizer,
    stalled: StalledRecordsMonitor,
    exporter: ExportSnapshotBuilder,
}

impl DashboardApi {
    pub fn new(store: Arc<dyn RecordStore>, config: &ConsoleConfig) -> Self {
        Self {
            aggregator: MetricsAggregator::new(store.clone()),
            table: PaginatedTableSynchronizer::new(
                store.clone(),
                config.page_size,
                config.stale_threshold_days,
            ),
            stalled: StalledRecordsMonitor::new(
                store.clone(),
                config.stale_threshold_days,
                config.stalled_cap,
            ),
            exporter: ExportSnapshotBuilder::new(
                store,
                config.export_batch_size,
                config.export_top_areas as usize,
                config.stale_threshold_days,
            ),
        }
    }

    pub fn page_size(&self) -> u32 {
        self.table.page_size()
    }

    /// 指标周期: 两次聚合 → 环比
    pub async fn load_metrics(&self, filter: &FilterState) -> ApiResult<DashboardMetrics> {
        let (current, previous) = self.aggregator.aggregate(filter).await?;
        let comparison = ComparisonCalculator::compare(&current, &previous);

        tracing::debug!(
            total = current.totals.count,
            previous_total = previous.totals.count,
            total_pct = comparison.total_count_pct,
            "指标周期完成"
        );

        Ok(DashboardMetrics {
            filter: filter.clone(),
            current,
            previous,
            comparison,
        })
    }

    pub async fn fetch_page(
        &self,
        filter: &FilterState,
        page_number: u32,
        today: NaiveDate,
    ) -> ApiResult<TablePage> {
        self.table.fetch_page(filter, page_number, today).await
    }

    pub async fn list_stalled(&self, today: NaiveDate) -> ApiResult<Vec<StalledRecord>> {
        self.stalled.fetch(today).await
    }

    /// 导出
    ///
    /// 展示中的快照与导出过滤条件口径一致时直接复用，否则按导出过滤条件重新聚合
    pub async fn build_export(
        &self,
        request: ExportRequest,
        today: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> ApiResult<ExportDocument> {
        let ExportRequest { filter, displayed } = request;

        let summary = match displayed {
            Some(metrics) if metrics.filter.same_aggregation_scope(&filter) => metrics.current,
            _ => {
                tracing::debug!("展示快照与导出过滤条件不一致，重新聚合摘要");
                self.aggregator
                    .aggregate_current(&filter)
                    .await
                    .map_err(|e| ApiError::ExportError(e.to_string()))?
            }
        };

        self.exporter
            .build_export(filter, summary, today, generated_at)
            .await
    }
}
