// ==========================================
// 运维工单分析驾驶舱 - 指标聚合器
// ==========================================
// 职责: 每个 FilterState 发起两次聚合调用（本期 + 上期），并发执行
// 输出: 归一化的 MetricsSnapshot（executed <= total, pending = total - executed）
// 说明: 除网络 I/O 外无副作用
// ==========================================

use chrono::NaiveDate;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::filter::FilterState;
use crate::domain::metrics::{BreakdownEntry, InstallationEntry, MetricsSnapshot, MonthEntry, Totals};
use crate::repository::record_store::{AggregationQuery, AggregationResponse, RecordStore};

/// 指标聚合器
pub struct MetricsAggregator {
    store: Arc<dyn RecordStore>,
}

impl MetricsAggregator {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }

    /// 聚合本期与上期
    ///
    /// 两次调用维度相同、仅日期不同；任一失败即返回 AggregationError
    pub async fn aggregate(
        &self,
        filter: &FilterState,
    ) -> ApiResult<(MetricsSnapshot, MetricsSnapshot)> {
        let (prev_start, prev_end) = filter.previous_period();

        let current_query = AggregationQuery::for_period(filter, filter.start_date, filter.end_date);
        let previous_query = AggregationQuery::for_period(filter, prev_start, prev_end);

        tracing::debug!(
            start = %filter.start_date,
            end = %filter.end_date,
            prev_start = %prev_start,
            prev_end = %prev_end,
            "发起本期/上期聚合调用"
        );

        let (current, previous) = futures::future::try_join(
            self.store.aggregate(current_query),
            self.store.aggregate(previous_query),
        )
        .await
        .map_err(ApiError::aggregation)?;

        Ok((
            normalize(current, filter.start_date, filter.end_date),
            normalize(previous, prev_start, prev_end),
        ))
    }

    /// 只聚合本期（导出摘要无现成快照时使用）
    pub async fn aggregate_current(&self, filter: &FilterState) -> ApiResult<MetricsSnapshot> {
        let query = AggregationQuery::for_period(filter, filter.start_date, filter.end_date);
        let response = self
            .store
            .aggregate(query)
            .await
            .map_err(ApiError::aggregation)?;
        Ok(normalize(response, filter.start_date, filter.end_date))
    }
}

/// 将聚合响应归一化为快照
///
/// 远端返回 executed > total 时钳制为 total；pending 一律按 total - executed 重算
pub fn normalize(
    response: AggregationResponse,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> MetricsSnapshot {
    let totals = Totals {
        count: response.overall.total,
        executed_count: clamp_executed("overall", response.overall.total, response.overall.executed),
    };

    let by_area = response
        .areas
        .into_iter()
        .map(|row| BreakdownEntry {
            executed: clamp_executed(&row.area, row.total, row.executed),
            key: row.area,
            total: row.total,
        })
        .collect();

    let by_supervisor = response
        .supervisors
        .into_iter()
        .map(|row| BreakdownEntry {
            executed: clamp_executed(&row.supervisor, row.total, row.executed),
            key: row.supervisor,
            total: row.total,
        })
        .collect();

    let by_installation = response
        .installations
        .into_iter()
        .map(|row| {
            let executed = clamp_executed(&row.name, row.total, row.executed);
            let pending = row.total - executed;
            if row.pending != pending {
                tracing::debug!(
                    key = %row.name,
                    reported = row.pending,
                    derived = pending,
                    "设施待办数与 total - executed 不一致，按派生值修正"
                );
            }
            InstallationEntry {
                key: row.name,
                total: row.total,
                executed,
                pending,
            }
        })
        .collect();

    let by_month = response
        .months
        .into_iter()
        .map(|row| MonthEntry {
            executed: clamp_executed(&row.month_key, row.total, row.executed),
            month_key: row.month_key,
            total: row.total,
        })
        .collect();

    MetricsSnapshot {
        period_start,
        period_end,
        totals,
        by_area,
        by_supervisor,
        by_installation,
        by_month,
        coverage: response.overall.coverage,
    }
}

fn clamp_executed(key: &str, total: u64, executed: u64) -> u64 {
    if executed > total {
        tracing::warn!(key = key, total, executed, "聚合结果 executed > total，已钳制");
        total
    } else {
        executed
    }
}
