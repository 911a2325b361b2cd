// ==========================================
// 运维工单分析驾驶舱 - 指标快照
// ==========================================
// MetricsSnapshot 每个取数周期整体重算，不做增量修补
// 不变量: 每个分组条目 executed <= total
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 全局合计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub count: u64,
    pub executed_count: u64,
}

impl Totals {
    pub fn pending(&self) -> u64 {
        self.count.saturating_sub(self.executed_count)
    }

    /// 完成率（百分比，0-100）；无工单时为 0
    pub fn completion_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.executed_count as f64 / self.count as f64 * 100.0
        }
    }
}

/// 区域/主管分组条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub key: String,
    pub total: u64,
    pub executed: u64,
}

/// 设施分组条目（带待办数）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationEntry {
    pub key: String,
    pub total: u64,
    pub executed: u64,
    /// 恒等于 total - executed
    pub pending: u64,
}

/// 月份分组条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthEntry {
    /// YYYY-MM
    pub month_key: String,
    pub total: u64,
    pub executed: u64,
}

/// 指标快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub totals: Totals,
    pub by_area: Vec<BreakdownEntry>,
    pub by_supervisor: Vec<BreakdownEntry>,
    pub by_installation: Vec<InstallationEntry>,
    pub by_month: Vec<MonthEntry>,
    /// 覆盖设施数（去重）
    pub coverage: u64,
}

impl MetricsSnapshot {
    /// 空快照（区间内无数据）
    pub fn empty(period_start: NaiveDate, period_end: NaiveDate) -> Self {
        Self {
            period_start,
            period_end,
            totals: Totals::default(),
            by_area: Vec::new(),
            by_supervisor: Vec::new(),
            by_installation: Vec::new(),
            by_month: Vec::new(),
            coverage: 0,
        }
    }

    /// 区域分组按总量降序取前 N
    pub fn top_areas(&self, n: usize) -> Vec<BreakdownEntry> {
        let mut areas = self.by_area.clone();
        areas.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
        areas.truncate(n);
        areas
    }
}

/// 单键对比（用于分组级别）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyDelta {
    pub key: String,
    pub current: u64,
    pub previous: u64,
    pub delta_pct: f64,
}

/// 环比对比结果
///
/// 计数类指标为百分比变化；完成率为百分点差
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonDelta {
    pub total_count_pct: f64,
    pub executed_count_pct: f64,
    pub pending_count_pct: f64,
    pub coverage_pct: f64,
    pub current_completion_rate: f64,
    pub previous_completion_rate: f64,
    /// 完成率百分点差 = 本期完成率 - 上期完成率
    pub completion_rate_points: f64,
    pub by_area: Vec<KeyDelta>,
}
