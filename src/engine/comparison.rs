// ==========================================
// 运维工单分析驾驶舱 - 环比计算器
// ==========================================
// 计数类: previous == 0 ? (current > 0 ? 100 : 0) : (current - previous) / previous * 100
// 完成率: 百分点差（本期完成率 - 上期完成率），不做比率的比率
// 纯函数，无 I/O
// ==========================================

use std::collections::HashMap;

use crate::domain::metrics::{ComparisonDelta, KeyDelta, MetricsSnapshot};

/// 环比计算器
pub struct ComparisonCalculator;

impl ComparisonCalculator {
    /// 计数类指标的百分比变化（上期为 0 时不做除法）
    pub fn pct_change(current: u64, previous: u64) -> f64 {
        if previous == 0 {
            if current > 0 {
                100.0
            } else {
                0.0
            }
        } else {
            (current as f64 - previous as f64) / previous as f64 * 100.0
        }
    }

    pub fn compare(current: &MetricsSnapshot, previous: &MetricsSnapshot) -> ComparisonDelta {
        let current_rate = current.totals.completion_rate();
        let previous_rate = previous.totals.completion_rate();

        ComparisonDelta {
            total_count_pct: Self::pct_change(current.totals.count, previous.totals.count),
            executed_count_pct: Self::pct_change(
                current.totals.executed_count,
                previous.totals.executed_count,
            ),
            pending_count_pct: Self::pct_change(
                current.totals.pending(),
                previous.totals.pending(),
            ),
            coverage_pct: Self::pct_change(current.coverage, previous.coverage),
            current_completion_rate: current_rate,
            previous_completion_rate: previous_rate,
            completion_rate_points: current_rate - previous_rate,
            by_area: Self::area_deltas(current, previous),
        }
    }

    /// 区域级对比：取两期键的并集，按本期总量降序
    fn area_deltas(current: &MetricsSnapshot, previous: &MetricsSnapshot) -> Vec<KeyDelta> {
        let prev_by_key: HashMap<&str, u64> = previous
            .by_area
            .iter()
            .map(|e| (e.key.as_str(), e.total))
            .collect();
        let cur_by_key: HashMap<&str, u64> = current
            .by_area
            .iter()
            .map(|e| (e.key.as_str(), e.total))
            .collect();

        let mut keys: Vec<&str> = current.by_area.iter().map(|e| e.key.as_str()).collect();
        keys.extend(
            previous
                .by_area
                .iter()
                .map(|e| e.key.as_str())
                .filter(|k| !cur_by_key.contains_key(k)),
        );

        let mut deltas: Vec<KeyDelta> = keys
            .into_iter()
            .map(|key| {
                let cur = cur_by_key.get(key).copied().unwrap_or(0);
                let prev = prev_by_key.get(key).copied().unwrap_or(0);
                KeyDelta {
                    key: key.to_string(),
                    current: cur,
                    previous: prev,
                    delta_pct: Self::pct_change(cur, prev),
                }
            })
            .collect();

        deltas.sort_by(|a, b| b.current.cmp(&a.current).then_with(|| a.key.cmp(&b.key)));
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{BreakdownEntry, Totals};
    use chrono::NaiveDate;

    fn snapshot(count: u64, executed: u64, coverage: u64) -> MetricsSnapshot {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut s = MetricsSnapshot::empty(d, d);
        s.totals = Totals {
            count,
            executed_count: executed,
        };
        s.coverage = coverage;
        s
    }

    #[test]
    fn test_zero_previous() {
        assert_eq!(ComparisonCalculator::pct_change(5, 0), 100.0);
        assert_eq!(ComparisonCalculator::pct_change(0, 0), 0.0);

        let delta = ComparisonCalculator::compare(&snapshot(4, 1, 1), &snapshot(0, 0, 0));
        assert_eq!(delta.total_count_pct, 100.0);
        assert_eq!(delta.coverage_pct, 100.0);

        let delta = ComparisonCalculator::compare(&snapshot(0, 0, 0), &snapshot(0, 0, 0));
        assert_eq!(delta.total_count_pct, 0.0);
        assert_eq!(delta.completion_rate_points, 0.0);
    }

    #[test]
    fn test_signed_percentage() {
        assert_eq!(ComparisonCalculator::pct_change(15, 10), 50.0);
        assert_eq!(ComparisonCalculator::pct_change(5, 10), -50.0);
        assert_eq!(ComparisonCalculator::pct_change(0, 10), -100.0);
    }

    #[test]
    fn test_completion_rate_is_point_difference() {
        // 本期 60%，上期 40% → +20 个百分点（不是 +50%）
        let delta = ComparisonCalculator::compare(&snapshot(10, 6, 1), &snapshot(10, 4, 1));
        assert!((delta.completion_rate_points - 20.0).abs() < 1e-9);
        assert!((delta.executed_count_pct - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_area_deltas_union() {
        let mut cur = snapshot(5, 0, 0);
        cur.by_area = vec![BreakdownEntry {
            key: "Civil".into(),
            total: 5,
            executed: 0,
        }];
        let mut prev = snapshot(2, 0, 0);
        prev.by_area = vec![BreakdownEntry {
            key: "Eléctrica".into(),
            total: 2,
            executed: 0,
        }];

        let delta = ComparisonCalculator::compare(&cur, &prev);
        assert_eq!(delta.by_area.len(), 2);
        assert_eq!(delta.by_area[0].key, "Civil");
        assert_eq!(delta.by_area[0].delta_pct, 100.0);
        assert_eq!(delta.by_area[1].key, "Eléctrica");
        assert_eq!(delta.by_area[1].delta_pct, -100.0);
    }
}
