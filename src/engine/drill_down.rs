// ==========================================
// 运维工单分析驾驶舱 - 下钻关联器
// ==========================================
// 职责: 将分组条目的选中操作映射为 FilterState 变更
// 规则:
// - 每个维度槽位只保留一个值；新选中替换旧值，不叠加
// - 区域/主管/设施/月份为独立槽位，可同时生效
// - 重复选中同一值是幂等的（重新应用同一 FilterState）
// - 展示文本回传时先去掉 " (NN.N%)" 后缀
// ==========================================

use crate::domain::filter::{FilterAction, FilterError, FilterState};
use crate::domain::label::{strip_percentage_suffix, BreakdownLabel};
use crate::domain::types::BreakdownDimension;

/// 下钻关联器
pub struct DrillDownCorrelator;

impl DrillDownCorrelator {
    /// 由展示文本（可能带百分比后缀）生成选中动作
    pub fn action_for_label(decorated_label: &str, dimension: BreakdownDimension) -> FilterAction {
        FilterAction::Select {
            dimension,
            key: strip_percentage_suffix(decorated_label).to_string(),
        }
    }

    /// 由分组视图（已携带原始键）生成选中动作
    pub fn action_for_entry(entry: &BreakdownLabel, dimension: BreakdownDimension) -> FilterAction {
        FilterAction::Select {
            dimension,
            key: entry.key.clone(),
        }
    }

    /// 选中分组条目: 去后缀后写入对应槽位
    pub fn select_breakdown_entry(
        filter: &FilterState,
        decorated_label: &str,
        dimension: BreakdownDimension,
    ) -> Result<FilterState, FilterError> {
        filter.apply(&Self::action_for_label(decorated_label, dimension))
    }

    /// 清除某维度槽位
    pub fn clear(filter: &FilterState, dimension: BreakdownDimension) -> FilterState {
        let mut next = filter.clone();
        match dimension {
            BreakdownDimension::Area => next.area = None,
            BreakdownDimension::Supervisor => next.supervisor = None,
            BreakdownDimension::Installation => next.installation = None,
            BreakdownDimension::Month => next.month = None,
        }
        next
    }

    /// 某条目当前是否处于选中状态（用于高亮）
    pub fn is_selected(filter: &FilterState, dimension: BreakdownDimension, key: &str) -> bool {
        filter.slot(dimension).as_deref() == Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::label::decorate;
    use chrono::NaiveDate;

    fn base() -> FilterState {
        FilterState::year_to_date(NaiveDate::from_ymd_opt(2024, 6, 30).unwrap())
    }

    #[test]
    fn test_select_strips_suffix() {
        let f = DrillDownCorrelator::select_breakdown_entry(
            &base(),
            "Eléctrica (45.2%)",
            BreakdownDimension::Area,
        )
        .unwrap();
        assert_eq!(f.area.as_deref(), Some("Eléctrica"));
        assert!(DrillDownCorrelator::is_selected(&f, BreakdownDimension::Area, "Eléctrica"));
    }

    #[test]
    fn test_reselect_is_idempotent() {
        let once = DrillDownCorrelator::select_breakdown_entry(
            &base(),
            &decorate("Rojas", 12.0),
            BreakdownDimension::Supervisor,
        )
        .unwrap();
        let twice = DrillDownCorrelator::select_breakdown_entry(
            &once,
            &decorate("Rojas", 30.5),
            BreakdownDimension::Supervisor,
        )
        .unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_slots_combine_and_replace() {
        let f = DrillDownCorrelator::select_breakdown_entry(
            &base(),
            "Civil (10.0%)",
            BreakdownDimension::Area,
        )
        .unwrap();
        let f = DrillDownCorrelator::select_breakdown_entry(
            &f,
            "2024-03 (8.3%)",
            BreakdownDimension::Month,
        )
        .unwrap();
        let f = DrillDownCorrelator::select_breakdown_entry(
            &f,
            "Mecánica (20.0%)",
            BreakdownDimension::Area,
        )
        .unwrap();

        assert_eq!(f.area.as_deref(), Some("Mecánica"));
        assert_eq!(f.month.map(|m| m.to_string()).as_deref(), Some("2024-03"));

        let cleared = DrillDownCorrelator::clear(&f, BreakdownDimension::Month);
        assert_eq!(cleared.month, None);
        assert_eq!(cleared.area.as_deref(), Some("Mecánica"));
    }

    #[test]
    fn test_entry_action_uses_raw_key() {
        let entry = BreakdownLabel::new("Planta 1", 3, 1, 10);
        let action = DrillDownCorrelator::action_for_entry(&entry, BreakdownDimension::Installation);
        assert_eq!(
            action,
            FilterAction::Select {
                dimension: BreakdownDimension::Installation,
                key: "Planta 1".into()
            }
        );
    }
}
