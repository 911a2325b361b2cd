// ==========================================
// 运维工单分析驾驶舱 - 分组标签
// ==========================================
// 分组条目在应用内始终以 {key, label} 成对传递；
// 带百分比后缀的展示文本只存在于渲染边界。
// 旧式前端回传的展示文本通过 strip_percentage_suffix 还原原始键。
// ==========================================

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::domain::metrics::{BreakdownEntry, InstallationEntry, MonthEntry};

fn suffix_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r" \([0-9]+\.[0-9]%\)$").ok())
        .as_ref()
}

/// 生成展示文本: "<key> (NN.N%)"
pub fn decorate(key: &str, share_pct: f64) -> String {
    format!("{} ({:.1}%)", key, share_pct)
}

/// 去掉末尾的 " (NN.N%)" 后缀；没有后缀时原样返回
pub fn strip_percentage_suffix(label: &str) -> &str {
    match suffix_pattern().and_then(|re| re.find(label)) {
        Some(m) => &label[..m.start()],
        None => label,
    }
}

/// 占比（百分比）；分母为 0 时为 0
pub fn share_pct(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// 分组条目的渲染视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownLabel {
    /// 原始键（可直接写回 FilterState）
    pub key: String,
    /// 展示文本（仅供渲染）
    pub label: String,
    pub total: u64,
    pub executed: u64,
    pub share_pct: f64,
}

impl BreakdownLabel {
    pub fn new(key: &str, total: u64, executed: u64, grand_total: u64) -> Self {
        let share = share_pct(total, grand_total);
        Self {
            key: key.to_string(),
            label: decorate(key, share),
            total,
            executed,
            share_pct: share,
        }
    }
}

pub fn label_breakdown(entries: &[BreakdownEntry], grand_total: u64) -> Vec<BreakdownLabel> {
    entries
        .iter()
        .map(|e| BreakdownLabel::new(&e.key, e.total, e.executed, grand_total))
        .collect()
}

pub fn label_installations(entries: &[InstallationEntry], grand_total: u64) -> Vec<BreakdownLabel> {
    entries
        .iter()
        .map(|e| BreakdownLabel::new(&e.key, e.total, e.executed, grand_total))
        .collect()
}

pub fn label_months(entries: &[MonthEntry], grand_total: u64) -> Vec<BreakdownLabel> {
    entries
        .iter()
        .map(|e| BreakdownLabel::new(&e.month_key, e.total, e.executed, grand_total))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decorate_and_strip() {
        let label = decorate("Eléctrica", 45.25);
        assert_eq!(label, "Eléctrica (45.2%)");
        assert_eq!(strip_percentage_suffix(&label), "Eléctrica");
    }

    #[test]
    fn test_strip_is_lossless_for_plain_keys() {
        for key in ["Civil", "Planta (Norte)", "Área 51", "x (12%)", "", "100.0%"] {
            for share in [0.0, 3.14159, 100.0] {
                assert_eq!(strip_percentage_suffix(&decorate(key, share)), key);
            }
        }
    }

    #[test]
    fn test_strip_without_suffix_is_identity() {
        assert_eq!(strip_percentage_suffix("Mecánica"), "Mecánica");
        assert_eq!(strip_percentage_suffix("Mecánica (45%)"), "Mecánica (45%)");
        assert_eq!(strip_percentage_suffix("Mecánica(45.2%)"), "Mecánica(45.2%)");
    }

    #[test]
    fn test_strip_only_ascii_digits() {
        assert_eq!(strip_percentage_suffix("Civil (٤٠.٠%)"), "Civil (٤٠.٠%)");
        assert_eq!(strip_percentage_suffix("Civil (４０.０%)"), "Civil (４０.０%)");
        assert_eq!(strip_percentage_suffix("Civil (40.0%)"), "Civil");
    }

    #[test]
    fn test_label_share() {
        let l = BreakdownLabel::new("Civil", 1, 0, 3);
        assert_eq!(l.label, "Civil (33.3%)");
        assert_eq!(BreakdownLabel::new("Civil", 0, 0, 0).label, "Civil (0.0%)");
    }
}
