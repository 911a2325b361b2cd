// ==========================================
// 运维工单分析驾驶舱 - 领域类型定义
// ==========================================
// 工单状态 / 优先级 / 分组维度
// 序列化格式与远端数据服务一致（大写西语状态码）
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 滞留阈值（天）：超过该天数且未终结的工单视为"滞留/严重"
pub const STALE_THRESHOLD_DAYS: i64 = 10;

/// 优先级"一般"上限（天）
pub const NORMAL_PRIORITY_MAX_DAYS: i64 = 5;

// ==========================================
// 工单状态 (Record Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Activa,     // 新建/待处理
    Pendiente,  // 等待资源
    EnProceso,  // 执行中
    Ejecutada,  // 已执行（计入完成数）
    Cerrada,    // 已关闭
    Cancelada,  // 已取消
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 6] = [
        RecordStatus::Activa,
        RecordStatus::Pendiente,
        RecordStatus::EnProceso,
        RecordStatus::Ejecutada,
        RecordStatus::Cerrada,
        RecordStatus::Cancelada,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Activa => "ACTIVA",
            RecordStatus::Pendiente => "PENDIENTE",
            RecordStatus::EnProceso => "EN_PROCESO",
            RecordStatus::Ejecutada => "EJECUTADA",
            RecordStatus::Cerrada => "CERRADA",
            RecordStatus::Cancelada => "CANCELADA",
        }
    }

    /// 解析状态码（大小写不敏感，未知值返回 None）
    pub fn parse(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase().replace(' ', "_");
        Self::ALL.into_iter().find(|st| st.as_str() == upper)
    }

    /// 终结状态：无需后续处理（已执行/已关闭/已取消）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecordStatus::Ejecutada | RecordStatus::Cerrada | RecordStatus::Cancelada
        )
    }

    /// 是否计入"已执行"
    pub fn is_executed(&self) -> bool {
        matches!(self, RecordStatus::Ejecutada)
    }

    /// 终结状态码列表（用于 SQL NOT IN）
    pub fn terminal_codes() -> Vec<&'static str> {
        Self::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .map(|s| s.as_str())
            .collect()
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 优先级 (Priority)
// ==========================================
// 由等待天数派生: <=5 一般, 6-10 升级, >10 严重
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Normal,
    Elevated,
    Critical,
}

impl Priority {
    pub fn from_age_days(age_days: i64) -> Self {
        if age_days <= NORMAL_PRIORITY_MAX_DAYS {
            Priority::Normal
        } else if age_days <= STALE_THRESHOLD_DAYS {
            Priority::Elevated
        } else {
            Priority::Critical
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Normal => write!(f, "NORMAL"),
            Priority::Elevated => write!(f, "ELEVATED"),
            Priority::Critical => write!(f, "CRITICAL"),
        }
    }
}

// ==========================================
// 分组维度 (Breakdown Dimension)
// ==========================================
// 每个维度对应 FilterState 中一个独立的过滤槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownDimension {
    Area,
    Supervisor,
    Installation,
    Month,
}

impl fmt::Display for BreakdownDimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakdownDimension::Area => write!(f, "area"),
            BreakdownDimension::Supervisor => write!(f, "supervisor"),
            BreakdownDimension::Installation => write!(f, "installation"),
            BreakdownDimension::Month => write!(f, "month"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_from_age() {
        assert_eq!(Priority::from_age_days(0), Priority::Normal);
        assert_eq!(Priority::from_age_days(5), Priority::Normal);
        assert_eq!(Priority::from_age_days(6), Priority::Elevated);
        assert_eq!(Priority::from_age_days(10), Priority::Elevated);
        assert_eq!(Priority::from_age_days(11), Priority::Critical);
    }

    #[test]
    fn test_status_parse_and_terminal() {
        assert_eq!(RecordStatus::parse("activa"), Some(RecordStatus::Activa));
        assert_eq!(RecordStatus::parse("EN PROCESO"), Some(RecordStatus::EnProceso));
        assert_eq!(RecordStatus::parse("desconocido"), None);

        assert!(!RecordStatus::Activa.is_terminal());
        assert!(RecordStatus::Ejecutada.is_terminal());
        assert!(RecordStatus::Cancelada.is_terminal());
        assert_eq!(
            RecordStatus::terminal_codes(),
            vec!["EJECUTADA", "CERRADA", "CANCELADA"]
        );
    }

    #[test]
    fn test_status_serde_matches_wire() {
        let json = serde_json::to_string(&RecordStatus::EnProceso).unwrap();
        assert_eq!(json, "\"EN_PROCESO\"");
    }
}
