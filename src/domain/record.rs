// ==========================================
// 运维工单分析驾驶舱 - 工单记录与分页游标
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::types::{Priority, RecordStatus};

/// 工单原始记录（数据服务返回的完整行）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: i64,
    pub record_date: NaiveDate,
    pub location: String,
    pub installation: String,
    pub area: String,
    pub supervisor: String,
    pub description: String,
    pub status: RecordStatus,
}

impl WorkRecord {
    /// 等待天数 = today - record_date（整天）
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.record_date).num_days()
    }
}

/// 表格行（反范式投影）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub id: i64,
    pub date: NaiveDate,
    pub location: String,
    pub area: String,
    pub supervisor: String,
    pub status: RecordStatus,
    pub age_days: i64,
    pub priority: Priority,
}

impl TableRow {
    pub fn project(record: &WorkRecord, today: NaiveDate) -> Self {
        let age_days = record.age_days(today);
        Self {
            id: record.id,
            date: record.record_date,
            location: record.location.clone(),
            area: record.area.clone(),
            supervisor: record.supervisor.clone(),
            status: record.status,
            age_days,
            priority: Priority::from_age_days(age_days),
        }
    }
}

/// 滞留工单（驾驶舱告警面板）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StalledRecord {
    pub id: i64,
    pub record_date: NaiveDate,
    pub location: String,
    pub installation: String,
    pub area: String,
    pub status: RecordStatus,
    /// 等待天数
    pub dias_espera: i64,
    pub priority: Priority,
}

impl StalledRecord {
    pub fn project(record: &WorkRecord, today: NaiveDate) -> Self {
        let dias_espera = record.age_days(today);
        Self {
            id: record.id,
            record_date: record.record_date,
            location: record.location.clone(),
            installation: record.installation.clone(),
            area: record.area.clone(),
            status: record.status,
            dias_espera,
            priority: Priority::from_age_days(dias_espera),
        }
    }
}

// ==========================================
// PageCursor - 分页游标
// ==========================================
// 不变量: page_number >= 1；越界页码被钳制到最后一页，不报错
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageCursor {
    /// 页码（从 1 开始）
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
}

impl PageCursor {
    /// 首页游标（总数未知）
    pub fn first(page_size: u32) -> Self {
        Self {
            page_number: 1,
            page_size: page_size.max(1),
            total_count: 0,
        }
    }

    /// 总页数（至少 1 页）
    pub fn page_count(&self) -> u32 {
        let size = self.page_size.max(1) as u64;
        let pages = self.total_count.div_ceil(size).max(1);
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    /// 请求另一页（总数不变，页码至少为 1）
    pub fn with_page(&self, page_number: u32) -> Self {
        Self {
            page_number: page_number.max(1),
            ..*self
        }
    }

    /// 以新的总数钳制页码
    pub fn clamped(&self, total_count: u64) -> Self {
        let mut next = Self {
            total_count,
            ..*self
        };
        next.page_number = next.page_number.clamp(1, next.page_count());
        next
    }

    /// SQL OFFSET
    pub fn offset(&self) -> u64 {
        (self.page_number.max(1) as u64 - 1) * self.page_size.max(1) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_cursor_clamps() {
        let cursor = PageCursor::first(20).with_page(9);
        let clamped = cursor.clamped(45);
        assert_eq!(clamped.page_count(), 3);
        assert_eq!(clamped.page_number, 3);
        assert_eq!(clamped.offset(), 40);

        let empty = cursor.clamped(0);
        assert_eq!(empty.page_number, 1);
        assert_eq!(empty.offset(), 0);

        assert_eq!(PageCursor::first(20).with_page(0).page_number, 1);
    }

    #[test]
    fn test_table_row_projection() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        let record = WorkRecord {
            id: 7,
            record_date: NaiveDate::from_ymd_opt(2024, 5, 9).unwrap(),
            location: "Barrio Norte".into(),
            installation: "Planta 1".into(),
            area: "Eléctrica".into(),
            supervisor: "Rojas".into(),
            description: "Cambio de luminaria".into(),
            status: RecordStatus::Activa,
        };
        let row = TableRow::project(&record, today);
        assert_eq!(row.age_days, 11);
        assert_eq!(row.priority, Priority::Critical);
    }
}
