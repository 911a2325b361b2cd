// ==========================================
// 运维工单分析驾驶舱 - SQL 构建工具
// ==========================================
// 职责: 由 FilterState 生成参数化 WHERE 条件，
//       保证聚合/分页/导出三条查询使用同一套谓词
// 约束: 所有值均以参数绑定，不拼接用户输入
// ==========================================

use chrono::{Duration, NaiveDate};
use rusqlite::types::Value;

use crate::domain::filter::FilterState;
use crate::domain::types::RecordStatus;

/// SQL 查询构建器（流式 API）
///
/// # 示例
/// ```
/// use ops_console::repository::sql_builder::SqlQueryBuilder;
///
/// let sql = SqlQueryBuilder::new("SELECT * FROM work_request")
///     .where_clause("area = ?")
///     .and_if(Some("status <> ?"))
///     .order_by("id DESC")
///     .limit(10)
///     .offset(20)
///     .build();
///
/// assert_eq!(
///     sql,
///     "SELECT * FROM work_request WHERE area = ? AND status <> ? ORDER BY id DESC LIMIT 10 OFFSET 20"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct SqlQueryBuilder {
    select_clause: String,
    where_clauses: Vec<String>,
    group_by_clause: Option<String>,
    order_by_clause: Option<String>,
    limit_clause: Option<u64>,
    offset_clause: Option<u64>,
}

impl SqlQueryBuilder {
    pub fn new(select: &str) -> Self {
        Self {
            select_clause: select.to_string(),
            where_clauses: Vec::new(),
            group_by_clause: None,
            order_by_clause: None,
            limit_clause: None,
            offset_clause: None,
        }
    }

    pub fn where_clause(mut self, condition: &str) -> Self {
        self.where_clauses.push(condition.to_string());
        self
    }

    /// 条件添加 AND 子句
    pub fn and_if(mut self, condition: Option<&str>) -> Self {
        if let Some(cond) = condition {
            self.where_clauses.push(cond.to_string());
        }
        self
    }

    /// 批量追加条件（来自 FilterPredicate）
    pub fn where_all(mut self, conditions: &[String]) -> Self {
        self.where_clauses.extend(conditions.iter().cloned());
        self
    }

    pub fn group_by(mut self, group: &str) -> Self {
        self.group_by_clause = Some(group.to_string());
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        self.order_by_clause = Some(order.to_string());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit_clause = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset_clause = Some(n);
        self
    }

    pub fn build(&self) -> String {
        let mut sql = self.select_clause.clone();

        if !self.where_clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.where_clauses.join(" AND "));
        }

        if let Some(group) = &self.group_by_clause {
            sql.push_str(" GROUP BY ");
            sql.push_str(group);
        }

        if let Some(order) = &self.order_by_clause {
            sql.push_str(" ORDER BY ");
            sql.push_str(order);
        }

        if let Some(limit) = self.limit_clause {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        if let Some(offset) = self.offset_clause {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}

// ==========================================
// FilterPredicate - 过滤谓词
// ==========================================

/// 由过滤维度生成的 WHERE 条件与绑定参数
#[derive(Debug, Clone, Default)]
pub struct FilterPredicate {
    pub conditions: Vec<String>,
    pub params: Vec<Value>,
}

impl FilterPredicate {
    /// 聚合口径: 日期范围 + 维度槽位，排除已取消工单
    ///
    /// critical_only 不属于聚合契约，这里不处理
    pub fn for_aggregation(filter: &FilterState) -> Self {
        let mut p = Self::default();
        p.push("record_date >= ?", Value::Text(filter.start_date.to_string()));
        p.push("record_date <= ?", Value::Text(filter.end_date.to_string()));
        if let Some(area) = &filter.area {
            p.push("area = ?", Value::Text(area.clone()));
        }
        if let Some(supervisor) = &filter.supervisor {
            p.push("supervisor = ?", Value::Text(supervisor.clone()));
        }
        if let Some(installation) = &filter.installation {
            p.push("installation = ?", Value::Text(installation.clone()));
        }
        if let Some(month) = &filter.month {
            p.push("substr(record_date, 1, 7) = ?", Value::Text(month.to_string()));
        }
        p.push(
            "status <> ?",
            Value::Text(RecordStatus::Cancelada.as_str().to_string()),
        );
        p
    }

    /// 表格口径: 聚合口径 + 排除终结状态 + 可选滞留限制
    pub fn for_table(filter: &FilterState, today: NaiveDate, stale_threshold_days: i64) -> Self {
        let mut p = Self::for_aggregation(filter);
        p.exclude_terminal();
        if filter.critical_only {
            p.older_than(today, stale_threshold_days);
        }
        p
    }

    /// 导出口径: 聚合口径 + 可选滞留限制（仅看滞留时同时排除终结状态）
    pub fn for_export(filter: &FilterState, today: NaiveDate, stale_threshold_days: i64) -> Self {
        let mut p = Self::for_aggregation(filter);
        if filter.critical_only {
            p.exclude_terminal();
            p.older_than(today, stale_threshold_days);
        }
        p
    }

    /// 滞留口径: 不受过滤条件影响，仅按阈值与状态
    pub fn for_stalled(today: NaiveDate, stale_threshold_days: i64) -> Self {
        let mut p = Self::default();
        p.exclude_terminal();
        p.older_than(today, stale_threshold_days);
        p
    }

    fn push(&mut self, condition: &str, value: Value) {
        self.conditions.push(condition.to_string());
        self.params.push(value);
    }

    fn exclude_terminal(&mut self) {
        let codes = RecordStatus::terminal_codes();
        let placeholders = vec!["?"; codes.len()].join(", ");
        self.conditions
            .push(format!("status NOT IN ({})", placeholders));
        self.params
            .extend(codes.into_iter().map(|c| Value::Text(c.to_string())));
    }

    /// 早于阈值: today - record_date > threshold，即 record_date < today - threshold
    fn older_than(&mut self, today: NaiveDate, stale_threshold_days: i64) {
        let cutoff = today - Duration::days(stale_threshold_days);
        self.push("record_date < ?", Value::Text(cutoff.to_string()));
    }
}

// ==========================================
// 单元测试
// ==========================================
