// ==========================================
// 运维工单分析驾驶舱 - SQLite 数据服务实现
// ==========================================
// 职责: 以 SQLite 实现 RecordStore 契约（聚合/分页/导出/滞留）
// 约束: 阻塞查询统一放到 spawn_blocking，不占用异步调度线程
// 约束: 所有查询使用参数化，防止 SQL 注入
// ==========================================

use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, Connection};
use std::sync::{Arc, Mutex};

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::record::WorkRecord;
use crate::domain::types::RecordStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::record_store::{
    AggregationQuery, AggregationResponse, AreaRow, ExportBatchQuery, InstallationRow, MonthRow,
    OverallRow, RecordPage, RecordStore, StalledQuery, SupervisorRow, TablePageQuery,
};
use crate::repository::sql_builder::{FilterPredicate, SqlQueryBuilder};

const RECORD_COLUMNS: &str =
    "id, record_date, location, installation, area, supervisor, description, status";

/// 工单数据服务（SQLite）
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// 基于共享连接创建
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 打开数据库文件并确保表结构存在
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// 写入（或覆盖）一条工单
    pub fn upsert_record(&self, record: &WorkRecord) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO work_request (
                id, record_date, location, installation, area, supervisor, description, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                record.id,
                record.record_date.to_string(),
                record.location,
                record.installation,
                record.area,
                record.supervisor,
                record.description,
                record.status.as_str(),
            ],
        )?;
        Ok(())
    }

    /// 在阻塞线程池上执行查询
    async fn run<T, F>(&self, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> RepositoryResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            f(&guard)
        })
        .await?
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn aggregate(&self, query: AggregationQuery) -> RepositoryResult<AggregationResponse> {
        self.run(move |conn| aggregate_blocking(conn, &query)).await
    }

    async fn fetch_table_page(&self, query: TablePageQuery) -> RepositoryResult<RecordPage> {
        self.run(move |conn| table_page_blocking(conn, &query)).await
    }

    async fn fetch_export_batch(&self, query: ExportBatchQuery) -> RepositoryResult<Vec<WorkRecord>> {
        self.run(move |conn| export_batch_blocking(conn, &query)).await
    }

    async fn fetch_stalled(&self, query: StalledQuery) -> RepositoryResult<Vec<WorkRecord>> {
        self.run(move |conn| stalled_blocking(conn, &query)).await
    }
}

// ==========================================
// 查询实现（同步）
// ==========================================

fn executed_sum() -> String {
    format!(
        "COALESCE(SUM(CASE WHEN status = '{}' THEN 1 ELSE 0 END), 0)",
        RecordStatus::Ejecutada.as_str()
    )
}

fn aggregate_blocking(
    conn: &Connection,
    query: &AggregationQuery,
) -> RepositoryResult<AggregationResponse> {
    let predicate = FilterPredicate::for_aggregation(&query.to_filter());

    let overall_sql = SqlQueryBuilder::new(&format!(
        "SELECT COUNT(*), {}, COUNT(DISTINCT NULLIF(installation, '')) FROM work_request",
        executed_sum()
    ))
    .where_all(&predicate.conditions)
    .build();

    let overall = conn.query_row(&overall_sql, params_from_iter(predicate.params.iter()), |row| {
        Ok(OverallRow {
            total: row.get::<_, i64>(0)? as u64,
            executed: row.get::<_, i64>(1)? as u64,
            coverage: row.get::<_, i64>(2)? as u64,
        })
    })?;

    let areas = grouped(conn, "area", "COUNT(*) DESC, k ASC", &predicate)?
        .into_iter()
        .map(|(area, total, executed)| AreaRow { area, total, executed })
        .collect();

    let supervisors = grouped(conn, "supervisor", "COUNT(*) DESC, k ASC", &predicate)?
        .into_iter()
        .map(|(supervisor, total, executed)| SupervisorRow {
            supervisor,
            total,
            executed,
        })
        .collect();

    let installations = grouped(conn, "installation", "COUNT(*) DESC, k ASC", &predicate)?
        .into_iter()
        .map(|(name, total, executed)| InstallationRow {
            name,
            total,
            executed,
            pending: total.saturating_sub(executed),
        })
        .collect();

    let months = grouped(conn, "substr(record_date, 1, 7)", "k ASC", &predicate)?
        .into_iter()
        .map(|(month_key, total, executed)| MonthRow {
            month_key,
            total,
            executed,
        })
        .collect();

    Ok(AggregationResponse {
        overall,
        areas,
        supervisors,
        installations,
        months,
    })
}

/// 按单一维度分组计数: (键, 总数, 已执行数)
fn grouped(
    conn: &Connection,
    key_expr: &str,
    order: &str,
    predicate: &FilterPredicate,
) -> RepositoryResult<Vec<(String, u64, u64)>> {
    let sql = SqlQueryBuilder::new(&format!(
        "SELECT {} AS k, COUNT(*), {} FROM work_request",
        key_expr,
        executed_sum()
    ))
    .where_all(&predicate.conditions)
    .group_by("k")
    .order_by(order)
    .build();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(predicate.params.iter()), |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)? as u64,
                row.get::<_, i64>(2)? as u64,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn table_page_blocking(conn: &Connection, query: &TablePageQuery) -> RepositoryResult<RecordPage> {
    let predicate =
        FilterPredicate::for_table(&query.filter, query.today, query.stale_threshold_days);

    let count_sql = SqlQueryBuilder::new("SELECT COUNT(*) FROM work_request")
        .where_all(&predicate.conditions)
        .build();
    let total: i64 =
        conn.query_row(&count_sql, params_from_iter(predicate.params.iter()), |row| row.get(0))?;

    let sql = SqlQueryBuilder::new(&format!("SELECT {} FROM work_request", RECORD_COLUMNS))
        .where_all(&predicate.conditions)
        .order_by("id DESC")
        .limit(query.limit)
        .offset(query.offset)
        .build();
    let records = select_records(conn, &sql, &predicate.params)?;

    Ok(RecordPage {
        records,
        total_count: total as u64,
    })
}

fn export_batch_blocking(
    conn: &Connection,
    query: &ExportBatchQuery,
) -> RepositoryResult<Vec<WorkRecord>> {
    let mut predicate =
        FilterPredicate::for_export(&query.filter, query.today, query.stale_threshold_days);
    if let Some(before_id) = query.before_id {
        predicate.conditions.push("id < ?".to_string());
        predicate.params.push(rusqlite::types::Value::Integer(before_id));
    }

    let sql = SqlQueryBuilder::new(&format!("SELECT {} FROM work_request", RECORD_COLUMNS))
        .where_all(&predicate.conditions)
        .order_by("id DESC")
        .limit(query.limit)
        .build();
    select_records(conn, &sql, &predicate.params)
}

fn stalled_blocking(conn: &Connection, query: &StalledQuery) -> RepositoryResult<Vec<WorkRecord>> {
    let predicate = FilterPredicate::for_stalled(query.today, query.stale_threshold_days);
    let sql = SqlQueryBuilder::new(&format!("SELECT {} FROM work_request", RECORD_COLUMNS))
        .where_all(&predicate.conditions)
        .order_by("record_date ASC, id ASC")
        .limit(query.limit)
        .build();
    select_records(conn, &sql, &predicate.params)
}

/// 未校验状态码的原始行
struct RawRecord {
    id: i64,
    record_date: NaiveDate,
    location: String,
    installation: String,
    area: String,
    supervisor: String,
    description: String,
    status: String,
}

impl RawRecord {
    fn into_record(self) -> RepositoryResult<WorkRecord> {
        let status = RecordStatus::parse(&self.status).ok_or_else(|| {
            RepositoryError::FieldValueError {
                field: "status".to_string(),
                message: format!("未知状态码 '{}' (id={})", self.status, self.id),
            }
        })?;
        Ok(WorkRecord {
            id: self.id,
            record_date: self.record_date,
            location: self.location,
            installation: self.installation,
            area: self.area,
            supervisor: self.supervisor,
            description: self.description,
            status,
        })
    }
}

fn select_records(
    conn: &Connection,
    sql: &str,
    params: &[rusqlite::types::Value],
) -> RepositoryResult<Vec<WorkRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map(params_from_iter(params.iter()), |row| {
            Ok(RawRecord {
                id: row.get(0)?,
                record_date: row.get(1)?,
                location: row.get(2)?,
                installation: row.get(3)?,
                area: row.get(4)?,
                supervisor: row.get(5)?,
                description: row.get(6)?,
                status: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter().map(RawRecord::into_record).collect()
}
