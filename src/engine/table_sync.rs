// ==========================================
// 运维工单分析驾驶舱 - 分页表格同步器
// ==========================================
// 职责: 按当前 FilterState 拉取一页待处理工单
// 口径: 与本期聚合相同的过滤谓词 + 排除终结状态（+ 可选滞留限制）
// 排序: id 降序（最新在前）
// 越界页码钳制到最后一页，不报错
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::filter::FilterState;
use crate::domain::record::{PageCursor, TableRow};
use crate::repository::record_store::{RecordStore, TablePageQuery};

/// 一页表格数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TablePage {
    pub rows: Vec<TableRow>,
    /// 实际返回的页（已钳制），total_count 为过滤后的精确总数
    pub cursor: PageCursor,
}

impl TablePage {
    pub fn empty(page_size: u32) -> Self {
        Self {
            rows: Vec::new(),
            cursor: PageCursor::first(page_size),
        }
    }
}

/// 分页表格同步器
pub struct PaginatedTableSynchronizer {
    store: Arc<dyn RecordStore>,
    page_size: u32,
    stale_threshold_days: i64,
}

impl PaginatedTableSynchronizer {
    pub fn new(store: Arc<dyn RecordStore>, page_size: u32, stale_threshold_days: i64) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            stale_threshold_days,
        }
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// 拉取指定页
    ///
    /// 请求页超出总页数时，以钳制后的页码再查一次
    pub async fn fetch_page(
        &self,
        filter: &FilterState,
        page_number: u32,
        today: NaiveDate,
    ) -> ApiResult<TablePage> {
        let requested = PageCursor::first(self.page_size).with_page(page_number);
        let page = self
            .store
            .fetch_table_page(self.query(filter, &requested, today))
            .await
            .map_err(ApiError::table_fetch)?;

        let mut cursor = requested.clamped(page.total_count);
        let records = if cursor.page_number != requested.page_number {
            tracing::debug!(
                requested = requested.page_number,
                clamped = cursor.page_number,
                total = page.total_count,
                "请求页越界，钳制到最后一页"
            );
            let retry = self
                .store
                .fetch_table_page(self.query(filter, &cursor, today))
                .await
                .map_err(ApiError::table_fetch)?;
            cursor = cursor.clamped(retry.total_count);
            retry.records
        } else {
            page.records
        };

        let rows = records
            .iter()
            .map(|record| TableRow::project(record, today))
            .collect();

        Ok(TablePage { rows, cursor })
    }

    fn query(&self, filter: &FilterState, cursor: &PageCursor, today: NaiveDate) -> TablePageQuery {
        TablePageQuery {
            filter: filter.clone(),
            today,
            stale_threshold_days: self.stale_threshold_days,
            offset: cursor.offset(),
            limit: self.page_size as u64,
        }
    }
}
