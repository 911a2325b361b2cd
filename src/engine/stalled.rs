// ==========================================
// 运维工单分析驾驶舱 - 滞留工单监视器
// ==========================================
// 口径: 全局（不受当前过滤条件影响），未终结且等待天数超过阈值
// 排序: 最早的在前；条数上限由配置 stalled_cap 决定
// ==========================================

use chrono::NaiveDate;
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::record::StalledRecord;
use crate::repository::record_store::{RecordStore, StalledQuery};

pub struct StalledRecordsMonitor {
    store: Arc<dyn RecordStore>,
    stale_threshold_days: i64,
    cap: u32,
}

impl StalledRecordsMonitor {
    pub fn new(store: Arc<dyn RecordStore>, stale_threshold_days: i64, cap: u32) -> Self {
        Self {
            store,
            stale_threshold_days,
            cap,
        }
    }

    pub async fn fetch(&self, today: NaiveDate) -> ApiResult<Vec<StalledRecord>> {
        let records = self
            .store
            .fetch_stalled(StalledQuery {
                today,
                stale_threshold_days: self.stale_threshold_days,
                limit: self.cap as u64,
            })
            .await
            .map_err(ApiError::table_fetch)?;

        tracing::debug!(count = records.len(), "滞留工单已刷新");
        Ok(records
            .iter()
            .map(|r| StalledRecord::project(r, today))
            .collect())
    }
}
