// ==========================================
// 运维工单分析驾驶舱 - 导出快照构建器
// ==========================================
// 职责: 以调用时刻的 FilterState 重新拉取完整（不分页）结果集，组装两页签文档
// - 摘要页: 元数据 + 生效过滤项 + KPI + 区域 Top N
// - 明细页: id/日期/位置/设施/区域/描述/状态，表格顺序（id 降序）
// 约束: 过滤条件在调用时按值绑定，之后的过滤变更不影响本次导出
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::domain::filter::FilterState;
use crate::domain::label::{label_breakdown, BreakdownLabel};
use crate::domain::metrics::MetricsSnapshot;
use crate::domain::record::WorkRecord;
use crate::domain::types::RecordStatus;
use crate::i18n::t;
use crate::repository::record_store::{ExportBatchQuery, RecordStore};

/// 导出文件名前缀
pub const EXPORT_FILE_PREFIX: &str = "reporte_solicitudes";

// ==========================================
// 文档结构
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub export_id: String,
    pub generated_at: NaiveDateTime,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub record_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveFilter {
    pub dimension: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportKpis {
    pub total: u64,
    pub executed: u64,
    pub pending: u64,
    pub completion_rate: f64,
    pub coverage: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSummary {
    pub metadata: ExportMetadata,
    pub active_filters: Vec<ActiveFilter>,
    pub kpis: ExportKpis,
    pub top_areas: Vec<BreakdownLabel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDetailRow {
    pub id: i64,
    pub date: NaiveDate,
    pub location: String,
    pub installation: String,
    pub area: String,
    pub description: String,
    pub status: RecordStatus,
}

impl From<WorkRecord> for ExportDetailRow {
    fn from(r: WorkRecord) -> Self {
        Self {
            id: r.id,
            date: r.record_date,
            location: r.location,
            installation: r.installation,
            area: r.area,
            description: r.description,
            status: r.status,
        }
    }
}

/// 导出文档
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    /// 文件名主体，编码日期范围
    pub file_stem: String,
    /// 绑定的过滤条件（调用时刻快照）
    pub filter: FilterState,
    pub summary: ExportSummary,
    pub detail: Vec<ExportDetailRow>,
}

impl ExportDocument {
    pub fn file_stem_for(filter: &FilterState) -> String {
        format!(
            "{}_{}_{}",
            EXPORT_FILE_PREFIX, filter.start_date, filter.end_date
        )
    }

    /// 摘要页 CSV（区块, 字段, 值）
    pub fn summary_csv(&self) -> ApiResult<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([
            t("export.summary.section"),
            t("export.summary.field"),
            t("export.summary.value"),
        ])
        .map_err(export_err)?;

        let meta = &self.summary.metadata;
        let section = t("export.section.metadata");
        let meta_rows = [
            ("export.meta.export_id", meta.export_id.clone()),
            ("export.meta.generated_at", meta.generated_at.to_string()),
            ("export.meta.period_start", meta.period_start.to_string()),
            ("export.meta.period_end", meta.period_end.to_string()),
            ("export.meta.record_count", meta.record_count.to_string()),
        ];
        for (key, value) in meta_rows {
            wtr.write_record([section.as_str(), t(key).as_str(), value.as_str()])
                .map_err(export_err)?;
        }

        let section = t("export.section.filters");
        for f in &self.summary.active_filters {
            wtr.write_record([section.as_str(), f.dimension.as_str(), f.value.as_str()])
                .map_err(export_err)?;
        }

        let k = &self.summary.kpis;
        let section = t("export.section.kpis");
        let kpi_rows = [
            ("export.kpi.total", k.total.to_string()),
            ("export.kpi.executed", k.executed.to_string()),
            ("export.kpi.pending", k.pending.to_string()),
            ("export.kpi.completion_rate", format!("{:.1}", k.completion_rate)),
            ("export.kpi.coverage", k.coverage.to_string()),
        ];
        for (key, value) in kpi_rows {
            wtr.write_record([section.as_str(), t(key).as_str(), value.as_str()])
                .map_err(export_err)?;
        }

        let section = t("export.section.top_areas");
        for area in &self.summary.top_areas {
            wtr.write_record([
                section.as_str(),
                area.label.as_str(),
                area.total.to_string().as_str(),
            ])
            .map_err(export_err)?;
        }

        finish(wtr)
    }

    /// 明细页 CSV
    pub fn detail_csv(&self) -> ApiResult<String> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record([
            t("export.detail.id"),
            t("export.detail.date"),
            t("export.detail.location"),
            t("export.detail.installation"),
            t("export.detail.area"),
            t("export.detail.description"),
            t("export.detail.status"),
        ])
        .map_err(export_err)?;

        for row in &self.detail {
            wtr.write_record([
                row.id.to_string().as_str(),
                row.date.to_string().as_str(),
                row.location.as_str(),
                row.installation.as_str(),
                row.area.as_str(),
                row.description.as_str(),
                row.status.as_str(),
            ])
            .map_err(export_err)?;
        }

        finish(wtr)
    }

    /// 写出两个页签文件，返回（摘要路径, 明细路径）
    pub fn write_csv(&self, dir: &Path) -> ApiResult<(PathBuf, PathBuf)> {
        let summary_path = dir.join(format!("{}_resumen.csv", self.file_stem));
        let detail_path = dir.join(format!("{}_detalle.csv", self.file_stem));

        std::fs::write(&summary_path, self.summary_csv()?)
            .map_err(|e| ApiError::ExportError(e.to_string()))?;
        std::fs::write(&detail_path, self.detail_csv()?)
            .map_err(|e| ApiError::ExportError(e.to_string()))?;

        tracing::info!(
            summary = %summary_path.display(),
            detail = %detail_path.display(),
            "导出文件已写出"
        );
        Ok((summary_path, detail_path))
    }

    pub fn to_json(&self) -> ApiResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ApiError::ExportError(e.to_string()))
    }
}

fn export_err(e: csv::Error) -> ApiError {
    ApiError::ExportError(e.to_string())
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> ApiResult<String> {
    let bytes = wtr
        .into_inner()
        .map_err(|e| ApiError::ExportError(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ApiError::ExportError(e.to_string()))
}

// ==========================================
// ExportSnapshotBuilder
// ==========================================

pub struct ExportSnapshotBuilder {
    store: Arc<dyn RecordStore>,
    batch_size: u32,
    top_areas: usize,
    stale_threshold_days: i64,
}

impl ExportSnapshotBuilder {
    pub fn new(
        store: Arc<dyn RecordStore>,
        batch_size: u32,
        top_areas: usize,
        stale_threshold_days: i64,
    ) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
            top_areas,
            stale_threshold_days,
        }
    }

    /// 构建导出文档
    ///
    /// `filter` 按值传入，`summary` 必须是针对同一 filter 计算的本期快照
    pub async fn build_export(
        &self,
        filter: FilterState,
        summary: MetricsSnapshot,
        today: NaiveDate,
        generated_at: NaiveDateTime,
    ) -> ApiResult<ExportDocument> {
        let export_id = Uuid::new_v4().to_string();
        tracing::info!(
            export_id = %export_id,
            start = %filter.start_date,
            end = %filter.end_date,
            critical_only = filter.critical_only,
            "开始导出"
        );

        let detail = self.collect_detail(&filter, today).await?;

        let doc = ExportDocument {
            file_stem: ExportDocument::file_stem_for(&filter),
            summary: ExportSummary {
                metadata: ExportMetadata {
                    export_id: export_id.clone(),
                    generated_at,
                    period_start: filter.start_date,
                    period_end: filter.end_date,
                    record_count: detail.len(),
                },
                active_filters: filter
                    .active_filters()
                    .into_iter()
                    .map(|(dimension, value)| ActiveFilter { dimension, value })
                    .collect(),
                kpis: ExportKpis {
                    total: summary.totals.count,
                    executed: summary.totals.executed_count,
                    pending: summary.totals.pending(),
                    completion_rate: summary.totals.completion_rate(),
                    coverage: summary.coverage,
                },
                top_areas: label_breakdown(
                    &summary.top_areas(self.top_areas),
                    summary.totals.count,
                ),
            },
            detail,
            filter,
        };

        tracing::info!(
            export_id = %export_id,
            rows = doc.detail.len(),
            "导出完成"
        );
        Ok(doc)
    }

    /// 键集分页拉取全部明细（id 降序）
    async fn collect_detail(
        &self,
        filter: &FilterState,
        today: NaiveDate,
    ) -> ApiResult<Vec<ExportDetailRow>> {
        let mut rows = Vec::new();
        let mut before_id = None;

        loop {
            let batch = self
                .store
                .fetch_export_batch(ExportBatchQuery {
                    filter: filter.clone(),
                    today,
                    stale_threshold_days: self.stale_threshold_days,
                    before_id,
                    limit: self.batch_size as u64,
                })
                .await
                .map_err(ApiError::export)?;

            let fetched = batch.len();
            before_id = batch.last().map(|r| r.id);
            rows.extend(batch.into_iter().map(ExportDetailRow::from));

            tracing::debug!(fetched, collected = rows.len(), "导出批次");
            if fetched < self.batch_size as usize || before_id.is_none() {
                break;
            }
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> ExportDocument {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let filter = FilterState::with_range(d, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()).unwrap();
        ExportDocument {
            file_stem: ExportDocument::file_stem_for(&filter),
            summary: ExportSummary {
                metadata: ExportMetadata {
                    export_id: "x".into(),
                    generated_at: d.and_hms_opt(8, 0, 0).unwrap(),
                    period_start: filter.start_date,
                    period_end: filter.end_date,
                    record_count: 1,
                },
                active_filters: vec![],
                kpis: ExportKpis {
                    total: 1,
                    executed: 0,
                    pending: 1,
                    completion_rate: 0.0,
                    coverage: 1,
                },
                top_areas: vec![BreakdownLabel::new("Civil", 1, 0, 1)],
            },
            detail: vec![ExportDetailRow {
                id: 7,
                date: d,
                location: "Patio, norte".into(),
                installation: "Planta 1".into(),
                area: "Civil".into(),
                description: "Fuga".into(),
                status: RecordStatus::Activa,
            }],
            filter,
        }
    }

    #[test]
    fn test_file_stem_encodes_range() {
        assert_eq!(doc().file_stem, "reporte_solicitudes_2024-01-01_2024-01-31");
    }

    #[test]
    fn test_detail_csv_rows() {
        let csv_text = doc().detail_csv().unwrap();
        let lines: Vec<&str> = csv_text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "7,2024-01-01,\"Patio, norte\",Planta 1,Civil,Fuga,ACTIVA");
    }

    #[test]
    fn test_summary_csv_contains_top_area_label() {
        let csv_text = doc().summary_csv().unwrap();
        assert!(csv_text.contains("Civil (100.0%)"));
    }

    #[test]
    fn test_write_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        let (summary, detail) = doc().write_csv(dir.path()).unwrap();
        assert!(summary.ends_with("reporte_solicitudes_2024-01-01_2024-01-31_resumen.csv"));
        assert!(std::fs::read_to_string(detail).unwrap().contains("Planta 1"));
    }
}
