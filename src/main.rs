// ==========================================
// 运维工单分析驾驶舱 - 无界面启动入口
// ==========================================
// 用法:
//   ops-console [db_path] [export_dir]
// 初始化日志、打开数据库、加载配置，输出年初至今的指标摘要；
// 指定 export_dir 时同时写出导出文件
// ==========================================

use chrono::Local;
use std::error::Error;
use std::path::PathBuf;

use ops_console::api::ExportRequest;
use ops_console::app::{get_default_db_path, AppState};
use ops_console::domain::FilterState;
use ops_console::{logging, APP_NAME, VERSION};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", APP_NAME, VERSION);
    tracing::info!("==================================================");

    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(get_default_db_path);
    let export_dir = args.next().map(PathBuf::from);

    tracing::info!(db_path = %db_path, "使用数据库");
    let state = AppState::new(db_path)?;

    let today = Local::now().date_naive();
    let filter = FilterState::year_to_date(today);
    let api = state.dashboard_api.clone();

    let metrics = api.load_metrics(&filter).await?;
    let totals = &metrics.current.totals;
    tracing::info!(
        start = %filter.start_date,
        end = %filter.end_date,
        total = totals.count,
        executed = totals.executed_count,
        pending = totals.pending(),
        completion_rate = format!("{:.1}", totals.completion_rate()),
        coverage = metrics.current.coverage,
        "年初至今指标"
    );
    tracing::info!(
        total_pct = format!("{:+.1}", metrics.comparison.total_count_pct),
        completion_points = format!("{:+.1}", metrics.comparison.completion_rate_points),
        "环比上期"
    );

    let stalled = api.list_stalled(today).await?;
    for record in &stalled {
        tracing::info!(
            id = record.id,
            area = %record.area,
            dias_espera = record.dias_espera,
            priority = ?record.priority,
            "滞留工单"
        );
    }

    if let Some(dir) = export_dir {
        std::fs::create_dir_all(&dir)?;
        let request = ExportRequest {
            filter,
            displayed: Some(metrics),
        };
        let doc = api
            .build_export(request, today, Local::now().naive_local())
            .await?;
        let (summary, detail) = doc.write_csv(&dir)?;
        tracing::info!(
            summary = %summary.display(),
            detail = %detail.display(),
            rows = doc.detail.len(),
            "导出完成"
        );
    }

    Ok(())
}
