// ==========================================
// ConsoleSession 集成测试
// ==========================================
// 测试范围:
// 1. 乱序响应: 慢的旧请求不能覆盖快的新请求
// 2. 防抖: 连续过滤变更合并为一次取数
// 3. 失败提示: 保留上次数据，提示可关闭
// 4. SQLite 端到端: 挂载、下钻、翻页钳制
// 5. 导出: 绑定调用时刻的过滤条件
// ==========================================


use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ops_console::api::DashboardApi;
use ops_console::app::{ConsoleAction, ConsoleSession, ConsoleView};
use ops_console::config::ConsoleConfig;
use ops_console::domain::{BreakdownDimension, FilterAction, WorkRecord};
use ops_console::repository::{
    AggregationQuery, AggregationResponse, AreaRow, ExportBatchQuery, OverallRow, RecordPage,
    RecordStore, RepositoryError, RepositoryResult, StalledQuery, TablePageQuery,
};
use test_helpers::{active_records, d, seeded_store, RecordBuilder};

const WAIT: Duration = Duration::from_secs(5);

// ==========================================
// 脚本化数据服务
// ==========================================
// 区域 X 的聚合与分页慢（300ms），其余快；区域 FAIL 的聚合返回错误

#[derive(Default)]
struct ScriptedStore {
    aggregate_calls: AtomicUsize,
    table_calls: AtomicUsize,
}

impl ScriptedStore {
    fn aggregate_calls(&self) -> usize {
        self.aggregate_calls.load(Ordering::SeqCst)
    }

    fn table_calls(&self) -> usize {
        self.table_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn aggregate(&self, query: AggregationQuery) -> RepositoryResult<AggregationResponse> {
        self.aggregate_calls.fetch_add(1, Ordering::SeqCst);
        let area = query.area.as_deref();
        let delay = match area {
            Some("X") => Duration::from_millis(300),
            _ => Duration::from_millis(10),
        };
        tokio::time::sleep(delay).await;

        if area == Some("FAIL") {
            return Err(RepositoryError::DatabaseQueryError("连接超时".to_string()));
        }

        let (name, total) = match area {
            None => ("Todas", 10),
            Some("X") => ("X", 1),
            Some("Y") => ("Y", 2),
            Some(other) => (other, 3),
        };
        Ok(AggregationResponse {
            overall: OverallRow {
                total,
                executed: 0,
                coverage: 1,
            },
            areas: vec![AreaRow {
                area: name.to_string(),
                total,
                executed: 0,
            }],
            ..AggregationResponse::default()
        })
    }

    async fn fetch_table_page(&self, query: TablePageQuery) -> RepositoryResult<RecordPage> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        let area = query.filter.area.clone();
        let delay = match area.as_deref() {
            Some("X") => Duration::from_millis(300),
            _ => Duration::from_millis(5),
        };
        tokio::time::sleep(delay).await;

        // 每个区域返回一条该区域的工单，总数按区域区分
        let (name, total) = match area.as_deref() {
            None => ("Todas", 10),
            Some("X") => ("X", 1),
            Some("Y") => ("Y", 2),
            Some(other) => (other, 3),
        };
        Ok(RecordPage {
            records: vec![RecordBuilder::new(1, d(2024, 6, 1)).area(name).build()],
            total_count: total,
        })
    }

    async fn fetch_export_batch(&self, _query: ExportBatchQuery) -> RepositoryResult<Vec<WorkRecord>> {
        Ok(Vec::new())
    }

    async fn fetch_stalled(&self, _query: StalledQuery) -> RepositoryResult<Vec<WorkRecord>> {
        Ok(Vec::new())
    }
}

fn settled(view: &ConsoleView) -> bool {
    view.metrics.is_some() && !view.metrics_loading && !view.table_loading
}

fn select_area(key: &str) -> ConsoleAction {
    ConsoleAction::Filter {
        action: FilterAction::Select {
            dimension: BreakdownDimension::Area,
            key: key.to_string(),
        },
    }
}

fn metrics_area(view: &ConsoleView) -> Option<String> {
    view.metrics.as_ref().and_then(|m| m.filter.area.clone())
}

fn scripted_session(debounce: Duration) -> (Arc<ScriptedStore>, ConsoleSession) {
    let store = Arc::new(ScriptedStore::default());
    let api = Arc::new(DashboardApi::new(store.clone(), &ConsoleConfig::default()));
    let (session, _handle) = ConsoleSession::spawn(api, d(2024, 6, 30), debounce);
    (store, session)
}

// ==========================================
// 乱序与防抖
// ==========================================

#[tokio::test]
async fn test_slow_stale_response_is_discarded() {
    let (_store, session) = scripted_session(Duration::ZERO);
    session.wait_for(WAIT, settled).await.unwrap();

    session.dispatch(select_area("X")).await.unwrap();
    session.dispatch(select_area("Y")).await.unwrap();

    let view = session
        .wait_for(WAIT, |v| settled(v) && metrics_area(v).as_deref() == Some("Y"))
        .await
        .unwrap();
    assert_eq!(view.filter.area.as_deref(), Some("Y"));

    // 等 X 的慢响应到达，视图仍属于 Y
    tokio::time::sleep(Duration::from_millis(500)).await;
    let view = session.view();
    assert_eq!(metrics_area(&view).as_deref(), Some("Y"));
    assert_eq!(view.metrics.as_ref().unwrap().current.totals.count, 2);
    assert_eq!(view.filter_generation, 3);
}

#[tokio::test]
async fn test_slow_stale_table_page_is_discarded() {
    let (_store, session) = scripted_session(Duration::ZERO);
    session.wait_for(WAIT, settled).await.unwrap();

    session.dispatch(select_area("X")).await.unwrap();
    session.dispatch(select_area("Y")).await.unwrap();

    session
        .wait_for(WAIT, |v| {
            !v.table_loading && v.rows.first().map(|r| r.area.as_str()) == Some("Y")
        })
        .await
        .unwrap();

    // X 的表格响应晚到，不能覆盖 Y 的表格
    tokio::time::sleep(Duration::from_millis(500)).await;
    let view = session.view();
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].area, "Y");
    assert_eq!(view.cursor.total_count, 2);
    assert_eq!(view.cursor.page_number, 1);
}

#[tokio::test]
async fn test_rapid_filter_changes_coalesce() {
    let (store, session) = scripted_session(Duration::from_millis(100));
    session.wait_for(WAIT, settled).await.unwrap();
    assert_eq!(store.aggregate_calls(), 2);
    assert_eq!(store.table_calls(), 1);

    session.dispatch(select_area("A")).await.unwrap();
    session.dispatch(select_area("B")).await.unwrap();
    session.dispatch(select_area("C")).await.unwrap();

    session
        .wait_for(WAIT, |v| settled(v) && metrics_area(v).as_deref() == Some("C"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // 本期 + 上期各一次
    assert_eq!(store.aggregate_calls(), 4);
    assert_eq!(store.table_calls(), 2);
}

#[tokio::test]
async fn test_critical_only_refreshes_table_only() {
    let (store, session) = scripted_session(Duration::ZERO);
    session.wait_for(WAIT, settled).await.unwrap();
    let generation = session.view().filter_generation;

    session
        .dispatch(ConsoleAction::Filter {
            action: FilterAction::SetCriticalOnly(true),
        })
        .await
        .unwrap();
    let view = session
        .wait_for(WAIT, |v| v.filter.critical_only && !v.table_loading)
        .await
        .unwrap();

    assert_eq!(view.filter_generation, generation);
    assert_eq!(store.aggregate_calls(), 2);
    assert_eq!(store.table_calls(), 2);
}

// ==========================================
// 失败提示
// ==========================================

#[tokio::test]
async fn test_failed_cycle_keeps_previous_metrics() {
    let (_store, session) = scripted_session(Duration::ZERO);
    session.wait_for(WAIT, settled).await.unwrap();

    session.dispatch(select_area("FAIL")).await.unwrap();
    let view = session
        .wait_for(WAIT, |v| !v.notices.is_empty() && !v.metrics_loading)
        .await
        .unwrap();

    assert_eq!(view.filter.area.as_deref(), Some("FAIL"));
    assert_eq!(metrics_area(&view), None);
    assert_eq!(view.metrics.as_ref().unwrap().current.totals.count, 10);
    assert_eq!(view.notices[0].code, "AGGREGATION_ERROR");

    let id = view.notices[0].id;
    session
        .dispatch(ConsoleAction::DismissNotice { id })
        .await
        .unwrap();
    session
        .wait_for(WAIT, |v| v.notices.is_empty())
        .await
        .unwrap();
}

// ==========================================
// SQLite 端到端
// ==========================================

fn sqlite_session(
    records: &[WorkRecord],
    config: ConsoleConfig,
    debounce: Duration,
) -> (tempfile::NamedTempFile, ConsoleSession) {
    let (file, _path, store) = seeded_store(records).unwrap();
    let api = Arc::new(DashboardApi::new(store, &config));
    let (session, _handle) = ConsoleSession::spawn(api, d(2024, 6, 30), debounce);
    (file, session)
}

fn mixed_records() -> Vec<WorkRecord> {
    let mut records = active_records(1, 2, d(2024, 6, 1), "Civil");
    records.extend(active_records(3, 3, d(2024, 6, 25), "Eléctrica"));
    records
}

#[tokio::test]
async fn test_mount_and_drill_down_over_sqlite() {
    let (_file, session) = sqlite_session(&mixed_records(), ConsoleConfig::default(), Duration::ZERO);

    let view = session.wait_for(WAIT, settled).await.unwrap();
    assert_eq!(view.metrics.as_ref().unwrap().current.totals.count, 5);
    assert_eq!(view.rows.len(), 5);
    // 两条 Civil 均已等待 29 天
    assert_eq!(view.stalled.len(), 2);

    let areas = &view.breakdowns.as_ref().unwrap().areas;
    assert_eq!(areas[0].label, "Eléctrica (60.0%)");

    session
        .dispatch(ConsoleAction::DrillDown {
            dimension: BreakdownDimension::Area,
            label: areas[0].label.clone(),
        })
        .await
        .unwrap();
    let view = session
        .wait_for(WAIT, |v| settled(v) && metrics_area(v).as_deref() == Some("Eléctrica"))
        .await
        .unwrap();
    assert_eq!(view.rows.len(), 3);
    assert_eq!(view.cursor.page_number, 1);

    // 再次选中同一条目是幂等的，不触发取数
    let generation = view.filter_generation;
    session
        .dispatch(ConsoleAction::DrillDown {
            dimension: BreakdownDimension::Area,
            label: "Eléctrica".to_string(),
        })
        .await
        .unwrap();
    session
        .dispatch(ConsoleAction::Filter {
            action: FilterAction::Clear(BreakdownDimension::Area),
        })
        .await
        .unwrap();
    let view = session
        .wait_for(WAIT, |v| settled(v) && v.filter.area.is_none() && metrics_area(v).is_none())
        .await
        .unwrap();
    assert_eq!(view.filter_generation, generation + 1);
    assert_eq!(view.rows.len(), 5);
}

#[tokio::test]
async fn test_go_to_page_is_clamped() {
    let config = ConsoleConfig {
        page_size: 2,
        ..ConsoleConfig::default()
    };
    let (_file, session) = sqlite_session(&mixed_records(), config, Duration::ZERO);
    session.wait_for(WAIT, settled).await.unwrap();

    session
        .dispatch(ConsoleAction::GoToPage { page: 9 })
        .await
        .unwrap();
    let view = session
        .wait_for(WAIT, |v| !v.table_loading && v.cursor.page_number != 1)
        .await
        .unwrap();
    assert_eq!(view.cursor.page_number, 3);
    assert_eq!(view.cursor.total_count, 5);
    assert_eq!(view.rows.len(), 1);
}

#[tokio::test]
async fn test_export_binds_filter_at_invocation() {
    let (_file, session) = sqlite_session(
        &mixed_records(),
        ConsoleConfig::default(),
        Duration::from_millis(200),
    );
    session.wait_for(WAIT, settled).await.unwrap();

    // 过滤变更的取数仍在防抖中，导出已按新条件绑定
    session.dispatch(select_area("Civil")).await.unwrap();
    let export = session.export();
    let clear = session.dispatch(ConsoleAction::Filter {
        action: FilterAction::Clear(BreakdownDimension::Area),
    });
    let (doc, cleared) = tokio::join!(export, clear);
    cleared.unwrap();
    let doc = doc.unwrap();

    assert_eq!(doc.filter.area.as_deref(), Some("Civil"));
    assert_eq!(doc.detail.len(), 2);
    assert!(doc.detail.iter().all(|r| r.area == "Civil"));
    assert_eq!(doc.summary.kpis.total, 2);

    let view = session
        .wait_for(WAIT, |v| settled(v) && v.filter.area.is_none())
        .await
        .unwrap();
    assert_eq!(view.metrics.as_ref().unwrap().current.totals.count, 5);
}
