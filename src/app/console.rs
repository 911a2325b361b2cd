// ==========================================
// 运维工单分析驾驶舱 - 状态容器
// ==========================================
// 职责: 持有 FilterState / 分页游标 / 两个代次计数，所有变更经 dispatch 进入
// 取数: dispatch 只返回 FetchCommand，由会话层执行；响应经 apply_* 回写
// 代次:
// - filter_generation: 指标周期使用，聚合口径变化或刷新时递增
// - table_generation: 表格使用，过滤触发与翻页触发共用
// - stalled_generation: 滞留面板使用，挂载与刷新时递增
// 响应携带的代次与当前不一致即丢弃（按因果顺序的最后写入生效）
// 失败: 保留上一次成功的数据，追加可关闭提示
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::dashboard_api::{BreakdownViews, DashboardMetrics, ExportRequest};
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::domain::filter::{FilterAction, FilterState};
use crate::domain::record::{PageCursor, StalledRecord, TableRow};
use crate::domain::types::BreakdownDimension;
use crate::engine::{DrillDownCorrelator, TablePage};
use crate::i18n::t_with_args;

// ==========================================
// 动作与取数指令
// ==========================================

/// 状态容器的唯一输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsoleAction {
    Filter { action: FilterAction },
    /// 多个过滤动作原子生效，只触发一次取数
    Batch { actions: Vec<FilterAction> },
    /// 分组条目被点击（label 可能带百分比后缀）
    DrillDown {
        dimension: BreakdownDimension,
        label: String,
    },
    GoToPage { page: u32 },
    Refresh,
    DismissNotice { id: u64 },
}

impl ConsoleAction {
    /// 是否为过滤类变更（会话层对其做防抖）
    pub fn is_filter_change(&self) -> bool {
        matches!(
            self,
            ConsoleAction::Filter { .. } | ConsoleAction::Batch { .. } | ConsoleAction::DrillDown { .. }
        )
    }
}

/// 由状态派生的取数指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCommand {
    Metrics {
        generation: u64,
        filter: FilterState,
    },
    TablePage {
        generation: u64,
        filter: FilterState,
        page: u32,
    },
    Stalled {
        generation: u64,
    },
}

/// 可关闭的提示条
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: u64,
    pub code: String,
    pub message: String,
}

/// 对外发布的只读视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleView {
    pub filter: FilterState,
    pub cursor: PageCursor,
    pub metrics: Option<DashboardMetrics>,
    pub breakdowns: Option<BreakdownViews>,
    pub rows: Vec<TableRow>,
    pub stalled: Vec<StalledRecord>,
    pub notices: Vec<Notice>,
    pub metrics_loading: bool,
    pub table_loading: bool,
    pub filter_generation: u64,
    pub table_generation: u64,
}

// ==========================================
// ConsoleStore
// ==========================================

pub struct ConsoleStore {
    today: NaiveDate,
    filter: FilterState,
    cursor: PageCursor,
    filter_generation: u64,
    table_generation: u64,
    stalled_generation: u64,
    metrics: Option<DashboardMetrics>,
    breakdowns: Option<BreakdownViews>,
    rows: Vec<TableRow>,
    stalled: Vec<StalledRecord>,
    notices: Vec<Notice>,
    next_notice_id: u64,
    metrics_loading: bool,
    table_loading: bool,
}

impl ConsoleStore {
    /// 初始状态: 年初至今，第 1 页
    pub fn new(today: NaiveDate, page_size: u32) -> Self {
        Self {
            today,
            filter: FilterState::year_to_date(today),
            cursor: PageCursor::first(page_size),
            filter_generation: 0,
            table_generation: 0,
            stalled_generation: 0,
            metrics: None,
            breakdowns: None,
            rows: Vec::new(),
            stalled: Vec::new(),
            notices: Vec::new(),
            next_notice_id: 1,
            metrics_loading: false,
            table_loading: false,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// 挂载: 拉取指标、第 1 页与滞留面板
    pub fn mount(&mut self) -> Vec<FetchCommand> {
        self.dispatch(ConsoleAction::Refresh)
    }

    /// 唯一变更入口
    pub fn dispatch(&mut self, action: ConsoleAction) -> Vec<FetchCommand> {
        match action {
            ConsoleAction::Filter { action } => self.apply_filter_actions(&[action]),
            ConsoleAction::Batch { actions } => self.apply_filter_actions(&actions),
            ConsoleAction::DrillDown { dimension, label } => {
                let action = DrillDownCorrelator::action_for_label(&label, dimension);
                self.apply_filter_actions(&[action])
            }
            ConsoleAction::GoToPage { page } => self.go_to_page(page),
            ConsoleAction::Refresh => {
                self.filter_generation += 1;
                self.table_generation += 1;
                self.stalled_generation += 1;
                self.metrics_loading = true;
                self.table_loading = true;
                tracing::debug!(
                    generation = self.filter_generation,
                    page = self.cursor.page_number,
                    "刷新"
                );
                vec![
                    self.metrics_command(),
                    self.table_command(),
                    FetchCommand::Stalled {
                        generation: self.stalled_generation,
                    },
                ]
            }
            ConsoleAction::DismissNotice { id } => {
                self.notices.retain(|n| n.id != id);
                Vec::new()
            }
        }
    }

    fn apply_filter_actions(&mut self, actions: &[FilterAction]) -> Vec<FetchCommand> {
        let mut next = self.filter.clone();
        for action in actions {
            match next.apply(action) {
                Ok(applied) => next = applied,
                Err(e) => {
                    tracing::warn!(error = %e, "过滤动作被拒绝");
                    self.push_notice(&ApiError::from(e).to_response());
                    return Vec::new();
                }
            }
        }

        if next == self.filter {
            return Vec::new();
        }

        let scope_changed = !next.same_aggregation_scope(&self.filter);
        self.filter = next;
        // 旧过滤条件的总数作废，等新条件的首页返回后再用于钳制
        self.cursor = PageCursor::first(self.cursor.page_size);
        self.table_generation += 1;
        self.table_loading = true;

        let mut commands = Vec::with_capacity(2);
        if scope_changed {
            self.filter_generation += 1;
            self.metrics_loading = true;
            commands.push(self.metrics_command());
        }
        commands.push(self.table_command());

        tracing::debug!(
            generation = self.filter_generation,
            table_generation = self.table_generation,
            scope_changed,
            "过滤条件变更，页码重置为 1"
        );
        commands
    }

    fn go_to_page(&mut self, page: u32) -> Vec<FetchCommand> {
        let cursor = if self.cursor.total_count > 0 {
            self.cursor.with_page(page).clamped(self.cursor.total_count)
        } else {
            self.cursor.with_page(page)
        };
        self.cursor = cursor;
        self.table_generation += 1;
        self.table_loading = true;
        tracing::debug!(
            table_generation = self.table_generation,
            page = cursor.page_number,
            total = cursor.total_count,
            "翻页"
        );
        vec![self.table_command()]
    }

    /// 指令的代次是否仍是当前代次
    pub fn is_current(&self, command: &FetchCommand) -> bool {
        match command {
            FetchCommand::Metrics { generation, .. } => *generation == self.filter_generation,
            FetchCommand::TablePage { generation, .. } => *generation == self.table_generation,
            FetchCommand::Stalled { generation } => *generation == self.stalled_generation,
        }
    }

    fn metrics_command(&self) -> FetchCommand {
        FetchCommand::Metrics {
            generation: self.filter_generation,
            filter: self.filter.clone(),
        }
    }

    fn table_command(&self) -> FetchCommand {
        FetchCommand::TablePage {
            generation: self.table_generation,
            filter: self.filter.clone(),
            page: self.cursor.page_number,
        }
    }

    // ==========================================
    // 响应回写
    // ==========================================

    /// 回写指标结果；返回是否被采纳
    pub fn apply_metrics(&mut self, generation: u64, result: ApiResult<DashboardMetrics>) -> bool {
        if generation != self.filter_generation {
            tracing::debug!(
                generation,
                current = self.filter_generation,
                "丢弃过期的指标响应"
            );
            return false;
        }

        self.metrics_loading = false;
        match result {
            Ok(metrics) => {
                self.breakdowns = Some(BreakdownViews::from_snapshot(&metrics.current));
                self.metrics = Some(metrics);
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "指标周期失败，保留上次结果");
                self.push_notice(&e.to_response());
            }
        }
        true
    }

    /// 回写表格结果；返回是否被采纳
    pub fn apply_page(&mut self, generation: u64, result: ApiResult<TablePage>) -> bool {
        if generation != self.table_generation {
            tracing::debug!(
                generation,
                current = self.table_generation,
                "丢弃过期的表格响应"
            );
            return false;
        }

        self.table_loading = false;
        match result {
            Ok(page) => {
                tracing::debug!(
                    generation,
                    page = page.cursor.page_number,
                    total = page.cursor.total_count,
                    "表格已更新"
                );
                self.cursor = page.cursor;
                self.rows = page.rows;
            }
            Err(e) => {
                tracing::warn!(generation, error = %e, "表格取数失败，保留上一页");
                self.push_notice(&e.to_response());
            }
        }
        true
    }

    /// 回写滞留面板结果；返回是否被采纳
    pub fn apply_stalled(&mut self, generation: u64, result: ApiResult<Vec<StalledRecord>>) -> bool {
        if generation != self.stalled_generation {
            tracing::debug!(
                generation,
                current = self.stalled_generation,
                "丢弃过期的滞留面板响应"
            );
            return false;
        }

        match result {
            Ok(records) => self.stalled = records,
            Err(e) => {
                tracing::warn!(error = %e, "滞留工单刷新失败");
                self.push_notice(&e.to_response());
            }
        }
        true
    }

    /// 导出失败只追加提示，不触碰已展示数据
    pub fn report_export_failure(&mut self, error: &ErrorResponse) {
        self.push_notice(error);
    }

    /// 导出请求: 绑定调用时刻的过滤条件
    pub fn export_request(&self) -> ExportRequest {
        ExportRequest {
            filter: self.filter.clone(),
            displayed: self.metrics.clone(),
        }
    }

    pub fn view(&self) -> ConsoleView {
        ConsoleView {
            filter: self.filter.clone(),
            cursor: self.cursor,
            metrics: self.metrics.clone(),
            breakdowns: self.breakdowns.clone(),
            rows: self.rows.clone(),
            stalled: self.stalled.clone(),
            notices: self.notices.clone(),
            metrics_loading: self.metrics_loading,
            table_loading: self.table_loading,
            filter_generation: self.filter_generation,
            table_generation: self.table_generation,
        }
    }

    fn push_notice(&mut self, error: &ErrorResponse) {
        let id = self.next_notice_id;
        self.next_notice_id += 1;
        self.notices.push(Notice {
            id,
            code: error.code.clone(),
            message: notice_message(&error.code, &error.message),
        });
    }
}

fn notice_message(code: &str, reason: &str) -> String {
    let key = match code {
        "AGGREGATION_ERROR" => "notice.aggregation_failed",
        "TABLE_FETCH_ERROR" => "notice.table_failed",
        "EXPORT_ERROR" => "notice.export_failed",
        "INVALID_INPUT" => "notice.invalid_filter",
        _ => "notice.unexpected",
    };
    t_with_args(key, &[("reason", reason)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::metrics::{ComparisonDelta, MetricsSnapshot};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn metrics_for(filter: &FilterState, total: u64) -> DashboardMetrics {
        let mut current = MetricsSnapshot::empty(filter.start_date, filter.end_date);
        current.totals.count = total;
        let previous = MetricsSnapshot::empty(filter.start_date, filter.end_date);
        DashboardMetrics {
            filter: filter.clone(),
            comparison: ComparisonDelta {
                total_count_pct: 0.0,
                executed_count_pct: 0.0,
                pending_count_pct: 0.0,
                coverage_pct: 0.0,
                current_completion_rate: 0.0,
                previous_completion_rate: 0.0,
                completion_rate_points: 0.0,
                by_area: Vec::new(),
            },
            current,
            previous,
        }
    }

    fn metrics_gen(commands: &[FetchCommand]) -> Option<(u64, FilterState)> {
        commands.iter().find_map(|c| match c {
            FetchCommand::Metrics { generation, filter } => Some((*generation, filter.clone())),
            _ => None,
        })
    }

    fn table_gen(commands: &[FetchCommand]) -> Option<(u64, u32)> {
        commands.iter().find_map(|c| match c {
            FetchCommand::TablePage {
                generation, page, ..
            } => Some((*generation, *page)),
            _ => None,
        })
    }

    fn select_area(key: &str) -> ConsoleAction {
        ConsoleAction::Filter {
            action: FilterAction::Select {
                dimension: BreakdownDimension::Area,
                key: key.into(),
            },
        }
    }

    #[test]
    fn test_mount_issues_all_fetches() {
        let mut store = ConsoleStore::new(today(), 20);
        let commands = store.mount();
        assert_eq!(commands.len(), 3);
        assert!(commands.contains(&FetchCommand::Stalled { generation: 1 }));
        assert_eq!(table_gen(&commands), Some((1, 1)));
    }

    #[test]
    fn test_out_of_order_metrics_keep_latest() {
        let mut store = ConsoleStore::new(today(), 20);
        store.mount();

        let (gen_a, filter_a) = metrics_gen(&store.dispatch(select_area("X"))).unwrap();
        let (gen_b, filter_b) = metrics_gen(&store.dispatch(select_area("Y"))).unwrap();

        // B 先返回，A 后返回
        assert!(store.apply_metrics(gen_b, Ok(metrics_for(&filter_b, 2))));
        assert!(!store.apply_metrics(gen_a, Ok(metrics_for(&filter_a, 1))));

        let view = store.view();
        assert_eq!(view.filter.area.as_deref(), Some("Y"));
        let metrics = view.metrics.unwrap();
        assert_eq!(metrics.filter.area.as_deref(), Some("Y"));
        assert_eq!(metrics.current.totals.count, 2);
    }

    #[test]
    fn test_filter_change_resets_page() {
        let mut store = ConsoleStore::new(today(), 20);
        let (gen, _) = table_gen(&store.mount()).unwrap();
        store.apply_page(
            gen,
            Ok(TablePage {
                rows: Vec::new(),
                cursor: PageCursor {
                    page_number: 1,
                    page_size: 20,
                    total_count: 95,
                },
            }),
        );

        let (_, page) = table_gen(&store.dispatch(ConsoleAction::GoToPage { page: 3 })).unwrap();
        assert_eq!(page, 3);
        // 翻页不改变过滤派生的总数
        assert_eq!(store.cursor().total_count, 95);

        let commands = store.dispatch(select_area("Civil"));
        assert_eq!(table_gen(&commands).map(|(_, p)| p), Some(1));
        assert_eq!(store.cursor().page_number, 1);
    }

    fn page_of(area: &str, total: u64) -> TablePage {
        TablePage {
            rows: vec![TableRow {
                id: 1,
                date: today(),
                location: "Piso 1".into(),
                area: area.into(),
                supervisor: "Rojas".into(),
                status: crate::domain::types::RecordStatus::Activa,
                age_days: 0,
                priority: crate::domain::types::Priority::Normal,
            }],
            cursor: PageCursor {
                page_number: 1,
                page_size: 20,
                total_count: total,
            },
        }
    }

    #[test]
    fn test_page_change_after_filter_change_ignores_old_total() {
        let mut store = ConsoleStore::new(today(), 20);
        let (gen, _) = table_gen(&store.mount()).unwrap();
        store.apply_page(gen, Ok(page_of("Todas", 41)));

        store.dispatch(select_area("Civil"));
        assert_eq!(store.cursor(), PageCursor::first(20));

        // 新条件首页未返回前翻页，页码原样发出，由取数侧钳制
        let (_, page) = table_gen(&store.dispatch(ConsoleAction::GoToPage { page: 8 })).unwrap();
        assert_eq!(page, 8);
    }

    #[test]
    fn test_out_of_order_table_pages_keep_latest() {
        let mut store = ConsoleStore::new(today(), 20);
        store.mount();

        let (gen_x, _) = table_gen(&store.dispatch(select_area("X"))).unwrap();
        let (gen_y, _) = table_gen(&store.dispatch(select_area("Y"))).unwrap();

        assert!(store.apply_page(gen_y, Ok(page_of("Y", 7))));
        let before = store.view();
        assert!(!store.apply_page(gen_x, Ok(page_of("X", 99))));

        let view = store.view();
        assert_eq!(view.rows, before.rows);
        assert_eq!(view.cursor, before.cursor);
        assert_eq!(view.rows[0].area, "Y");
        assert_eq!(view.cursor.total_count, 7);
    }

    #[test]
    fn test_stale_stalled_response_is_dropped() {
        let mut store = ConsoleStore::new(today(), 20);
        let stalled_gen = |commands: &[FetchCommand]| {
            commands.iter().find_map(|c| match c {
                FetchCommand::Stalled { generation } => Some(*generation),
                _ => None,
            })
        };
        let first = stalled_gen(&store.mount()).unwrap();
        let second = stalled_gen(&store.dispatch(ConsoleAction::Refresh)).unwrap();

        let record = StalledRecord {
            id: 3,
            record_date: today(),
            location: "Patio".into(),
            installation: "Planta Norte".into(),
            area: "Civil".into(),
            status: crate::domain::types::RecordStatus::Activa,
            dias_espera: 12,
            priority: crate::domain::types::Priority::Critical,
        };
        assert!(store.apply_stalled(second, Ok(vec![record.clone()])));
        assert!(!store.apply_stalled(first, Ok(Vec::new())));
        assert_eq!(store.view().stalled, vec![record]);
    }

    #[test]
    fn test_page_request_clamped_to_known_total() {
        let mut store = ConsoleStore::new(today(), 20);
        let (gen, _) = table_gen(&store.mount()).unwrap();
        store.apply_page(
            gen,
            Ok(TablePage {
                rows: Vec::new(),
                cursor: PageCursor {
                    page_number: 1,
                    page_size: 20,
                    total_count: 41,
                },
            }),
        );
        let (_, page) = table_gen(&store.dispatch(ConsoleAction::GoToPage { page: 9 })).unwrap();
        assert_eq!(page, 3);
    }

    #[test]
    fn test_critical_only_skips_metrics_cycle() {
        let mut store = ConsoleStore::new(today(), 20);
        store.mount();
        let commands = store.dispatch(ConsoleAction::Filter {
            action: FilterAction::SetCriticalOnly(true),
        });
        assert!(metrics_gen(&commands).is_none());
        assert!(table_gen(&commands).is_some());
        assert!(store.filter().critical_only);
    }

    #[test]
    fn test_reselect_same_value_is_noop() {
        let mut store = ConsoleStore::new(today(), 20);
        store.mount();
        assert!(!store
            .dispatch(ConsoleAction::DrillDown {
                dimension: BreakdownDimension::Area,
                label: "Civil (40.0%)".into(),
            })
            .is_empty());
        let generation = store.view().filter_generation;
        assert!(store
            .dispatch(ConsoleAction::DrillDown {
                dimension: BreakdownDimension::Area,
                label: "Civil (55.0%)".into(),
            })
            .is_empty());
        assert_eq!(store.view().filter_generation, generation);
        assert_eq!(store.filter().area.as_deref(), Some("Civil"));
    }

    #[test]
    fn test_error_keeps_last_good_and_adds_notice() {
        let mut store = ConsoleStore::new(today(), 20);
        let (gen, filter) = metrics_gen(&store.mount()).unwrap();
        store.apply_metrics(gen, Ok(metrics_for(&filter, 7)));

        let commands = store.dispatch(ConsoleAction::Refresh);
        let (gen, _) = metrics_gen(&commands).unwrap();
        store.apply_metrics(gen, Err(ApiError::AggregationError("timeout".into())));

        let view = store.view();
        assert_eq!(view.metrics.unwrap().current.totals.count, 7);
        assert_eq!(view.notices.len(), 1);
        assert_eq!(view.notices[0].code, "AGGREGATION_ERROR");
        assert!(!view.metrics_loading);

        let id = view.notices[0].id;
        store.dispatch(ConsoleAction::DismissNotice { id });
        assert!(store.notices().is_empty());
    }

    #[test]
    fn test_invalid_batch_is_rejected_atomically() {
        let mut store = ConsoleStore::new(today(), 20);
        store.mount();
        let before = store.filter().clone();
        let commands = store.dispatch(ConsoleAction::Batch {
            actions: vec![
                FilterAction::Select {
                    dimension: BreakdownDimension::Area,
                    key: "Civil".into(),
                },
                FilterAction::SetDateRange {
                    start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
                },
            ],
        });
        assert!(commands.is_empty());
        assert_eq!(store.filter(), &before);
        assert_eq!(store.notices()[0].code, "INVALID_INPUT");
    }

    #[test]
    fn test_export_request_binds_current_filter() {
        let mut store = ConsoleStore::new(today(), 20);
        store.mount();
        store.dispatch(select_area("X"));
        let request = store.export_request();
        store.dispatch(select_area("Y"));
        assert_eq!(request.filter.area.as_deref(), Some("X"));
    }
}
