// ==========================================
// 运维工单分析驾驶舱 - 会话
// ==========================================
// 一个 tokio 任务独占 ConsoleStore:
// - 指令经 mpsc 进入，视图经 watch 发布，导出结果经 oneshot 返回
// - 取数任务并发执行，结果带代次回到本任务，由 ConsoleStore 判定是否采纳
// - 过滤类变更立即写入状态，取数在静默期结束后合并为一次发出
// ==========================================

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::api::dashboard_api::{DashboardApi, DashboardMetrics};
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::app::console::{ConsoleAction, ConsoleStore, ConsoleView, FetchCommand};
use crate::domain::record::StalledRecord;
use crate::engine::{ExportDocument, TablePage};

const COMMAND_BUFFER: usize = 64;

enum SessionCommand {
    Dispatch(ConsoleAction),
    Export {
        reply: oneshot::Sender<ApiResult<ExportDocument>>,
    },
}

enum FetchOutcome {
    Metrics(u64, ApiResult<DashboardMetrics>),
    Page(u64, ApiResult<TablePage>),
    Stalled(u64, ApiResult<Vec<StalledRecord>>),
    ExportFailed(ErrorResponse),
}

/// 会话句柄
///
/// 句柄全部释放后会话任务自行退出
#[derive(Clone)]
pub struct ConsoleSession {
    commands: mpsc::Sender<SessionCommand>,
    view: watch::Receiver<ConsoleView>,
}

impl ConsoleSession {
    /// 启动会话并立即挂载（拉取指标、第 1 页、滞留面板）
    pub fn spawn(api: Arc<DashboardApi>, today: NaiveDate, debounce: Duration) -> (Self, JoinHandle<()>) {
        let mut store = ConsoleStore::new(today, api.page_size());
        let initial = store.mount();

        let (view_tx, view_rx) = watch::channel(store.view());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

        let actor = SessionActor {
            api,
            store,
            debounce,
            view_tx,
            pending: None,
        };
        let handle = tokio::spawn(actor.run(cmd_rx, initial));

        (
            Self {
                commands: cmd_tx,
                view: view_rx,
            },
            handle,
        )
    }

    pub async fn dispatch(&self, action: ConsoleAction) -> ApiResult<()> {
        self.commands
            .send(SessionCommand::Dispatch(action))
            .await
            .map_err(|_| ApiError::InternalError("会话已关闭".to_string()))
    }

    /// 导出: 过滤条件在指令被会话处理的时刻绑定
    pub async fn export(&self) -> ApiResult<ExportDocument> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Export { reply })
            .await
            .map_err(|_| ApiError::InternalError("会话已关闭".to_string()))?;
        rx.await
            .map_err(|_| ApiError::ExportError("导出任务被中断".to_string()))?
    }

    /// 当前视图快照
    pub fn view(&self) -> ConsoleView {
        self.view.borrow().clone()
    }

    /// 订阅视图变化
    pub fn subscribe(&self) -> watch::Receiver<ConsoleView> {
        self.view.clone()
    }

    /// 等待视图满足条件（超时返回 None）
    pub async fn wait_for<F>(&self, timeout: Duration, mut predicate: F) -> Option<ConsoleView>
    where
        F: FnMut(&ConsoleView) -> bool,
    {
        let mut rx = self.view.clone();
        let wait = async {
            loop {
                {
                    let view = rx.borrow_and_update();
                    if predicate(&*view) {
                        return Some(view.clone());
                    }
                }
                if rx.changed().await.is_err() {
                    return None;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.ok().flatten()
    }
}

// ==========================================
// SessionActor
// ==========================================

struct SessionActor {
    api: Arc<DashboardApi>,
    store: ConsoleStore,
    debounce: Duration,
    view_tx: watch::Sender<ConsoleView>,
    /// 防抖中的取数: (截止时间, 指令)
    pending: Option<(Instant, Vec<FetchCommand>)>,
}

impl SessionActor {
    async fn run(mut self, mut cmd_rx: mpsc::Receiver<SessionCommand>, initial: Vec<FetchCommand>) {
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        self.execute(initial, &outcome_tx);

        loop {
            let deadline = self.pending.as_ref().map(|(at, _)| *at);
            let debounce_elapsed = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(SessionCommand::Dispatch(action)) => self.handle_action(action, &outcome_tx),
                    Some(SessionCommand::Export { reply }) => self.start_export(reply, &outcome_tx),
                    None => break,
                },
                Some(outcome) = outcome_rx.recv() => self.handle_outcome(outcome),
                _ = debounce_elapsed => {
                    let commands = self.take_live_pending();
                    tracing::debug!(count = commands.len(), "防抖静默期结束，发出取数");
                    self.execute(commands, &outcome_tx);
                }
            }

            self.publish();
        }

        tracing::debug!("会话结束");
    }

    fn handle_action(&mut self, action: ConsoleAction, outcome_tx: &mpsc::UnboundedSender<FetchOutcome>) {
        let debounced = action.is_filter_change() && !self.debounce.is_zero();
        let commands = self.store.dispatch(action);
        if commands.is_empty() {
            return;
        }

        // 挂起指令中仍属当前代次的保留，其余已被新指令取代
        let mut merged = self.take_live_pending();
        merged.extend(commands);

        if debounced {
            self.pending = Some((Instant::now() + self.debounce, merged));
        } else {
            self.execute(merged, outcome_tx);
        }
    }

    fn take_live_pending(&mut self) -> Vec<FetchCommand> {
        match self.pending.take() {
            Some((_, commands)) => commands
                .into_iter()
                .filter(|c| self.store.is_current(c))
                .collect(),
            None => Vec::new(),
        }
    }

    fn execute(&self, commands: Vec<FetchCommand>, outcome_tx: &mpsc::UnboundedSender<FetchOutcome>) {
        let today = self.store.today();
        for command in commands {
            let api = self.api.clone();
            let tx = outcome_tx.clone();
            tokio::spawn(async move {
                let outcome = match command {
                    FetchCommand::Metrics { generation, filter } => {
                        FetchOutcome::Metrics(generation, api.load_metrics(&filter).await)
                    }
                    FetchCommand::TablePage {
                        generation,
                        filter,
                        page,
                    } => FetchOutcome::Page(generation, api.fetch_page(&filter, page, today).await),
                    FetchCommand::Stalled { generation } => {
                        FetchOutcome::Stalled(generation, api.list_stalled(today).await)
                    }
                };
                // 会话已结束时结果直接丢弃
                let _ = tx.send(outcome);
            });
        }
    }

    fn start_export(
        &self,
        reply: oneshot::Sender<ApiResult<ExportDocument>>,
        outcome_tx: &mpsc::UnboundedSender<FetchOutcome>,
    ) {
        let request = self.store.export_request();
        let today = self.store.today();
        let api = self.api.clone();
        let tx = outcome_tx.clone();

        tokio::spawn(async move {
            let result = api
                .build_export(request, today, Local::now().naive_local())
                .await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "导出失败");
                let _ = tx.send(FetchOutcome::ExportFailed(e.to_response()));
            }
            let _ = reply.send(result);
        });
    }

    fn handle_outcome(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Metrics(generation, result) => {
                self.store.apply_metrics(generation, result);
            }
            FetchOutcome::Page(generation, result) => {
                self.store.apply_page(generation, result);
            }
            FetchOutcome::Stalled(generation, result) => {
                self.store.apply_stalled(generation, result);
            }
            FetchOutcome::ExportFailed(error) => self.store.report_export_failure(&error),
        }
    }

    fn publish(&self) {
        let view = self.store.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
    }
}
