// ==========================================
// 运维工单分析驾驶舱 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享资源和API实例
// ==========================================

use chrono::NaiveDate;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

use crate::api::{ConfigApi, DashboardApi};
use crate::app::session::ConsoleSession;
use crate::config::{ConfigManager, ConsoleConfig};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::SqliteRecordStore;

/// 数据库路径环境变量
pub const DB_PATH_ENV: &str = "OPS_CONSOLE_DB_PATH";

/// 应用状态
///
/// 一个连接在配置管理器与工单仓储之间共享
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的运行配置
    pub config: ConsoleConfig,

    /// 工单仓储（参考实现）
    pub record_store: Arc<SqliteRecordStore>,

    /// 驾驶舱API
    pub dashboard_api: Arc<DashboardApi>,

    /// 配置管理API
    pub config_api: Arc<ConfigApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 1. 打开数据库并确保表结构存在
    /// 2. 加载配置（非法值回退默认）
    /// 3. 创建仓储与API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("无法初始化表结构: {}", e))?;
        let conn: Arc<Mutex<Connection>> = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_console_config()
            .map_err(|e| format!("无法加载配置: {}", e))?;

        let record_store = Arc::new(SqliteRecordStore::new(conn));
        let dashboard_api = Arc::new(DashboardApi::new(record_store.clone(), &config));
        let config_api = Arc::new(ConfigApi::new(config_manager));

        tracing::info!(
            page_size = config.page_size,
            stale_threshold_days = config.stale_threshold_days,
            debounce_ms = config.debounce_ms,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            config,
            record_store,
            dashboard_api,
            config_api,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }

    /// 打开一个驾驶舱会话（需在 tokio 运行时内调用）
    pub fn open_session(&self, today: NaiveDate) -> (ConsoleSession, tokio::task::JoinHandle<()>) {
        ConsoleSession::spawn(self.dashboard_api.clone(), today, self.config.debounce())
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 OPS_CONSOLE_DB_PATH 非空时直接使用
/// - 开发环境: 用户数据目录/ops-console-dev/ops_console.db
/// - 生产环境: 用户数据目录/ops-console/ops_console.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./ops_console.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("ops-console-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("ops-console");
        }

        // 目录创建失败时仍返回该路径，由打开数据库时报错
        std::fs::create_dir_all(&path).ok();
        path = path.join("ops_console.db");
    }

    path.to_string_lossy().to_string()
}
