// ==========================================
// 运维工单分析驾驶舱 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::domain::types::STALE_THRESHOLD_DAYS;
use crate::repository::error::{RepositoryError, RepositoryResult};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    // 表格分页
    pub const PAGE_SIZE: &str = "page_size";

    // 滞留口径
    pub const STALE_THRESHOLD_DAYS: &str = "stale_threshold_days";
    pub const STALLED_CAP: &str = "stalled_cap";

    // 过滤防抖
    pub const DEBOUNCE_MS: &str = "debounce_ms";

    // 导出
    pub const EXPORT_BATCH_SIZE: &str = "export_batch_size";
    pub const EXPORT_TOP_AREAS: &str = "export_top_areas";
}

/// 驾驶舱运行配置（带默认值）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleConfig {
    /// 表格每页行数（固定）
    pub page_size: u32,
    /// 滞留阈值（天）
    pub stale_threshold_days: i64,
    /// 滞留面板条数上限
    pub stalled_cap: u32,
    /// 过滤防抖静默期（毫秒）
    pub debounce_ms: u64,
    /// 导出批量大小
    pub export_batch_size: u32,
    /// 导出摘要中区域 Top N
    pub export_top_areas: u32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            stale_threshold_days: STALE_THRESHOLD_DAYS,
            stalled_cap: 6,
            debounce_ms: 500,
            export_batch_size: 500,
            export_top_areas: 10,
        }
    }
}

impl ConsoleConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            configure_sqlite_connection(&guard)?;
            ensure_schema(&guard)?;
        }

        Ok(Self { conn })
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 所有 global 配置（用于导出元信息/排障）
    pub fn get_config_snapshot(&self) -> RepositoryResult<HashMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = HashMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    /// 加载驾驶舱配置
    ///
    /// 缺失或非法的配置项回退到默认值（记录 warn，不中断启动）
    pub fn load_console_config(&self) -> RepositoryResult<ConsoleConfig> {
        let defaults = ConsoleConfig::default();

        let page_size: u32 = self.parse_or(config_keys::PAGE_SIZE, defaults.page_size)?;
        let stale_threshold_days: i64 =
            self.parse_or(config_keys::STALE_THRESHOLD_DAYS, defaults.stale_threshold_days)?;
        let stalled_cap: u32 = self.parse_or(config_keys::STALLED_CAP, defaults.stalled_cap)?;
        let debounce_ms: u64 = self.parse_or(config_keys::DEBOUNCE_MS, defaults.debounce_ms)?;
        let export_batch_size: u32 =
            self.parse_or(config_keys::EXPORT_BATCH_SIZE, defaults.export_batch_size)?;
        let export_top_areas: u32 =
            self.parse_or(config_keys::EXPORT_TOP_AREAS, defaults.export_top_areas)?;

        Ok(ConsoleConfig {
            page_size: non_zero_or(page_size, defaults.page_size, config_keys::PAGE_SIZE),
            stale_threshold_days: if stale_threshold_days < 0 {
                tracing::warn!(
                    config_key = config_keys::STALE_THRESHOLD_DAYS,
                    value = stale_threshold_days,
                    "配置值为负数，使用默认值"
                );
                defaults.stale_threshold_days
            } else {
                stale_threshold_days
            },
            stalled_cap,
            debounce_ms,
            export_batch_size: non_zero_or(
                export_batch_size,
                defaults.export_batch_size,
                config_keys::EXPORT_BATCH_SIZE,
            ),
            export_top_areas,
        })
    }

    fn parse_or<T>(&self, key: &str, default: T) -> RepositoryResult<T>
    where
        T: FromStr + Copy + std::fmt::Display,
    {
        let raw = match self.get_global_config_value(key)? {
            Some(v) => v,
            None => return Ok(default),
        };

        match raw.trim().parse::<T>() {
            Ok(v) => Ok(v),
            Err(_) => {
                tracing::warn!(
                    config_key = key,
                    raw_value = %raw,
                    default = %default,
                    "配置值解析失败，使用默认值"
                );
                Ok(default)
            }
        }
    }
}

fn non_zero_or(value: u32, default: u32, key: &str) -> u32 {
    if value == 0 {
        tracing::warn!(config_key = key, "配置值为 0，使用默认值");
        default
    } else {
        value
    }
}
