// ==========================================
// 运维工单分析驾驶舱 - 配置管理 API
// ==========================================
// 职责: 配置查询与更新（带取值校验）
// ==========================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager, ConsoleConfig};

/// 配置项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigItem {
    pub key: String,
    pub value: String,
}

pub struct ConfigApi {
    config_manager: Arc<ConfigManager>,
}

impl ConfigApi {
    pub fn new(config_manager: Arc<ConfigManager>) -> Self {
        Self { config_manager }
    }

    /// 查询全部全局配置（按键排序）
    pub fn list_configs(&self) -> ApiResult<Vec<ConfigItem>> {
        let snapshot = self
            .config_manager
            .get_config_snapshot()
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        let mut items: Vec<ConfigItem> = snapshot
            .into_iter()
            .map(|(key, value)| ConfigItem { key, value })
            .collect();
        items.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(items)
    }

    /// 当前生效的运行配置
    pub fn console_config(&self) -> ApiResult<ConsoleConfig> {
        self.config_manager
            .load_console_config()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 更新单个配置项
    ///
    /// 仅接受已知键；数值类配置必须为正整数（debounce_ms 允许 0）
    pub fn update_config(&self, key: &str, value: &str) -> ApiResult<()> {
        let value = value.trim();
        let parsed: u64 = value
            .parse()
            .map_err(|_| ApiError::InvalidInput(format!("{} 必须为非负整数: {}", key, value)))?;

        match key {
            config_keys::DEBOUNCE_MS => {}
            config_keys::PAGE_SIZE
            | config_keys::STALE_THRESHOLD_DAYS
            | config_keys::STALLED_CAP
            | config_keys::EXPORT_BATCH_SIZE
            | config_keys::EXPORT_TOP_AREAS => {
                if parsed == 0 {
                    return Err(ApiError::InvalidInput(format!("{} 必须大于 0", key)));
                }
            }
            other => {
                return Err(ApiError::InvalidInput(format!("未知配置项: {}", other)));
            }
        }

        self.config_manager
            .set_global_config_value(key, value)
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;

        tracing::info!(key = key, value = value, "配置已更新");
        Ok(())
    }
}
