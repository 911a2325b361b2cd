// ==========================================
// 运维工单分析驾驶舱 - 配置层
// ==========================================
// 职责: 驾驶舱运行配置（分页/滞留阈值/防抖/导出）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

pub use config_manager::{config_keys, ConfigManager, ConsoleConfig};
