// ==========================================
// 运维工单分析驾驶舱 - 应用层
// ==========================================
// 职责: 状态容器、会话调度与应用级资源装配
// ==========================================

pub mod console;
pub mod session;
pub mod state;

// 重导出
pub use console::{ConsoleAction, ConsoleStore, ConsoleView, FetchCommand, Notice};
pub use session::ConsoleSession;
pub use state::{get_default_db_path, AppState};
