//! LivePanel - 运行时组件加载框架
//!
//! 让长期运行的宿主应用在启动之后获取并激活新的可插拔UI组件，
//! 无需重新链接或重新部署宿主二进制
//!
//! # 加载流水线
//!
//! - **标识符解析**: 合并应用记录与运行时上下文上的Bundle集合
//! - **两阶段导入**: 先应用导入清单，再导入Bundle入口模块
//! - **结构化识别**: 通过标记字段从任意导出值中提取模块描述符
//! - **模块激活**: 版本校验与模块作用域的绑定上下文构建
//! - **注册桥接**: 本地工厂表写入并转发宿主注册表
//! - **调度拦截**: 内置与运行时组件经同一识别分支调度，
//!   批次完成前的渲染请求挂起在一次性门控上
//!
//! # 特性
//!
//! - **失败隔离**: 单个Bundle失败绝不中止批次其余部分
//! - **自愈清理**: 上游已删除的Bundle标识符在一次批次后被移除
//! - **异步优先**: 基于Tokio的协作式调度，长操作均为挂起点

pub mod types;
pub mod error;
pub mod config;
pub mod session;
pub mod store;
pub mod host;
pub mod loader;

// 重新导出核心类型
pub use types::*;
pub use error::*;
pub use config::*;
pub use session::*;
pub use store::*;
pub use host::*;
pub use loader::*;

/// 框架信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const FRAMEWORK_NAME: &str = "LivePanel";

/// 快速启动函数
pub async fn initialize() -> Result<()> {
    // 初始化日志系统
    tracing_subscriber::fmt::init();

    tracing::info!("Initializing {} v{}", FRAMEWORK_NAME, VERSION);
    tracing::info!("Runtime widget-bundle acquisition engine ready");

    Ok(())
}
