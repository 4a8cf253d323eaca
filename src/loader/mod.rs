//! 运行时模块获取与注册引擎
//!
//! 在宿主启动后解析、导入、激活并注册可插拔UI组件Bundle

pub mod activator;
pub mod dispatch;
pub mod extractor;
pub mod gate;
pub mod manifest;
pub mod orchestrator;
pub mod registry;

// 重新导出核心组件
pub use activator::*;
pub use dispatch::*;
pub use extractor::*;
pub use gate::*;
pub use manifest::*;
pub use orchestrator::*;
pub use registry::*;
