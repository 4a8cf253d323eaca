//! LivePanel 错误处理系统
//!
//! 统一的错误类型和错误处理机制

use thiserror::Error;

/// 框架统一错误类型
#[derive(Error, Debug)]
pub enum LivePanelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("No application found for path '{path}'")]
    ApplicationNotFound { path: String },

    #[error("Import manifest not found for bundle '{bundle_id}'")]
    ManifestNotFound { bundle_id: String },

    #[error("Failed to import bundle '{bundle_id}': {message}")]
    ImportFailed { bundle_id: String, message: String },

    #[error("Failed to activate module '{module}': {message}")]
    ActivationFailed { module: String, message: String },

    #[error("Unknown component '{widget_id}'")]
    UnknownComponent { widget_id: String },

    #[error("Failed to build factory for widget '{widget_id}': {message}")]
    FactoryConstruction { widget_id: String, message: String },

    #[error("Identifier store error: {message}")]
    Store { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Generic error: {message}")]
    Generic { message: String },
}

impl LivePanelError {
    /// 创建导入失败错误
    pub fn import_failed(bundle_id: &str, message: impl Into<String>) -> Self {
        Self::ImportFailed {
            bundle_id: bundle_id.to_string(),
            message: message.into(),
        }
    }

    /// 创建激活失败错误
    pub fn activation_failed(module: &str, message: impl Into<String>) -> Self {
        Self::ActivationFailed {
            module: module.to_string(),
            message: message.into(),
        }
    }

    /// 创建存储相关错误
    pub fn store(message: &str) -> Self {
        Self::Store {
            message: message.to_string(),
        }
    }

    /// 创建配置相关错误
    pub fn config(message: &str) -> Self {
        Self::Config {
            message: message.to_string(),
        }
    }

    /// 创建通用错误
    pub fn generic(message: &str) -> Self {
        Self::Generic {
            message: message.to_string(),
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, LivePanelError>;
