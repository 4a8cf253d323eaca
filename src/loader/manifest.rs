//! 清单解析与Bundle导入
//!
//! 两阶段导入：先获取并应用导入清单（教会模块加载器每个代码块的位置），
//! 再导入Bundle入口模块。清单必须在入口导入之前完全应用，
//! 否则入口模块无法解析其内部代码块引用。

use crate::config::LoaderConfig;
use crate::error::{LivePanelError, Result};
use crate::types::{now_ns, BundleId, ExportsObject};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// 导入清单 - Bundle代码块名到加载位置的映射
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleManifest {
    /// 入口模块的相对路径
    pub entry: String,
    /// 代码块名 -> 加载位置
    #[serde(default)]
    pub chunks: HashMap<String, String>,
}

/// 传输层错误 - 底层获取客户端上报的失败
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("network failure: {0}")]
    Network(String),

    #[error("evaluation failure: {0}")]
    Evaluation(String),
}

/// Bundle传输层 - 跨源获取清单与入口模块的底层客户端
#[async_trait]
pub trait BundleTransport: Send + Sync {
    /// 获取指定URL的导入清单
    async fn fetch_manifest(&self, url: &str) -> std::result::Result<BundleManifest, TransportError>;

    /// 导入入口模块，产出导出对象
    ///
    /// 清单已在调用前应用；实现方可以依赖其中的代码块映射
    async fn import_entry(
        &self,
        url: &str,
        manifest: &BundleManifest,
    ) -> std::result::Result<ExportsObject, TransportError>;
}

/// Bundle导入器 - 按标识符执行清单解析与入口导入
pub struct BundleImporter {
    transport: Arc<dyn BundleTransport>,
    config: LoaderConfig,
    /// 已应用的清单，按Bundle标识符索引
    applied_manifests: DashMap<BundleId, BundleManifest>,
}

impl BundleImporter {
    pub fn new(transport: Arc<dyn BundleTransport>, config: LoaderConfig) -> Self {
        Self {
            transport,
            config,
            applied_manifests: DashMap::new(),
        }
    }

    /// 解析一个Bundle：清单导入 -> 应用 -> 入口导入
    ///
    /// 清单缺失返回`ManifestNotFound`；其余传输、404、Bundle内部
    /// 语法/运行时错误统一为`ImportFailed`并附带原因，绝不向上抛裸错误
    pub async fn resolve(&self, bundle_id: &BundleId) -> Result<ExportsObject> {
        let root = self.config.bundle_root(bundle_id);
        let manifest_url = self.manifest_url(&root);
        debug!(bundle_id = %bundle_id, url = %manifest_url, "Fetching import manifest");

        let manifest = match self.transport.fetch_manifest(&manifest_url).await {
            Ok(manifest) => manifest,
            Err(TransportError::NotFound(message)) => {
                warn!(bundle_id = %bundle_id, %message, "Import manifest not found");
                return Err(LivePanelError::ManifestNotFound {
                    bundle_id: bundle_id.clone(),
                });
            }
            Err(err) => {
                return Err(LivePanelError::import_failed(
                    bundle_id,
                    format!("manifest fetch failed: {}", err),
                ));
            }
        };

        // 入口导入前必须完全应用清单
        self.applied_manifests
            .insert(bundle_id.clone(), manifest.clone());

        let entry_url = format!("{}/{}", root, manifest.entry);
        debug!(bundle_id = %bundle_id, url = %entry_url, "Importing bundle entry module");

        self.transport
            .import_entry(&entry_url, &manifest)
            .await
            .map_err(|err| LivePanelError::import_failed(bundle_id, err.to_string()))
    }

    /// 已应用的清单（测试与诊断用）
    pub fn applied_manifest(&self, bundle_id: &BundleId) -> Option<BundleManifest> {
        self.applied_manifests
            .get(bundle_id)
            .map(|entry| entry.value().clone())
    }

    fn manifest_url(&self, root: &str) -> String {
        let base = format!("{}/{}", root, self.config.manifest_file);
        if self.config.cache_busting {
            // 防缓存参数，绕过陈旧的浏览器/CDN缓存
            format!("{}?t={}", base, now_ns())
        } else {
            base
        }
    }
}

/// 静态Bundle传输层 - 预置清单与导出对象，测试与嵌入演示用
///
/// 清单按去掉查询参数后的路径匹配；未预置的入口模块上报求值失败
pub struct StaticBundleTransport {
    manifests: DashMap<String, BundleManifest>,
    exports: DashMap<String, ExportsObject>,
    requested: parking_lot::Mutex<Vec<String>>,
}

impl StaticBundleTransport {
    pub fn new() -> Self {
        Self {
            manifests: DashMap::new(),
            exports: DashMap::new(),
            requested: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// 预置一份清单
    pub fn add_manifest(&self, path: &str, manifest: BundleManifest) {
        self.manifests.insert(path.to_string(), manifest);
    }

    /// 预置一个入口模块的导出对象
    pub fn add_exports(&self, url: &str, exports: ExportsObject) {
        self.exports.insert(url.to_string(), exports);
    }

    /// 已请求的URL序列
    pub fn requested_urls(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

impl Default for StaticBundleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BundleTransport for StaticBundleTransport {
    async fn fetch_manifest(
        &self,
        url: &str,
    ) -> std::result::Result<BundleManifest, TransportError> {
        self.requested.lock().push(url.to_string());
        let path = url.split('?').next().unwrap_or(url);
        self.manifests
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::NotFound(format!("404 {}", path)))
    }

    async fn import_entry(
        &self,
        url: &str,
        _manifest: &BundleManifest,
    ) -> std::result::Result<ExportsObject, TransportError> {
        self.requested.lock().push(url.to_string());
        self.exports
            .get(url)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| TransportError::Evaluation(format!("SyntaxError in {}", url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest(entry: &str) -> BundleManifest {
        BundleManifest {
            entry: entry.to_string(),
            chunks: HashMap::from([("main".to_string(), "chunk.0.js".to_string())]),
        }
    }

    #[tokio::test]
    async fn test_resolve_happy_path() {
        let transport = StaticBundleTransport::new();
        transport.add_manifest("/widgets/a/import-manifest.js", manifest("entry.js"));
        transport.add_exports(
            "/widgets/a/entry.js",
            ExportsObject::from([("helper".to_string(), serde_json::json!(42))]),
        );

        let importer = BundleImporter::new(Arc::new(transport), LoaderConfig::default());
        let exports = importer.resolve(&"a".to_string()).await.unwrap();

        assert_eq!(exports.len(), 1);
        assert!(importer.applied_manifest(&"a".to_string()).is_some());
    }

    #[tokio::test]
    async fn test_missing_manifest_is_manifest_not_found() {
        let transport = StaticBundleTransport::new();
        let importer = BundleImporter::new(Arc::new(transport), LoaderConfig::default());

        let result = importer.resolve(&"gone".to_string()).await;
        assert!(matches!(
            result,
            Err(LivePanelError::ManifestNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_entry_failure_is_import_failed_with_cause() {
        let transport = StaticBundleTransport::new();
        transport.add_manifest("/widgets/a/import-manifest.js", manifest("entry.js"));
        // 入口模块未预置，传输层上报求值失败

        let importer = BundleImporter::new(Arc::new(transport), LoaderConfig::default());
        let result = importer.resolve(&"a".to_string()).await;

        match result {
            Err(LivePanelError::ImportFailed { bundle_id, message }) => {
                assert_eq!(bundle_id, "a");
                assert!(message.contains("SyntaxError"));
            }
            other => panic!("expected ImportFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cache_busting_parameter_appended() {
        let transport = Arc::new(StaticBundleTransport::new());
        transport.add_manifest("/widgets/a/import-manifest.js", manifest("entry.js"));
        transport.add_exports("/widgets/a/entry.js", ExportsObject::new());

        let importer = BundleImporter::new(transport.clone(), LoaderConfig::default());
        importer.resolve(&"a".to_string()).await.unwrap();

        let urls = transport.requested_urls();
        assert!(urls[0].contains("?t="), "manifest URL missing cache-bust: {}", urls[0]);
        assert!(!urls[1].contains("?t="));
    }

    #[tokio::test]
    async fn test_manifest_applied_before_entry_import() {
        let transport = Arc::new(StaticBundleTransport::new());
        transport.add_manifest("/widgets/a/import-manifest.js", manifest("entry.js"));
        transport.add_exports("/widgets/a/entry.js", ExportsObject::new());

        let importer = BundleImporter::new(transport.clone(), LoaderConfig::default());
        importer.resolve(&"a".to_string()).await.unwrap();

        let urls = transport.requested_urls();
        assert!(urls[0].contains("import-manifest.js"));
        assert!(urls[1].ends_with("entry.js"));
    }
}
