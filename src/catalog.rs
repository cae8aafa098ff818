//! # 数据清单模块
//!
//! 只读、有序的图片记录列表，来自打包的 JSON 清单。
//! 缓存从不读取清单；列表页从这里拿到 `image_key` 后再向缓存请求图片。

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;

/// 清单中的一条记录。
///
/// 除 `id / img / name` 外的字段对缓存无意义，原样保存在 `details` 中。
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CatalogRecord {
    #[serde(default)]
    pub id: i64,
    #[serde(rename = "img", default)]
    pub image_key: String,
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(flatten)]
    pub details: serde_json::Map<String, serde_json::Value>,
}

/// 只读数据清单。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let records: Vec<CatalogRecord> = serde_json::from_str(json)
            .map_err(|e| AppError::Catalog(format!("解析清单失败: {}", e)))?;
        Ok(Self { records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let content = fs::read_to_string(path.as_ref())?;
        let catalog = Self::from_json_str(&content)?;
        log::info!("📚 已加载数据清单 {} 条 - {}", catalog.len(), path.as_ref().display());
        Ok(catalog)
    }

    /// 全部记录，保持清单顺序。
    pub fn all(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn get(&self, id: i64) -> Option<&CatalogRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    /// 列表页使用的精简投影：`(id, image_key, display_name)`。
    pub fn summaries(&self) -> impl Iterator<Item = (i64, &str, &str)> {
        self.records
            .iter()
            .map(|record| (record.id, record.image_key.as_str(), record.display_name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": 1, "img": "great_pyrenees", "name": "Great Pyrenees", "info": "calm", "level_energy": 2},
        {"id": 2, "img": "beagle", "name": "Beagle"}
    ]"#;

    #[test]
    fn parses_records_in_order_with_details() {
        let catalog = Catalog::from_json_str(SAMPLE).expect("catalog should parse");
        assert_eq!(catalog.len(), 2);

        let first = &catalog.all()[0];
        assert_eq!(first.image_key, "great_pyrenees");
        assert_eq!(first.display_name, "Great Pyrenees");
        assert_eq!(first.details.get("level_energy"), Some(&serde_json::json!(2)));

        let summaries: Vec<_> = catalog.summaries().collect();
        assert_eq!(summaries[1], (2, "beagle", "Beagle"));
    }

    #[test]
    fn get_by_id() {
        let catalog = Catalog::from_json_str(SAMPLE).expect("catalog should parse");
        assert_eq!(catalog.get(2).map(|r| r.display_name.as_str()), Some("Beagle"));
        assert!(catalog.get(99).is_none());
    }

    #[test]
    fn malformed_json_is_catalog_error() {
        let result = Catalog::from_json_str("{not json");
        assert!(matches!(result, Err(AppError::Catalog(_))));
    }
}
