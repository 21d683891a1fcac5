//! 文档结构校验
//!
//! 在任何装配阶段之前运行：根元素、顶层标签、`simulation` 唯一。
//! 配置了 schema 文件时，该文件必须可读且是以 `schema` 为根的 XML。

use super::document::{Document, Element};
use crate::class::ModelType;
use crate::error::ConfigError;
use std::path::Path;
use tracing::debug;

pub const ROOT_TAG: &str = "worldsens";

const STRUCTURAL_TAGS: &[&str] = &[
    "medium",
    "environment",
    "node_architecture",
    "group_architecture",
    "simulation",
];

/// 顶层标签是否声明一个类
pub fn is_class_tag(tag: &str) -> bool {
    ModelType::from_tag(tag).is_some()
}

pub fn validate(doc: &Document, schema: Option<&Path>) -> Result<(), ConfigError> {
    if let Some(path) = schema {
        check_schema_file(path)?;
    }
    validate_structure(&doc.root)
}

fn validate_structure(root: &Element) -> Result<(), ConfigError> {
    if root.tag != ROOT_TAG {
        return Err(ConfigError::SchemaValidation(format!(
            "根元素应为 <{ROOT_TAG}>，实际为 <{}>",
            root.tag
        )));
    }
    for child in &root.children {
        if !is_class_tag(&child.tag) && !STRUCTURAL_TAGS.contains(&child.tag.as_str()) {
            return Err(ConfigError::SchemaValidation(format!(
                "未知的顶层元素 <{}>",
                child.tag
            )));
        }
    }
    let simulations = root.children_named("simulation").count();
    if simulations != 1 {
        return Err(ConfigError::SchemaValidation(format!(
            "必须恰好有一个 <simulation>，实际 {simulations} 个"
        )));
    }
    debug!(elements = root.children.len(), "文档结构校验通过");
    Ok(())
}

fn check_schema_file(path: &Path) -> Result<(), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::SchemaValidation(format!("无法读取 schema {}: {e}", path.display()))
    })?;
    let xml = roxmltree::Document::parse(&text).map_err(|e| {
        ConfigError::SchemaValidation(format!("schema {} 不是合法 XML: {e}", path.display()))
    })?;
    let root = xml.root_element().tag_name().name();
    if root != "schema" {
        return Err(ConfigError::SchemaValidation(format!(
            "schema {} 的根元素为 <{root}>",
            path.display()
        )));
    }
    Ok(())
}
