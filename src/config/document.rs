//! 配置文档
//!
//! 把 XML 文本解析成自有的元素树，之后的各阶段只读这棵树。

use crate::error::ConfigError;
use crate::param::ParamList;
use std::path::Path;
use std::str::FromStr;

/// 一个 XML 元素：标签、按声明顺序的属性、子元素。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 构造辅助：追加属性
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((key.into(), value.into()));
        self
    }

    /// 构造辅助：追加子元素
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn required_attr(&self, key: &str, context: &str) -> Result<&str, ConfigError> {
        self.attr(key).ok_or_else(|| ConfigError::missing(context, key))
    }

    /// 解析可选的数值属性
    pub fn parse_attr<T: FromStr>(&self, key: &str, context: &str) -> Result<Option<T>, ConfigError> {
        match self.attr(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::invalid(context, key, raw)),
        }
    }

    pub fn bool_attr(&self, key: &str, context: &str) -> Result<bool, ConfigError> {
        match self.attr(key) {
            None => Ok(false),
            Some("true") | Some("1") | Some("yes") => Ok(true),
            Some("false") | Some("0") | Some("no") => Ok(false),
            Some(raw) => Err(ConfigError::invalid(context, key, raw)),
        }
    }

    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    pub fn child(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// `tag` 子块下的 `param` 元素；块不存在时为空表。
    pub fn param_block(&self, tag: &str, context: &str) -> Result<ParamList, ConfigError> {
        match self.child(tag) {
            Some(block) => block.direct_params(context),
            None => Ok(ParamList::new()),
        }
    }

    /// 绑定处的内联参数：直接的 `param` 子元素，以及
    /// `parameters`/`default_parameters` 块中的参数，按文档顺序合并。
    pub fn inline_params(&self, context: &str) -> Result<ParamList, ConfigError> {
        let mut params = ParamList::new();
        for child in &self.children {
            match child.tag.as_str() {
                "param" => {
                    let (k, v) = param_pair(child, context)?;
                    params.merge(k, v);
                }
                "parameters" | "default_parameters" => {
                    params.merge_all(&child.direct_params(context)?);
                }
                _ => {}
            }
        }
        Ok(params)
    }

    fn direct_params(&self, context: &str) -> Result<ParamList, ConfigError> {
        let mut params = ParamList::new();
        for p in self.children_named("param") {
            let (k, v) = param_pair(p, context)?;
            params.merge(k, v);
        }
        Ok(params)
    }
}

fn param_pair<'a>(el: &'a Element, context: &str) -> Result<(&'a str, &'a str), ConfigError> {
    let ctx = format!("{context} 的 param");
    Ok((el.required_attr("key", &ctx)?, el.required_attr("value", &ctx)?))
}

/// 已解析的配置文档
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Document { root }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// 顶层中第一个 `tag` 元素
    pub fn section(&self, tag: &str) -> Option<&Element> {
        self.root.child(tag)
    }

    pub fn sections<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.root.children_named(tag)
    }
}

impl FromStr for Document {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let xml = roxmltree::Document::parse(text)
            .map_err(|e| ConfigError::DocumentParse(e.to_string()))?;
        Ok(Document {
            root: convert(xml.root_element()),
        })
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    Element {
        tag: node.tag_name().name().to_string(),
        attrs: node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect(),
        children: node.children().filter(|c| c.is_element()).map(convert).collect(),
    }
}
