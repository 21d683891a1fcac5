//! 宿主设置
//!
//! 配置文件、schema 文件与模块搜索目录。用户模块目录来自环境变量
//! `WSNET_MODDIR`（冒号分隔），系统目录由宿主设置。

use crate::class::SearchPaths;
use std::path::PathBuf;

/// 用户模块搜索路径的环境变量
pub const MODDIR_ENV: &str = "WSNET_MODDIR";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub config_file: Option<PathBuf>,
    pub schema_file: Option<PathBuf>,
    pub system_module_dirs: Vec<PathBuf>,
    pub user_module_dirs: Vec<PathBuf>,
    /// 出生时间等随机取值的种子
    pub seed: u64,
}

impl Settings {
    /// 读取 `WSNET_MODDIR` 得到用户路径，其余为默认值。
    pub fn from_env() -> Self {
        let user_module_dirs = std::env::var(MODDIR_ENV)
            .map(|v| split_path_list(&v))
            .unwrap_or_default();
        Settings {
            user_module_dirs,
            ..Settings::default()
        }
    }

    pub fn search_paths(&self) -> SearchPaths {
        SearchPaths {
            user: self.user_module_dirs.clone(),
            system: self.system_module_dirs.clone(),
        }
    }
}

/// 冒号分隔的路径列表，忽略空段。
pub fn split_path_list(raw: &str) -> Vec<PathBuf> {
    raw.split(':')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}
