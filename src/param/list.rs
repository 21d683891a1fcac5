//! 参数表
//!
//! 挂在类实例上的有序键值对。键值在解析后不再改变，复制即浅拷贝。

use crate::error::ConfigError;
use crate::sim::{SimTime, TimeSpec};
use serde::Serialize;

/// 单个参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Param {
    pub key: String,
    pub value: String,
}

/// 有序参数表
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }

    /// 追加参数（不检查重复键）
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.push(Param {
            key: key.into(),
            value: value.into(),
        });
    }

    /// 复制一份独立的参数表
    pub fn duplicate(&self) -> ParamList {
        self.clone()
    }

    /// 线性查找键
    pub fn find_key(&self, key: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.key == key)
    }

    /// 覆盖同名键的值，不存在则追加。
    pub fn merge(&mut self, key: &str, value: &str) {
        match self.params.iter_mut().find(|p| p.key == key) {
            Some(p) => p.value = value.to_string(),
            None => self.push(key, value),
        }
    }

    /// 按顺序把 `other` 的每一项合并进来
    pub fn merge_all(&mut self, other: &ParamList) {
        for p in &other.params {
            self.merge(&p.key, &p.value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.find_key(key).map(|p| p.value.as_str())
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.typed(key, |v| v.trim().parse().ok())
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.typed(key, |v| v.trim().parse().ok())
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.typed(key, |v| match v.trim() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        })
    }

    /// 时间参数，接受与 `birth` 相同的写法；区间或 `random` 在 `horizon` 内取值。
    pub fn get_time<R: rand::Rng + ?Sized>(
        &self,
        key: &str,
        rng: &mut R,
        horizon: SimTime,
    ) -> Result<Option<SimTime>, ConfigError> {
        let spec = self.typed(key, TimeSpec::parse)?;
        Ok(spec.map(|s| s.sample(rng, horizon)))
    }

    fn typed<T>(&self, key: &str, parse: impl Fn(&str) -> Option<T>) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => parse(raw)
                .map(Some)
                .ok_or_else(|| ConfigError::invalid("参数", key, raw)),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ParamList {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut list = ParamList::new();
        for (k, v) in iter {
            list.push(k, v);
        }
        list
    }
}
