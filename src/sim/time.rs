//! 仿真时间类型
//!
//! 定义仿真时间、单位换算以及配置中时间参数（`birth`、`duration`）的解析。

use rand::Rng;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, serde::Serialize)]
pub struct SimTime(pub u64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);
    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    /// 解析单个时长：纯数字为纳秒，可带 `ns`/`us`/`ms`/`s` 后缀，允许小数。
    pub fn parse(raw: &str) -> Option<SimTime> {
        let raw = raw.trim();
        let split = raw
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(raw.len());
        let (number, unit) = raw.split_at(split);
        if number.is_empty() {
            return None;
        }
        let scale: u64 = match unit.trim() {
            "" | "ns" => 1,
            "us" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            _ => return None,
        };
        if number.contains('.') {
            let v: f64 = number.parse().ok()?;
            if !v.is_finite() {
                return None;
            }
            Some(SimTime((v * scale as f64).round() as u64))
        } else {
            let v: u64 = number.parse().ok()?;
            Some(SimTime(v.saturating_mul(scale)))
        }
    }
}

/// 配置中的时间参数：固定值、`min..max` 区间或 `random`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    Fixed(SimTime),
    Range { min: SimTime, max: SimTime },
    /// 在 `[0, horizon)` 内均匀取值，horizon 通常是仿真时长。
    Random,
}

impl TimeSpec {
    pub fn parse(raw: &str) -> Option<TimeSpec> {
        let raw = raw.trim();
        if raw == "random" {
            return Some(TimeSpec::Random);
        }
        if let Some((lo, hi)) = raw.split_once("..") {
            let min = SimTime::parse(lo)?;
            let max = SimTime::parse(hi)?;
            if min > max {
                return None;
            }
            return Some(TimeSpec::Range { min, max });
        }
        SimTime::parse(raw).map(TimeSpec::Fixed)
    }

    /// 取一个具体时间
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, horizon: SimTime) -> SimTime {
        match *self {
            TimeSpec::Fixed(t) => t,
            TimeSpec::Range { min, max } if min == max => min,
            TimeSpec::Range { min, max } => SimTime(rng.gen_range(min.0..=max.0)),
            TimeSpec::Random if horizon.0 == 0 => SimTime::ZERO,
            TimeSpec::Random => SimTime(rng.gen_range(0..horizon.0)),
        }
    }
}
