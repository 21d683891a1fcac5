//! 方法表
//!
//! 协议运行时通过这些能力接口调用已绑定的类。所有调用都使用统一约定
//! `(to, from, …)`，两端都是 `{class, owner}`。

use super::model::Capability;
use crate::id::Call;
use crate::sim::SimTime;
use serde::Serialize;
use std::ffi::c_void;

/// 三维坐标（米）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// 仿真世界的空间范围，由全局地图确定。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Area {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Area {
    pub fn contains(&self, p: &Position) -> bool {
        (0.0..=self.x).contains(&p.x) && (0.0..=self.y).contains(&p.y) && (0.0..=self.z).contains(&p.z)
    }
}

/// 协议栈中传递的数据包
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Packet {
    pub id: u64,
    pub size_bytes: usize,
    pub data: Vec<u8>,
}

/// 协议栈层（phy、mac、routing、application…）
pub trait LayerModel {
    fn tx(&mut self, to: Call, from: Call, packet: Packet);
    fn rx(&mut self, to: Call, from: Call, packet: Packet);
    fn header_size(&self, _to: Call) -> usize {
        0
    }
}

pub trait MobilityModel {
    fn position(&self, to: Call) -> Position;
    fn update(&mut self, to: Call, now: SimTime);
}

pub trait EnergyModel {
    fn consume(&mut self, to: Call, joules: f64);
    fn remaining(&self, to: Call) -> f64;
}

/// 传感器与环境物理量
pub trait SensorModel {
    fn read(&mut self, to: Call, at: Position, now: SimTime) -> f64;
}

pub trait MonitorModel {
    fn observe(&mut self, to: Call, from: Call, what: &str);
}

/// 介质上的传播相关模型（路径损耗、阴影、衰落、噪声…），对接收功率做修正。
pub trait PropagationModel {
    fn apply(&mut self, to: Call, src: Position, dst: Position, rx_dbm: f64) -> f64;
}

pub trait ModulationModel {
    fn bit_error_rate(&self, to: Call, snr: f64) -> f64;
}

pub trait MapModel {
    /// 地图覆盖的范围；全局地图用它确定世界大小。
    fn area(&self) -> Option<Area>;
}

/// 原生模块导出的方法表指针，由调用方按模型类型解释。
#[derive(Debug, Clone, Copy)]
pub struct NativeMethods(pub *const c_void);

/// 一个类加载后的方法表，每个类恰好对应一种能力集。
pub enum Methods {
    Layer(Box<dyn LayerModel>),
    Mobility(Box<dyn MobilityModel>),
    Energy(Box<dyn EnergyModel>),
    Sensor(Box<dyn SensorModel>),
    Monitor(Box<dyn MonitorModel>),
    Propagation(Box<dyn PropagationModel>),
    Modulation(Box<dyn ModulationModel>),
    Map(Box<dyn MapModel>),
    Native(NativeMethods),
}

impl Methods {
    /// 原生方法表无法在 Rust 侧判断能力集，返回 `None`。
    pub fn capability(&self) -> Option<Capability> {
        Some(match self {
            Methods::Layer(_) => Capability::Layer,
            Methods::Mobility(_) => Capability::Mobility,
            Methods::Energy(_) => Capability::Energy,
            Methods::Sensor(_) => Capability::Sensor,
            Methods::Monitor(_) => Capability::Monitor,
            Methods::Propagation(_) => Capability::Propagation,
            Methods::Modulation(_) => Capability::Modulation,
            Methods::Map(_) => Capability::Map,
            Methods::Native(_) => return None,
        })
    }
}

impl std::fmt::Debug for Methods {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Methods::Native(m) => f.debug_tuple("Native").field(&m.0).finish(),
            other => write!(f, "Methods({:?})", other.capability()),
        }
    }
}
