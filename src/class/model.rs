//! 模型类型
//!
//! 每个类声明一种模型类型（由文档中的标签决定），模型类型决定它必须提供的能力集。

use serde::Serialize;
use std::fmt;

/// 类的模型类型，与文档中声明类时使用的标签一一对应。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Application,
    Routing,
    Mac,
    Transceiver,
    Phy,
    Coding,
    Interference,
    Modulator,
    Error,
    SignalTracker,
    Interface,
    Mobility,
    Energy,
    Sensor,
    Monitor,
    Pathloss,
    Shadowing,
    Fading,
    Spectrum,
    Interferences,
    Intermodulation,
    Noise,
    Modulation,
    Link,
    Map,
    Physical,
    GlobalMap,
}

/// 能力集：同一能力集的模型共享一套方法表。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Layer,
    Mobility,
    Energy,
    Sensor,
    Monitor,
    Propagation,
    Modulation,
    Map,
}

impl ModelType {
    pub const ALL: [ModelType; 27] = [
        ModelType::Application,
        ModelType::Routing,
        ModelType::Mac,
        ModelType::Transceiver,
        ModelType::Phy,
        ModelType::Coding,
        ModelType::Interference,
        ModelType::Modulator,
        ModelType::Error,
        ModelType::SignalTracker,
        ModelType::Interface,
        ModelType::Mobility,
        ModelType::Energy,
        ModelType::Sensor,
        ModelType::Monitor,
        ModelType::Pathloss,
        ModelType::Shadowing,
        ModelType::Fading,
        ModelType::Spectrum,
        ModelType::Interferences,
        ModelType::Intermodulation,
        ModelType::Noise,
        ModelType::Modulation,
        ModelType::Link,
        ModelType::Map,
        ModelType::Physical,
        ModelType::GlobalMap,
    ];

    pub fn tag(self) -> &'static str {
        match self {
            ModelType::Application => "application",
            ModelType::Routing => "routing",
            ModelType::Mac => "mac",
            ModelType::Transceiver => "transceiver",
            ModelType::Phy => "phy",
            ModelType::Coding => "coding",
            ModelType::Interference => "interference",
            ModelType::Modulator => "modulator",
            ModelType::Error => "error",
            ModelType::SignalTracker => "signal_tracker",
            ModelType::Interface => "interface",
            ModelType::Mobility => "mobility",
            ModelType::Energy => "energy",
            ModelType::Sensor => "sensor",
            ModelType::Monitor => "monitor",
            ModelType::Pathloss => "pathloss",
            ModelType::Shadowing => "shadowing",
            ModelType::Fading => "fading",
            ModelType::Spectrum => "spectrum",
            ModelType::Interferences => "interferences",
            ModelType::Intermodulation => "intermodulation",
            ModelType::Noise => "noise",
            ModelType::Modulation => "modulation",
            ModelType::Link => "link",
            ModelType::Map => "map",
            ModelType::Physical => "physical",
            ModelType::GlobalMap => "global_map",
        }
    }

    pub fn from_tag(tag: &str) -> Option<ModelType> {
        ModelType::ALL.into_iter().find(|m| m.tag() == tag)
    }

    pub fn capability(self) -> Capability {
        match self {
            ModelType::Application
            | ModelType::Routing
            | ModelType::Mac
            | ModelType::Transceiver
            | ModelType::Phy
            | ModelType::Coding
            | ModelType::Interference
            | ModelType::Modulator
            | ModelType::Error
            | ModelType::SignalTracker
            | ModelType::Interface => Capability::Layer,
            ModelType::Mobility => Capability::Mobility,
            ModelType::Energy => Capability::Energy,
            ModelType::Sensor | ModelType::Physical => Capability::Sensor,
            ModelType::Monitor => Capability::Monitor,
            ModelType::Pathloss
            | ModelType::Shadowing
            | ModelType::Fading
            | ModelType::Spectrum
            | ModelType::Interferences
            | ModelType::Intermodulation
            | ModelType::Noise
            | ModelType::Link => Capability::Propagation,
            ModelType::Modulation => Capability::Modulation,
            ModelType::Map | ModelType::GlobalMap => Capability::Map,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// 模块导出的模型描述（必需）。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub kind: ModelType,
    pub description: String,
}

impl Model {
    pub fn new(kind: ModelType, description: impl Into<String>) -> Self {
        Model {
            kind,
            description: description.into(),
        }
    }
}
