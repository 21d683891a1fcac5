//! 类模块
//!
//! 类（可动态加载的协议/模型实现）的声明、加载、钩子与注册表。

mod implementation;
mod loader;
mod methods;
mod model;
mod module;
mod native;
mod registry;

pub use implementation::{Backend, Implementation};
pub use loader::{LoadRequest, Loaders, ModuleFactory, ModuleLoader, ScriptLoader, SearchPaths, StaticLoader};
pub use methods::{
    Area, EnergyModel, LayerModel, MapModel, Methods, MobilityModel, ModulationModel, MonitorModel,
    NativeMethods, Packet, Position, PropagationModel, SensorModel,
};
pub use model::{Capability, Model, ModelType};
pub use module::{ClassContext, ClassModule, Hook, HookSet, HooklessModule, ObjectHandle};
pub use native::{NativeLoader, NativeModule, RawArea, RawCall, RawModel, RawParam, RawParamList};
pub use registry::{Class, ClassTable, EntityCounts, Instances, register_classes};
