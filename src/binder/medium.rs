//! 介质
//!
//! 无线介质及其传播相关角色的绑定。

use super::binding::{BindFailure, BindTarget, bind_roles};
use crate::class::{Class, ClassTable};
use crate::config::Element;
use crate::error::ConfigError;
use crate::id::{ClassId, MediumId, Owner};
use crate::param::{DefaultParamStore, Scope};
use crate::role::{RoleSlots, RoleSpec, SlotMut, singleton_filled};
use serde::Serialize;
use tracing::info;

/// 真空光速（米/秒）
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Medium {
    pub id: MediumId,
    pub name: String,
    /// 传播范围（米），`None` 表示不限
    pub range: Option<f64>,
    pub speed: f64,
    pub spectrum: Option<ClassId>,
    pub pathloss: Option<ClassId>,
    pub shadowing: Option<ClassId>,
    pub fading: Option<ClassId>,
    pub interferences: Option<ClassId>,
    pub intermodulation: Option<ClassId>,
    pub noise: Option<ClassId>,
    pub modulations: Vec<ClassId>,
    pub monitors: Vec<ClassId>,
    pub links: Vec<ClassId>,
    /// 绑定到本介质的所有类，按声明顺序
    pub classes: Vec<ClassId>,
    pub global_map: Option<ClassId>,
}

impl Medium {
    fn new(id: MediumId, name: String) -> Self {
        Medium {
            id,
            name,
            range: None,
            speed: SPEED_OF_LIGHT,
            spectrum: None,
            pathloss: None,
            shadowing: None,
            fading: None,
            interferences: None,
            intermodulation: None,
            noise: None,
            modulations: Vec::new(),
            monitors: Vec::new(),
            links: Vec::new(),
            classes: Vec::new(),
            global_map: None,
        }
    }
}

impl RoleSlots for Medium {
    const ROLES: &'static [RoleSpec] = &[
        RoleSpec::singleton("spectrum"),
        RoleSpec::singleton("pathloss"),
        RoleSpec::singleton("shadowing"),
        RoleSpec::singleton("fading"),
        RoleSpec::singleton("interferences"),
        RoleSpec::singleton("intermodulation"),
        RoleSpec::singleton("noise"),
        RoleSpec::array("modulation"),
        RoleSpec::array("monitor"),
        RoleSpec::array("link"),
    ];

    fn slot(&mut self, role: usize) -> SlotMut<'_> {
        match role {
            0 => SlotMut::Singleton(&mut self.spectrum),
            1 => SlotMut::Singleton(&mut self.pathloss),
            2 => SlotMut::Singleton(&mut self.shadowing),
            3 => SlotMut::Singleton(&mut self.fading),
            4 => SlotMut::Singleton(&mut self.interferences),
            5 => SlotMut::Singleton(&mut self.intermodulation),
            6 => SlotMut::Singleton(&mut self.noise),
            7 => SlotMut::Array(&mut self.modulations),
            8 => SlotMut::Array(&mut self.monitors),
            _ => SlotMut::Array(&mut self.links),
        }
    }

    fn filled(&self, role: usize) -> usize {
        match role {
            0 => singleton_filled(self.spectrum),
            1 => singleton_filled(self.pathloss),
            2 => singleton_filled(self.shadowing),
            3 => singleton_filled(self.fading),
            4 => singleton_filled(self.interferences),
            5 => singleton_filled(self.intermodulation),
            6 => singleton_filled(self.noise),
            7 => self.modulations.len(),
            8 => self.monitors.len(),
            _ => self.links.len(),
        }
    }
}

impl BindTarget for Medium {
    fn context(&self) -> String {
        format!("介质 '{}'", self.name)
    }

    fn owner(&self) -> Owner {
        Owner::Medium(self.id)
    }

    fn classes_mut(&mut self) -> &mut Vec<ClassId> {
        &mut self.classes
    }

    fn record_position(&self, class: &mut Class, position: usize) {
        class.set_medium_position(self.id, position);
    }

    fn scope(&self, class: ClassId) -> Scope {
        Scope::class(class).medium(self.id)
    }
}

/// 解析并绑定一个介质
#[tracing::instrument(skip_all, fields(medium = %id))]
pub fn bind_medium(
    id: MediumId,
    el: &Element,
    global_map: Option<ClassId>,
    classes: &mut ClassTable,
    store: &mut DefaultParamStore,
) -> Result<(Medium, Vec<BindFailure>), ConfigError> {
    let name = el.required_attr("name", "medium")?.to_string();
    let mut medium = Medium::new(id, name);
    let context = medium.context();
    medium.range = el.parse_attr("range", &context)?;
    if let Some(speed) = el.parse_attr("speed", &context)? {
        medium.speed = speed;
    }
    medium.global_map = global_map;

    let failures = bind_roles(&mut medium, el, classes, store)?;
    info!(medium = %medium.name, classes = medium.classes.len(), "介质绑定完成");
    Ok((medium, failures))
}
