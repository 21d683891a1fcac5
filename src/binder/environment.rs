//! 环境
//!
//! 地图与物理量（温度、光照…）模型的绑定。

use super::binding::{BindFailure, BindTarget, bind_roles};
use crate::class::{Class, ClassTable};
use crate::config::Element;
use crate::error::ConfigError;
use crate::id::{ClassId, EnvironmentId, Owner};
use crate::param::{DefaultParamStore, Scope};
use crate::role::{RoleSlots, RoleSpec, SlotMut, singleton_filled};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Environment {
    pub id: EnvironmentId,
    pub name: String,
    pub map: Option<ClassId>,
    pub physicals: Vec<ClassId>,
    pub monitors: Vec<ClassId>,
    pub classes: Vec<ClassId>,
    pub global_map: Option<ClassId>,
}

impl RoleSlots for Environment {
    const ROLES: &'static [RoleSpec] = &[
        RoleSpec::singleton("map"),
        RoleSpec::array("physical"),
        RoleSpec::array("monitor"),
    ];

    fn slot(&mut self, role: usize) -> SlotMut<'_> {
        match role {
            0 => SlotMut::Singleton(&mut self.map),
            1 => SlotMut::Array(&mut self.physicals),
            _ => SlotMut::Array(&mut self.monitors),
        }
    }

    fn filled(&self, role: usize) -> usize {
        match role {
            0 => singleton_filled(self.map),
            1 => self.physicals.len(),
            _ => self.monitors.len(),
        }
    }
}

impl BindTarget for Environment {
    fn context(&self) -> String {
        format!("环境 '{}'", self.name)
    }

    fn owner(&self) -> Owner {
        Owner::Environment(self.id)
    }

    fn classes_mut(&mut self) -> &mut Vec<ClassId> {
        &mut self.classes
    }

    fn record_position(&self, class: &mut Class, position: usize) {
        class.set_environment_position(self.id, position);
    }

    fn scope(&self, class: ClassId) -> Scope {
        Scope::class(class).environment(self.id)
    }
}

/// 解析并绑定一个环境
#[tracing::instrument(skip_all, fields(environment = %id))]
pub fn bind_environment(
    id: EnvironmentId,
    el: &Element,
    global_map: Option<ClassId>,
    classes: &mut ClassTable,
    store: &mut DefaultParamStore,
) -> Result<(Environment, Vec<BindFailure>), ConfigError> {
    let name = el.required_attr("name", "environment")?.to_string();
    let mut environment = Environment {
        id,
        name,
        map: None,
        physicals: Vec::new(),
        monitors: Vec::new(),
        classes: Vec::new(),
        global_map,
    };

    let failures = bind_roles(&mut environment, el, classes, store)?;
    info!(environment = %environment.name, classes = environment.classes.len(), "环境绑定完成");
    Ok((environment, failures))
}
