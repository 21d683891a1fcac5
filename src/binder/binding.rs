//! 角色绑定
//!
//! 介质与环境共用的绑定流程：按角色计数并分配，逐个子元素解析类、记录反查位置、
//! 解析参数，最后调用类的 `bind` 钩子。钩子失败只告警，不中止配置。

use crate::class::{Class, ClassTable};
use crate::config::Element;
use crate::error::{ConfigError, HookError};
use crate::id::{ClassId, Owner};
use crate::param::{DefaultParamStore, Scope};
use crate::role::{self, RoleSlots, role_index};
use serde::Serialize;
use tracing::{debug, trace, warn};

/// 可被绑定类的拥有者（介质、环境）
pub trait BindTarget: RoleSlots {
    fn context(&self) -> String;
    fn owner(&self) -> Owner;
    fn classes_mut(&mut self) -> &mut Vec<ClassId>;
    /// 记录类在本拥有者中的位置
    fn record_position(&self, class: &mut Class, position: usize);
    /// 本拥有者的参数作用域
    fn scope(&self, class: ClassId) -> Scope;
}

/// 非致命的绑定失败
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindFailure {
    pub class: ClassId,
    pub owner: Owner,
    pub reason: String,
}

/// 依次绑定 `el` 的每个角色子元素
pub fn bind_roles<T: BindTarget>(
    target: &mut T,
    el: &Element,
    classes: &mut ClassTable,
    store: &mut DefaultParamStore,
) -> Result<Vec<BindFailure>, ConfigError> {
    let context = target.context();
    let counts = role::count_roles(el, T::ROLES, &[], &context)?;
    role::allocate(target, &counts);
    *target.classes_mut() = Vec::with_capacity(counts.iter().sum());

    let mut failures = Vec::new();
    for child in &el.children {
        let Some(i) = role_index(T::ROLES, &child.tag) else {
            continue;
        };
        let name = child.required_attr("name", &context)?;
        let class_id = classes.resolve(name, &context)?;
        target.slot(i).store(class_id);

        let position = target.classes_mut().len();
        target.classes_mut().push(class_id);
        let class = classes.class_mut(class_id);
        target.record_position(class, position);
        if class.declared.tag() != child.tag {
            warn!(class = %class.name, role = %child.tag, declared = %class.declared, "类以不同于声明的角色绑定");
        }

        let scope = target.scope(class_id);
        let inline = child.inline_params(&context)?;
        let params = store.resolve_and_record(&scope, &inline, scope);
        trace!(class = %class.name, position, params = params.len(), "参数已解析");

        let owner = target.owner();
        if let Err(e) = class.bind(owner, &params) {
            report(&context, class, &e);
            failures.push(BindFailure {
                class: class_id,
                owner,
                reason: e.to_string(),
            });
        }
    }

    role::verify_filled(target, &counts, &context)?;
    debug!(context = %context, classes = target.classes_mut().len(), failures = failures.len(), "角色绑定完成");
    Ok(failures)
}

fn report(context: &str, class: &Class, e: &HookError) {
    warn!(context, class = %class.name, error = %e, "bind 钩子失败，继续绑定其余类");
}
