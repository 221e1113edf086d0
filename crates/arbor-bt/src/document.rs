//! Serializable tree documents.
//!
//! A document is the on-disk form of a template: a blackboard declaration plus a nested node
//! list. Actions are referenced by name and built through an [`ActionRegistry`].
//!
//! Blackboard values are written as single-key maps (`{ bool: false }`, `{ int: 3 }`). Load YAML
//! through [`TreeDocument::from_yaml_str`]: `serde_yaml` only accepts `!tag` syntax for enums, so
//! the text is read into a `serde_json::Value` first.
//!
//! ```
//! use arbor_bt::{ActionRegistry, BtStatus, TickContext, TreeDocument};
//!
//! let doc = TreeDocument::from_yaml_str(
//!     r#"
//! name: Guard
//! blackboard:
//!   - key: alert
//!     value: { bool: false }
//! children:
//!   - type: selector
//!     children:
//!       - type: condition_gate
//!         conditions:
//!           - { key: alert, comparison: equal, value: { bool: true } }
//!         children:
//!           - { type: action, action: wait, params: { seconds: 1.0 } }
//!       - { type: action, action: succeed }
//! "#,
//! )?;
//! let mut tree = doc.to_template(&ActionRegistry::with_builtins())?.instantiate()?;
//! assert_eq!(tree.tick(TickContext::new(1, 0.1)), BtStatus::Running);
//! assert_eq!(tree.tick(TickContext::new(2, 0.1)), BtStatus::Success);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;

use arbor_core::{BbValue, BlackboardProperty, BtStatus, Condition};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{
    ActionNode, BuildError, CompositeKind, DecoratorKind, DocumentError, Fail, NodeDefinition,
    NodeId, NodeKind, ParallelPolicy, SetProperty, Succeed, TreeTemplate, Wait,
};

type ActionFactory = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn ActionNode>, String>>;

/// Named action constructors used when loading documents.
pub struct ActionRegistry {
    factories: BTreeMap<String, ActionFactory>,
}

impl ActionRegistry {
    /// A registry without any actions.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry with `wait`, `succeed`, `fail` and `set_property`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("wait", |params| {
            let params: WaitParams = parse_params(params)?;
            Ok(Box::new(Wait::new(params.seconds)))
        });
        registry.register("succeed", |_| Ok(Box::new(Succeed)));
        registry.register("fail", |_| Ok(Box::new(Fail)));
        registry.register("set_property", |params| {
            let params: SetPropertyParams = parse_params(params)?;
            Ok(Box::new(SetProperty::new(params.value)))
        });
        registry
    }

    /// Register (or replace) the constructor for `name`.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Box<dyn ActionNode>, String> + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn build(
        &self,
        node: &str,
        action: &str,
        params: &serde_json::Value,
    ) -> Result<Box<dyn ActionNode>, BuildError> {
        let factory = self
            .factories
            .get(action)
            .ok_or_else(|| BuildError::UnhandledNodeKind {
                node: node.to_string(),
                kind: format!("action `{action}`"),
            })?;
        factory(params).map_err(|reason| BuildError::InvalidParams {
            node: node.to_string(),
            reason,
        })
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[derive(Debug, Deserialize)]
struct WaitParams {
    seconds: f32,
}

#[derive(Debug, Deserialize)]
struct SetPropertyParams {
    value: BbValue,
}

fn parse_params<T: DeserializeOwned>(params: &serde_json::Value) -> Result<T, String> {
    serde_json::from_value(params.clone()).map_err(|err| err.to_string())
}

fn default_root_name() -> String {
    "Root".to_string()
}

/// A whole tree: the root's name, its blackboard and the root's children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeDocument {
    #[serde(default = "default_root_name")]
    pub name: String,

    #[serde(default)]
    pub blackboard: Vec<BlackboardProperty>,

    #[serde(default)]
    pub children: Vec<NodeDocument>,
}

/// One node. Only the fields relevant to `type` are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDocument {
    /// `sequence`, `selector`, `random_selector`, `parallel`, `inverter`, `repeat`, `repeater`,
    /// `until`, `condition_gate`, `force_success`, `force_failure` or `action`.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub guid: Option<String>,

    #[serde(default)]
    pub tag: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub children: Vec<NodeDocument>,

    #[serde(default)]
    pub policy: Option<ParallelPolicy>,

    #[serde(default)]
    pub count: Option<u32>,

    #[serde(default)]
    pub until: Option<BtStatus>,

    #[serde(default)]
    pub conditions: Vec<Condition>,

    /// Registry name of the action, for `type: action`.
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub params: serde_json::Value,

    /// Field → blackboard key.
    #[serde(default)]
    pub bind: BTreeMap<String, String>,
}

impl TreeDocument {
    pub fn from_yaml_str(text: &str) -> Result<Self, DocumentError> {
        let value: serde_json::Value = serde_yaml::from_str(text)?;
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Build and validate a template. Fails on the first malformed node.
    pub fn to_template(&self, registry: &ActionRegistry) -> Result<TreeTemplate, BuildError> {
        let mut template = TreeTemplate::new();
        for property in &self.blackboard {
            template.declare_value(property.key.clone(), property.value.clone())?;
        }

        let mut root = NodeDefinition::root();
        root.name = self.name.clone();
        let root = template.add_node(root)?;
        for child in &self.children {
            add_subtree(&mut template, root, child, registry)?;
        }

        template.validate()?;
        Ok(template)
    }
}

fn add_subtree(
    template: &mut TreeTemplate,
    parent: NodeId,
    doc: &NodeDocument,
    registry: &ActionRegistry,
) -> Result<(), BuildError> {
    let id = template.add_child(parent, doc.definition(registry)?)?;
    for child in &doc.children {
        add_subtree(template, id, child, registry)?;
    }
    Ok(())
}

impl NodeDocument {
    pub fn definition(&self, registry: &ActionRegistry) -> Result<NodeDefinition, BuildError> {
        // Unnamed actions take their registry name, other nodes their type.
        let name = self
            .name
            .clone()
            .or_else(|| self.action.clone().filter(|_| self.kind == "action"))
            .unwrap_or_else(|| self.kind.clone());
        let kind = match self.kind.as_str() {
            "sequence" => NodeKind::Composite(CompositeKind::Sequence),
            "selector" => NodeKind::Composite(CompositeKind::Selector),
            "random_selector" => NodeKind::Composite(CompositeKind::RandomSelector),
            "parallel" => {
                NodeKind::Composite(CompositeKind::Parallel(self.policy.unwrap_or_default()))
            }
            "inverter" => NodeKind::Decorator(DecoratorKind::Inverter),
            "repeat" => NodeKind::Decorator(DecoratorKind::Repeat),
            "repeater" => NodeKind::Decorator(DecoratorKind::Repeater {
                count: self.count.unwrap_or(1),
            }),
            "until" => NodeKind::Decorator(DecoratorKind::UntilFor {
                target: self.until.unwrap_or(BtStatus::Success),
            }),
            "condition_gate" => NodeKind::Decorator(DecoratorKind::ConditionGate {
                conditions: self.conditions.clone(),
            }),
            "force_success" => NodeKind::Decorator(DecoratorKind::ForceSuccess),
            "force_failure" => NodeKind::Decorator(DecoratorKind::ForceFailure),
            "action" => {
                let action = self.action.as_deref().ok_or_else(|| BuildError::InvalidParams {
                    node: name.clone(),
                    reason: "missing `action`".to_string(),
                })?;
                NodeKind::Action(registry.build(&name, action, &self.params)?)
            }
            other => {
                return Err(BuildError::UnhandledNodeKind {
                    node: name,
                    kind: other.to_string(),
                })
            }
        };

        let mut def = NodeDefinition::new(name, kind)
            .with_tag(self.tag.clone())
            .with_description(self.description.clone());
        if let Some(guid) = &self.guid {
            def = def.with_guid(guid.clone());
        }
        for (field, key) in &self.bind {
            def = def.bind(field.clone(), key.clone());
        }
        Ok(def)
    }
}
