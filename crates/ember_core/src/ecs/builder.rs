use crate::ecs::{Component, ComponentId, ContextError, EntityContext, OwnerId, PoolError};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("template {template} is not an allocated asset")]
    UnknownTemplate { template: OwnerId },
    #[error("no registered builder matches any component of template {template}")]
    NoBuilder { template: OwnerId },
    #[error("build argument '{key}' expected {expected} but holds {found}")]
    ArgumentType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("build argument '{key}' is required")]
    MissingArgument { key: String },
    #[error("builder {builder} failed: {reason}")]
    Failed {
        builder: &'static str,
        reason: String,
    },
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Derives actor components from one template component.
///
/// A template asset may carry several template components; every builder
/// whose `Template` the asset carries runs, in builder registration order.
pub trait Builder: Send + Sync + 'static {
    type Template: Component;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn build(
        &self,
        actors: &mut EntityContext,
        owner: OwnerId,
        template: &Self::Template,
        args: &BuildArgs,
    ) -> Result<(), BuildError>;
}

pub(crate) trait ErasedBuilder: Send + Sync {
    fn template_id(&self) -> ComponentId;
    fn name(&self) -> &'static str;
    fn applies_to(&self, assets: &EntityContext, template: OwnerId) -> bool;
    fn build_erased(
        &self,
        actors: &mut EntityContext,
        assets: &EntityContext,
        owner: OwnerId,
        template: OwnerId,
        args: &BuildArgs,
    ) -> Result<(), BuildError>;
}

pub(crate) struct BuilderAdapter<B>(pub(crate) B);

impl<B: Builder> ErasedBuilder for BuilderAdapter<B> {
    fn template_id(&self) -> ComponentId {
        B::Template::id()
    }

    fn name(&self) -> &'static str {
        self.0.name()
    }

    fn applies_to(&self, assets: &EntityContext, template: OwnerId) -> bool {
        assets.has::<B::Template>(template)
    }

    fn build_erased(
        &self,
        actors: &mut EntityContext,
        assets: &EntityContext,
        owner: OwnerId,
        template: OwnerId,
        args: &BuildArgs,
    ) -> Result<(), BuildError> {
        let component = assets.get::<B::Template>(template)?;
        self.0.build(actors, owner, component, args)
    }
}

/// A single build argument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
    Vec2(Vec2),
    Owner(OwnerId),
}

impl ArgValue {
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::Bool(_) => "bool",
            ArgValue::Text(_) => "text",
            ArgValue::Vec2(_) => "vec2",
            ArgValue::Owner(_) => "owner",
        }
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(value.into())
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Float(value)
    }
}

impl From<f32> for ArgValue {
    fn from(value: f32) -> Self {
        ArgValue::Float(value.into())
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        ArgValue::Bool(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::Text(value.to_owned())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::Text(value)
    }
}

impl From<Vec2> for ArgValue {
    fn from(value: Vec2) -> Self {
        ArgValue::Vec2(value)
    }
}

impl From<OwnerId> for ArgValue {
    fn from(value: OwnerId) -> Self {
        ArgValue::Owner(value)
    }
}

/// Keyed argument bag passed to every builder of one build call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildArgs {
    values: BTreeMap<String, ArgValue>,
}

impl BuildArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        expected: &'static str,
        pick: impl FnOnce(&'a ArgValue) -> Option<T>,
    ) -> Result<Option<T>, BuildError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(value) => pick(value).map(Some).ok_or_else(|| BuildError::ArgumentType {
                key: key.to_owned(),
                expected,
                found: value.kind(),
            }),
        }
    }

    pub fn int(&self, key: &str) -> Result<Option<i64>, BuildError> {
        self.typed(key, "int", |value| match value {
            ArgValue::Int(v) => Some(*v),
            _ => None,
        })
    }

    /// Ints widen to floats.
    pub fn float(&self, key: &str) -> Result<Option<f64>, BuildError> {
        self.typed(key, "float", |value| match value {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            _ => None,
        })
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>, BuildError> {
        self.typed(key, "bool", |value| match value {
            ArgValue::Bool(v) => Some(*v),
            _ => None,
        })
    }

    pub fn text(&self, key: &str) -> Result<Option<&str>, BuildError> {
        self.typed(key, "text", |value| match value {
            ArgValue::Text(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn vec2(&self, key: &str) -> Result<Option<Vec2>, BuildError> {
        self.typed(key, "vec2", |value| match value {
            ArgValue::Vec2(v) => Some(*v),
            _ => None,
        })
    }

    pub fn owner(&self, key: &str) -> Result<Option<OwnerId>, BuildError> {
        self.typed(key, "owner", |value| match value {
            ArgValue::Owner(v) => Some(*v),
            _ => None,
        })
    }

    pub fn int_or(&self, key: &str, default: i64) -> Result<i64, BuildError> {
        Ok(self.int(key)?.unwrap_or(default))
    }

    pub fn float_or(&self, key: &str, default: f64) -> Result<f64, BuildError> {
        Ok(self.float(key)?.unwrap_or(default))
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, BuildError> {
        Ok(self.bool(key)?.unwrap_or(default))
    }

    pub fn vec2_or(&self, key: &str, default: Vec2) -> Result<Vec2, BuildError> {
        Ok(self.vec2(key)?.unwrap_or(default))
    }

    /// Fails with `MissingArgument` when absent.
    pub fn require<T>(
        &self,
        key: &str,
        getter: impl FnOnce(&Self, &str) -> Result<Option<T>, BuildError>,
    ) -> Result<T, BuildError> {
        getter(self, key)?.ok_or_else(|| BuildError::MissingArgument {
            key: key.to_owned(),
        })
    }
}

/// Builder backed by a closure, for templates that need no state.
pub struct FnBuilder<T, F> {
    name: &'static str,
    build: F,
    _template: PhantomData<fn(&T)>,
}

impl<T, F> FnBuilder<T, F>
where
    T: Component,
    F: Fn(&mut EntityContext, OwnerId, &T, &BuildArgs) -> Result<(), BuildError>
        + Send
        + Sync
        + 'static,
{
    pub fn new(name: &'static str, build: F) -> Self {
        Self {
            name,
            build,
            _template: PhantomData,
        }
    }
}

impl<T, F> Builder for FnBuilder<T, F>
where
    T: Component,
    F: Fn(&mut EntityContext, OwnerId, &T, &BuildArgs) -> Result<(), BuildError>
        + Send
        + Sync
        + 'static,
{
    type Template = T;

    fn name(&self) -> &'static str {
        self.name
    }

    fn build(
        &self,
        actors: &mut EntityContext,
        owner: OwnerId,
        template: &T,
        args: &BuildArgs,
    ) -> Result<(), BuildError> {
        (self.build)(actors, owner, template, args)
    }
}
