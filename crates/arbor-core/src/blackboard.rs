use std::fmt;
use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::BlackboardError;

pub type Vec3 = [f32; 3];

/// Type tag of a blackboard value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BbType {
    Int,
    Float,
    Bool,
    Vector,
    Text,
}

impl BbType {
    pub fn is_numeric(self) -> bool {
        matches!(self, BbType::Int | BbType::Float)
    }
}

impl fmt::Display for BbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BbType::Int => "int",
            BbType::Float => "float",
            BbType::Bool => "bool",
            BbType::Vector => "vector",
            BbType::Text => "text",
        };
        f.write_str(name)
    }
}

/// A boxed blackboard value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BbValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Vector(Vec3),
    Text(String),
}

impl BbValue {
    pub fn ty(&self) -> BbType {
        match self {
            BbValue::Int(_) => BbType::Int,
            BbValue::Float(_) => BbType::Float,
            BbValue::Bool(_) => BbType::Bool,
            BbValue::Vector(_) => BbType::Vector,
            BbValue::Text(_) => BbType::Text,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            BbValue::Int(v) => Some(v as f64),
            BbValue::Float(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for BbValue {
    fn from(value: &str) -> Self {
        BbValue::Text(value.to_string())
    }
}

impl From<i64> for BbValue {
    fn from(value: i64) -> Self {
        BbValue::Int(value)
    }
}

impl From<f64> for BbValue {
    fn from(value: f64) -> Self {
        BbValue::Float(value)
    }
}

impl From<bool> for BbValue {
    fn from(value: bool) -> Self {
        BbValue::Bool(value)
    }
}

impl From<Vec3> for BbValue {
    fn from(value: Vec3) -> Self {
        BbValue::Vector(value)
    }
}

impl From<String> for BbValue {
    fn from(value: String) -> Self {
        BbValue::Text(value)
    }
}

/// Rust types that can live in a blackboard slot.
pub trait BlackboardValue: Sized + 'static {
    const TYPE: BbType;

    fn from_value(value: &BbValue) -> Option<Self>;

    fn into_value(self) -> BbValue;
}

impl BlackboardValue for i64 {
    const TYPE: BbType = BbType::Int;

    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> BbValue {
        BbValue::Int(self)
    }
}

impl BlackboardValue for f64 {
    const TYPE: BbType = BbType::Float;

    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> BbValue {
        BbValue::Float(self)
    }
}

impl BlackboardValue for bool {
    const TYPE: BbType = BbType::Bool;

    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> BbValue {
        BbValue::Bool(self)
    }
}

impl BlackboardValue for Vec3 {
    const TYPE: BbType = BbType::Vector;

    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Vector(v) => Some(*v),
            _ => None,
        }
    }

    fn into_value(self) -> BbValue {
        BbValue::Vector(self)
    }
}

impl BlackboardValue for String {
    const TYPE: BbType = BbType::Text;

    fn from_value(value: &BbValue) -> Option<Self> {
        match value {
            BbValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn into_value(self) -> BbValue {
        BbValue::Text(self)
    }
}

/// Typed, named key for a blackboard property.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

/// Index of a property inside the blackboard that owns it.
///
/// Every binding to the same key inside one tree resolves to the same id, so a write through one
/// binding is visible through all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyId(pub usize);

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BlackboardProperty {
    pub key: String,
    pub value: BbValue,
}

impl BlackboardProperty {
    pub fn ty(&self) -> BbType {
        self.value.ty()
    }
}

/// Keyed store of typed values shared by the nodes of one tree.
///
/// `Clone` is a deep copy: the clone has the same keys (and ids) but its own values.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Blackboard {
    properties: Vec<BlackboardProperty>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn properties(&self) -> impl Iterator<Item = &BlackboardProperty> {
        self.properties.iter()
    }

    /// Add a new property. Keys are unique.
    pub fn insert<T: BlackboardValue>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<PropertyId, BlackboardError> {
        self.insert_value(key, value.into_value())
    }

    pub fn insert_value(
        &mut self,
        key: impl Into<String>,
        value: BbValue,
    ) -> Result<PropertyId, BlackboardError> {
        let key = key.into();
        if self.find_property(&key).is_some() {
            return Err(BlackboardError::DuplicateKey { key });
        }
        self.properties.push(BlackboardProperty { key, value });
        Ok(PropertyId(self.properties.len() - 1))
    }

    /// Ordinal scan by key.
    pub fn find_property(&self, key: &str) -> Option<PropertyId> {
        self.properties
            .iter()
            .position(|p| p.key == key)
            .map(PropertyId)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.find_property(key).is_some()
    }

    pub fn property(&self, id: PropertyId) -> Option<&BlackboardProperty> {
        self.properties.get(id.0)
    }

    pub fn value(&self, id: PropertyId) -> Option<&BbValue> {
        self.property(id).map(|p| &p.value)
    }

    pub fn get<T: BlackboardValue>(&self, key: BbKey<T>) -> Result<T, BlackboardError> {
        self.get_by_name(key.name)
    }

    pub fn get_by_name<T: BlackboardValue>(&self, key: &str) -> Result<T, BlackboardError> {
        let id = self.require(key)?;
        self.read(id)
    }

    pub fn set<T: BlackboardValue>(
        &mut self,
        key: BbKey<T>,
        value: T,
    ) -> Result<(), BlackboardError> {
        self.set_by_name(key.name, value)
    }

    /// Overwrite an existing property. The stored type cannot change.
    pub fn set_by_name<T: BlackboardValue>(
        &mut self,
        key: &str,
        value: T,
    ) -> Result<(), BlackboardError> {
        let id = self.require(key)?;
        self.write(id, value)
    }

    pub fn read<T: BlackboardValue>(&self, id: PropertyId) -> Result<T, BlackboardError> {
        let property = self
            .property(id)
            .ok_or(BlackboardError::UnknownProperty { id: id.0 })?;
        T::from_value(&property.value).ok_or_else(|| BlackboardError::PropertyTypeMismatch {
            key: property.key.clone(),
            expected: T::TYPE,
            found: property.ty(),
        })
    }

    pub fn write<T: BlackboardValue>(
        &mut self,
        id: PropertyId,
        value: T,
    ) -> Result<(), BlackboardError> {
        self.write_value(id, value.into_value())
    }

    pub fn write_value(&mut self, id: PropertyId, value: BbValue) -> Result<(), BlackboardError> {
        let property = self
            .properties
            .get_mut(id.0)
            .ok_or(BlackboardError::UnknownProperty { id: id.0 })?;
        if property.ty() != value.ty() {
            return Err(BlackboardError::PropertyTypeMismatch {
                key: property.key.clone(),
                expected: value.ty(),
                found: property.ty(),
            });
        }
        property.value = value;
        Ok(())
    }

    fn require(&self, key: &str) -> Result<PropertyId, BlackboardError> {
        self.find_property(key)
            .ok_or_else(|| BlackboardError::PropertyNotFound {
                key: key.to_string(),
            })
    }
}
