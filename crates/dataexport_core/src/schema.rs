//! Schema descriptors and the member enumerator.
//!
//! A composite type registers its members once through
//! [`SpecSchemaBuilder`]. Builders read members through a run-scoped
//! [`ReflectCache`] so each type is described at most once per export.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use tracing::debug;

use crate::classify::{EnumTypeClass, classify_type};
use crate::spec::{EnumFormatHint, EnumMemberRole, EnumTypeDesc, SpecCompositeType};
use crate::value::{EnumValue, ToExportValue};

/// A type that can be decomposed into members.
///
/// ```
/// use dataexport_core::{Exportable, SpecSchema};
///
/// struct Point { x: i32, y: i32 }
///
/// impl Exportable for Point {
///     const TYPE_NAME: &'static str = "Point";
///     const TYPE_FULL_NAME: &'static str = "geo::Point";
///
///     fn schema() -> SpecSchema {
///         SpecSchema::builder::<Self>()
///             .property("X", |p: &Point| p.x)
///             .property("Y", |p: &Point| p.y)
///             .build()
///     }
/// }
/// ```
pub trait Exportable: Any {
    /// Short name, used as node label and table name.
    const TYPE_NAME: &'static str;
    /// Qualified name, used as type label.
    const TYPE_FULL_NAME: &'static str;

    /// Ordered member list.
    fn schema() -> SpecSchema;
}

impl SpecCompositeType {
    /// Descriptor of a registered composite type.
    pub fn of<T: Exportable>() -> Self {
        Self {
            name: T::TYPE_NAME,
            full_name: T::TYPE_FULL_NAME,
            schema: T::schema,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region Members

type MemberAccessor = Rc<dyn Fn(&dyn Any) -> EnumValue>;

/// One exported member: name, declared type, accessor and hints.
#[derive(Clone)]
pub struct SpecMember {
    pub name: String,
    pub role: EnumMemberRole,
    pub declared: EnumTypeDesc,
    /// Column header override.
    pub header: Option<String>,
    /// Display-format override.
    pub format_hint: Option<EnumFormatHint>,
    accessor: MemberAccessor,
}

impl SpecMember {
    /// Read the member from `instance`. An instance of another type
    /// yields [`EnumValue::Null`].
    pub fn get(&self, instance: &dyn Any) -> EnumValue {
        (self.accessor)(instance)
    }
}

impl fmt::Debug for SpecMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecMember")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("declared", &self.declared)
            .field("header", &self.header)
            .field("format_hint", &self.format_hint)
            .finish_non_exhaustive()
    }
}

/// Ordered members of one composite type.
#[derive(Debug, Clone)]
pub struct SpecSchema {
    pub type_name: &'static str,
    pub type_full_name: &'static str,
    pub members: Vec<SpecMember>,
}

impl SpecSchema {
    /// Start registering members of `T`.
    pub fn builder<T: Exportable>() -> SpecSchemaBuilder<T> {
        SpecSchemaBuilder::new()
    }

    pub fn member(&self, name: &str) -> Option<&SpecMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Registration helper behind [`SpecSchema::builder`].
///
/// Members keep registration order within their role; properties are
/// listed before fields.
pub struct SpecSchemaBuilder<T> {
    properties: Vec<SpecMember>,
    fields: Vec<SpecMember>,
    last: Option<EnumMemberRole>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Exportable> SpecSchemaBuilder<T> {
    fn new() -> Self {
        Self {
            properties: Vec::new(),
            fields: Vec::new(),
            last: None,
            _marker: PhantomData,
        }
    }

    /// Register a property.
    pub fn property<V, F>(self, name: &str, get: F) -> Self
    where
        V: ToExportValue + 'static,
        F: Fn(&T) -> V + 'static,
    {
        self.push(EnumMemberRole::Property, name, get)
    }

    /// Register a plain field.
    pub fn field<V, F>(self, name: &str, get: F) -> Self
    where
        V: ToExportValue + 'static,
        F: Fn(&T) -> V + 'static,
    {
        self.push(EnumMemberRole::Field, name, get)
    }

    /// Set the header of the member registered last.
    pub fn header(mut self, header: &str) -> Self {
        if let Some(member) = self.last_mut() {
            member.header = Some(header.to_string());
        }
        self
    }

    /// Set the display hint of the member registered last.
    pub fn format(mut self, hint: EnumFormatHint) -> Self {
        if let Some(member) = self.last_mut() {
            member.format_hint = Some(hint);
        }
        self
    }

    pub fn build(self) -> SpecSchema {
        let mut members = self.properties;
        members.extend(self.fields);
        SpecSchema {
            type_name: T::TYPE_NAME,
            type_full_name: T::TYPE_FULL_NAME,
            members,
        }
    }

    fn push<V, F>(mut self, role: EnumMemberRole, name: &str, get: F) -> Self
    where
        V: ToExportValue + 'static,
        F: Fn(&T) -> V + 'static,
    {
        let accessor: MemberAccessor = Rc::new(move |instance: &dyn Any| {
            match instance.downcast_ref::<T>() {
                Some(obj) => get(obj).to_export_value(),
                None => EnumValue::Null,
            }
        });
        let member = SpecMember {
            name: name.to_string(),
            role,
            declared: V::export_type(),
            header: None,
            format_hint: None,
            accessor,
        };
        match role {
            EnumMemberRole::Property => self.properties.push(member),
            EnumMemberRole::Field => self.fields.push(member),
        }
        self.last = Some(role);
        self
    }

    fn last_mut(&mut self) -> Option<&mut SpecMember> {
        match self.last? {
            EnumMemberRole::Property => self.properties.last_mut(),
            EnumMemberRole::Field => self.fields.last_mut(),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Cache

/// Run-scoped memo of type classifications and member lists.
#[derive(Debug, Default)]
pub struct ReflectCache {
    dict_class: HashMap<EnumTypeDesc, EnumTypeClass>,
    dict_schema: HashMap<&'static str, Rc<SpecSchema>>,
}

impl ReflectCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify `desc`, memoized.
    pub fn classify(&mut self, desc: &EnumTypeDesc) -> EnumTypeClass {
        if let Some(class) = self.dict_class.get(desc) {
            return *class;
        }
        let class = classify_type(desc);
        self.dict_class.insert(desc.clone(), class);
        class
    }

    /// Members of `composite`, described once per run.
    pub fn members_of(&mut self, composite: &SpecCompositeType) -> Rc<SpecSchema> {
        if let Some(schema) = self.dict_schema.get(composite.full_name) {
            return Rc::clone(schema);
        }
        let schema = Rc::new((composite.schema)());
        debug!(
            type_name = composite.full_name,
            n_members = schema.members.len(),
            "described composite type"
        );
        self.dict_schema
            .insert(composite.full_name, Rc::clone(&schema));
        schema
    }

    /// Number of composite types described so far.
    pub fn n_described(&self) -> usize {
        self.dict_schema.len()
    }
}

/// Members of `composite` without a cache.
pub fn members_of(composite: &SpecCompositeType) -> SpecSchema {
    (composite.schema)()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
