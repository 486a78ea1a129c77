//! Shared export specification models, options and errors.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error;

use crate::conf::{C_DEFAULT_DATETIME_FORMAT, C_DEFAULT_ROOT_LABEL, C_SEQUENCE_LABEL_PREFIX};
use crate::schema::SpecSchema;

////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Top-level export failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// Caller supplied something the export cannot work with.
    /// Raised before anything is written.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A collaborator failed while persisting output.
    #[error("failed to write {target}: {message}")]
    ExternalWrite {
        /// Output path or surface name.
        target: String,
        /// Underlying error text.
        message: String,
    },
}

impl ExportError {
    /// Shorthand for [`ExportError::InvalidInput`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Shorthand for [`ExportError::ExternalWrite`].
    pub fn external(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::ExternalWrite {
            target: target.into(),
            message: message.to_string(),
        }
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ExportError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LeafKinds

/// Closed set of scalar kinds exported as a single value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EnumLeafKind {
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// Fixed-point decimal, see [`crate::value::SpecDecimal`].
    Decimal,
    Boolean,
    Char,
    /// Calendar date-time without offset.
    DateTime,
    String,
    /// Named constant of a registered enumeration.
    Enum,
}

impl EnumLeafKind {
    /// Every leaf kind, in declaration order.
    pub const ALL: [EnumLeafKind; 16] = [
        EnumLeafKind::Int8,
        EnumLeafKind::Int16,
        EnumLeafKind::Int32,
        EnumLeafKind::Int64,
        EnumLeafKind::UInt8,
        EnumLeafKind::UInt16,
        EnumLeafKind::UInt32,
        EnumLeafKind::UInt64,
        EnumLeafKind::Float32,
        EnumLeafKind::Float64,
        EnumLeafKind::Decimal,
        EnumLeafKind::Boolean,
        EnumLeafKind::Char,
        EnumLeafKind::DateTime,
        EnumLeafKind::String,
        EnumLeafKind::Enum,
    ];

    /// Short type label used for element names and type attributes.
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Int8 => "i8",
            Self::Int16 => "i16",
            Self::Int32 => "i32",
            Self::Int64 => "i64",
            Self::UInt8 => "u8",
            Self::UInt16 => "u16",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Decimal => "Decimal",
            Self::Boolean => "bool",
            Self::Char => "char",
            Self::DateTime => "DateTime",
            Self::String => "String",
            Self::Enum => "Enum",
        }
    }

    /// `true` for char and string kinds.
    pub fn is_textual(self) -> bool {
        matches!(self, Self::Char | Self::String)
    }

    /// `true` for integer, float and decimal kinds.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
                | Self::Float32
                | Self::Float64
                | Self::Decimal
        )
    }

    /// `true` for integer kinds only.
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::UInt8
                | Self::UInt16
                | Self::UInt32
                | Self::UInt64
        )
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TypeDescriptors

/// Name pair of a registered enumeration type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecNamedType {
    /// Short name, e.g. `Status`.
    pub name: &'static str,
    /// Qualified name, e.g. `shop::Status`.
    pub full_name: &'static str,
}

/// Registered composite type: names plus its schema factory.
///
/// Identity is the qualified name; two descriptors with the same
/// `full_name` are the same type.
#[derive(Clone, Copy)]
pub struct SpecCompositeType {
    /// Short name, used as element label.
    pub name: &'static str,
    /// Qualified name, used as type label.
    pub full_name: &'static str,
    /// Produces the ordered member list.
    pub schema: fn() -> SpecSchema,
}

impl fmt::Debug for SpecCompositeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpecCompositeType")
            .field("name", &self.name)
            .field("full_name", &self.full_name)
            .finish()
    }
}

impl PartialEq for SpecCompositeType {
    fn eq(&self, other: &Self) -> bool {
        self.full_name == other.full_name
    }
}

impl Eq for SpecCompositeType {}

impl Hash for SpecCompositeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.full_name.hash(state);
    }
}

/// Declared shape of a member, element or root type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnumTypeDesc {
    /// Built-in scalar.
    Leaf(EnumLeafKind),
    /// Registered enumeration, always a leaf.
    Enumerated(SpecNamedType),
    /// Nullable wrapper around another type.
    Optional(Box<EnumTypeDesc>),
    /// Registered record with members.
    Composite(SpecCompositeType),
    /// Homogeneous sequence of the inner type.
    Sequence(Box<EnumTypeDesc>),
}

impl EnumTypeDesc {
    /// Strip every optional wrapper.
    pub fn unwrap_optional(&self) -> &EnumTypeDesc {
        match self {
            Self::Optional(inner) => inner.unwrap_optional(),
            other => other,
        }
    }

    /// Short label, optional wrappers ignored.
    pub fn name(&self) -> String {
        match self {
            Self::Leaf(kind) => kind.type_name().to_string(),
            Self::Enumerated(named) => named.name.to_string(),
            Self::Optional(inner) => inner.name(),
            Self::Composite(composite) => composite.name.to_string(),
            Self::Sequence(inner) => format!("{C_SEQUENCE_LABEL_PREFIX}{}_", inner.name()),
        }
    }

    /// Qualified label, optional wrappers ignored.
    pub fn full_name(&self) -> String {
        match self {
            Self::Leaf(kind) => kind.type_name().to_string(),
            Self::Enumerated(named) => named.full_name.to_string(),
            Self::Optional(inner) => inner.full_name(),
            Self::Composite(composite) => composite.full_name.to_string(),
            Self::Sequence(inner) => format!("{C_SEQUENCE_LABEL_PREFIX}{}_", inner.full_name()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MemberHints

/// Whether a member was registered as a property or a plain field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumMemberRole {
    Property,
    Field,
}

impl EnumMemberRole {
    /// Role tag written to tree output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::Field => "Field",
        }
    }
}

/// Display-format hint attached to a tabular column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum EnumFormatHint {
    /// Leave rendering to the consumer.
    #[default]
    General,
    /// Verbatim text; numeric-looking strings stay strings.
    Text,
    /// Whole number.
    Number,
    Date,
    DateTime,
    Time,
    Currency,
    Accounting,
    /// Consumer-specific format code, passed through as-is.
    Custom(String),
}

impl EnumFormatHint {
    /// Hint inferred from the leaf kind when nothing explicit is given.
    pub fn infer(kind: EnumLeafKind) -> Self {
        match kind {
            EnumLeafKind::DateTime => Self::DateTime,
            EnumLeafKind::Char | EnumLeafKind::String => Self::Text,
            _ => Self::General,
        }
    }

    /// Reject hints that cannot be mapped to a format code.
    pub fn validate(&self) -> Result<()> {
        if let Self::Custom(code) = self
            && code.trim().is_empty()
        {
            return Err(ExportError::invalid(
                "Custom format hint requires a non-empty format code.",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for EnumFormatHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => write!(f, "general"),
            Self::Text => write!(f, "text"),
            Self::Number => write!(f, "number"),
            Self::Date => write!(f, "date"),
            Self::DateTime => write!(f, "datetime"),
            Self::Time => write!(f, "time"),
            Self::Currency => write!(f, "currency"),
            Self::Accounting => write!(f, "accounting"),
            Self::Custom(code) => write!(f, "custom:{code}"),
        }
    }
}

impl FromStr for EnumFormatHint {
    type Err = ExportError;

    /// Parse `general|text|number|date|datetime|time|currency|accounting`
    /// (case-insensitive) or `custom:<code>`.
    fn from_str(s: &str) -> Result<Self> {
        let c_raw = s.trim();
        if let Some((c_prefix, c_code)) = c_raw.split_once(':')
            && c_prefix.eq_ignore_ascii_case("custom")
        {
            let hint = Self::Custom(c_code.to_string());
            hint.validate()?;
            return Ok(hint);
        }

        match c_raw.to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "text" => Ok(Self::Text),
            "number" => Ok(Self::Number),
            "date" => Ok(Self::Date),
            "datetime" | "date_time" => Ok(Self::DateTime),
            "time" => Ok(Self::Time),
            "currency" => Ok(Self::Currency),
            "accounting" => Ok(Self::Accounting),
            _ => Err(ExportError::invalid(format!(
                "Unknown format hint: {c_raw:?}."
            ))),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region BuildOptions

/// Options for [`crate::tree::build_tree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecTreeOptions {
    /// Label of the outermost node.
    pub root_label: String,
    /// `chrono` strftime pattern for date-time leaves.
    pub datetime_format: String,
}

impl Default for SpecTreeOptions {
    fn default() -> Self {
        Self {
            root_label: C_DEFAULT_ROOT_LABEL.to_string(),
            datetime_format: C_DEFAULT_DATETIME_FORMAT.to_string(),
        }
    }
}

/// Options for [`crate::table::build_table`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecTableOptions {
    /// Trim leading/trailing whitespace of string and char cells.
    pub if_trim: bool,
    /// Header text by member name; wins over the member's own header.
    pub header_overrides: BTreeMap<String, String>,
    /// Display hint by member name; wins over the member's own hint.
    pub format_hints: BTreeMap<String, EnumFormatHint>,
    /// Header for the single column of a leaf-typed table.
    /// `None` keeps such tables header-less.
    pub leaf_header: Option<String>,
    /// Display hint for the single column of a leaf-typed table.
    pub leaf_format_hint: Option<EnumFormatHint>,
}

impl SpecTableOptions {
    /// Set trimming.
    pub fn with_trim(mut self, if_trim: bool) -> Self {
        self.if_trim = if_trim;
        self
    }

    /// Add one header override.
    pub fn with_header(mut self, member: &str, header: &str) -> Self {
        self.header_overrides
            .insert(member.to_string(), header.to_string());
        self
    }

    /// Add one format hint override.
    pub fn with_format(mut self, member: &str, hint: EnumFormatHint) -> Self {
        self.format_hints.insert(member.to_string(), hint);
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
