//! Runtime value model and the conversions that feed it.
//!
//! Every exportable value is lowered to [`EnumValue`] through
//! [`ToExportValue`]. Shared objects (`Rc<T>`) and shared sequences
//! ([`SharedSeq`]) carry an identity fingerprint; inline values do not.

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, TimeZone};

use crate::conf::{C_BOOL_FALSE, C_BOOL_TRUE};
use crate::schema::Exportable;
use crate::spec::{EnumLeafKind, EnumTypeDesc, ExportError, Result, SpecCompositeType};

/// Identity of a shared allocation (its address).
pub type Fingerprint = usize;

////////////////////////////////////////////////////////////////////////////////
// #region Decimal

/// Fixed-point decimal: `mantissa * 10^-scale`.
///
/// Scale is kept as given, so `1.00` renders as `1.00`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpecDecimal {
    mantissa: i128,
    scale: u32,
}

impl SpecDecimal {
    /// Largest accepted scale.
    pub const SCALE_MAX: u32 = 28;

    /// Create from raw parts; scale is clamped to [`Self::SCALE_MAX`].
    pub fn new(mantissa: i128, scale: u32) -> Self {
        Self {
            mantissa,
            scale: scale.min(Self::SCALE_MAX),
        }
    }

    pub fn mantissa(&self) -> i128 {
        self.mantissa
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Lossy conversion for numeric consumers.
    pub fn to_f64(&self) -> f64 {
        self.mantissa as f64 / 10f64.powi(self.scale as i32)
    }
}

impl fmt::Display for SpecDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c_sign = if self.mantissa < 0 { "-" } else { "" };
        let c_digits = self.mantissa.unsigned_abs().to_string();
        let n_scale = self.scale as usize;
        if n_scale == 0 {
            return write!(f, "{c_sign}{c_digits}");
        }

        let c_padded = if c_digits.len() <= n_scale {
            format!("{}{c_digits}", "0".repeat(n_scale + 1 - c_digits.len()))
        } else {
            c_digits
        };
        let (c_int, c_frac) = c_padded.split_at(c_padded.len() - n_scale);
        write!(f, "{c_sign}{c_int}.{c_frac}")
    }
}

impl FromStr for SpecDecimal {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        let c_raw = s.trim();
        let err = || ExportError::invalid(format!("The input cannot be changed into a decimal: {s:?}"));

        let (c_sign, c_body) = match c_raw.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", c_raw.strip_prefix('+').unwrap_or(c_raw)),
        };
        let (c_int, c_frac) = c_body.split_once('.').unwrap_or((c_body, ""));
        if (c_int.is_empty() && c_frac.is_empty())
            || !c_int.chars().all(|chr| chr.is_ascii_digit())
            || !c_frac.chars().all(|chr| chr.is_ascii_digit())
        {
            return Err(err());
        }

        let n_scale = u32::try_from(c_frac.len()).map_err(|_| err())?;
        if n_scale > Self::SCALE_MAX {
            return Err(err());
        }
        let n_mantissa = format!("{c_sign}{c_int}{c_frac}")
            .parse::<i128>()
            .map_err(|_| err())?;
        Ok(Self::new(n_mantissa, n_scale))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LeafValues

/// One scalar value of a [`EnumLeafKind`].
#[derive(Debug, Clone, PartialEq)]
pub enum EnumLeafValue {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(SpecDecimal),
    Boolean(bool),
    Char(char),
    DateTime(NaiveDateTime),
    String(String),
    /// Named constant; `type_name` is the enumeration's short name.
    Enum {
        type_name: &'static str,
        variant: &'static str,
    },
}

impl EnumLeafValue {
    pub fn kind(&self) -> EnumLeafKind {
        match self {
            Self::Int8(_) => EnumLeafKind::Int8,
            Self::Int16(_) => EnumLeafKind::Int16,
            Self::Int32(_) => EnumLeafKind::Int32,
            Self::Int64(_) => EnumLeafKind::Int64,
            Self::UInt8(_) => EnumLeafKind::UInt8,
            Self::UInt16(_) => EnumLeafKind::UInt16,
            Self::UInt32(_) => EnumLeafKind::UInt32,
            Self::UInt64(_) => EnumLeafKind::UInt64,
            Self::Float32(_) => EnumLeafKind::Float32,
            Self::Float64(_) => EnumLeafKind::Float64,
            Self::Decimal(_) => EnumLeafKind::Decimal,
            Self::Boolean(_) => EnumLeafKind::Boolean,
            Self::Char(_) => EnumLeafKind::Char,
            Self::DateTime(_) => EnumLeafKind::DateTime,
            Self::String(_) => EnumLeafKind::String,
            Self::Enum { .. } => EnumLeafKind::Enum,
        }
    }

    /// Label of the value's type (enumeration name for enum values).
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Enum { type_name, .. } => type_name,
            other => other.kind().type_name(),
        }
    }

    /// Canonical text. `datetime_format` must already be validated,
    /// see [`crate::util::validate_datetime_format`].
    pub fn render(&self, datetime_format: &str) -> String {
        match self {
            Self::Int8(val) => val.to_string(),
            Self::Int16(val) => val.to_string(),
            Self::Int32(val) => val.to_string(),
            Self::Int64(val) => val.to_string(),
            Self::UInt8(val) => val.to_string(),
            Self::UInt16(val) => val.to_string(),
            Self::UInt32(val) => val.to_string(),
            Self::UInt64(val) => val.to_string(),
            Self::Float32(val) => val.to_string(),
            Self::Float64(val) => val.to_string(),
            Self::Decimal(val) => val.to_string(),
            Self::Boolean(val) => (if *val { C_BOOL_TRUE } else { C_BOOL_FALSE }).to_string(),
            Self::Char(val) => val.to_string(),
            Self::DateTime(val) => val.format(datetime_format).to_string(),
            Self::String(val) => val.clone(),
            Self::Enum { variant, .. } => variant.to_string(),
        }
    }

    /// Numeric view for numeric kinds; `None` otherwise.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int8(val) => Some(*val as f64),
            Self::Int16(val) => Some(*val as f64),
            Self::Int32(val) => Some(*val as f64),
            Self::Int64(val) => Some(*val as f64),
            Self::UInt8(val) => Some(*val as f64),
            Self::UInt16(val) => Some(*val as f64),
            Self::UInt32(val) => Some(*val as f64),
            Self::UInt64(val) => Some(*val as f64),
            Self::Float32(val) => Some(*val as f64),
            Self::Float64(val) => Some(*val),
            Self::Decimal(val) => Some(val.to_f64()),
            _ => None,
        }
    }

    /// Trim string values; a whitespace-only char trims to nothing.
    pub fn trimmed(self) -> Option<Self> {
        match self {
            Self::String(val) => Some(Self::String(val.trim().to_string())),
            Self::Char(val) if val.is_whitespace() => None,
            other => Some(other),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CompositeValues

/// Handle to a shared composite instance.
#[derive(Debug, Clone)]
pub struct SpecObjectRef {
    instance: Rc<dyn Any>,
    composite: SpecCompositeType,
}

impl SpecObjectRef {
    /// Wrap a shared instance; identity is the `Rc` allocation.
    pub fn new<T: Exportable>(rc: &Rc<T>) -> Self {
        let instance: Rc<dyn Any> = rc.clone();
        Self {
            instance,
            composite: SpecCompositeType::of::<T>(),
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Rc::as_ptr(&self.instance) as *const () as usize
    }

    pub fn instance(&self) -> &dyn Any {
        &*self.instance
    }

    pub fn composite(&self) -> &SpecCompositeType {
        &self.composite
    }
}

/// Materialized sequence.
#[derive(Debug, Clone)]
pub struct SpecSequenceValue {
    /// Declared element type.
    pub element: EnumTypeDesc,
    /// Identity of shared sequences; `None` for inline ones.
    pub fingerprint: Option<Fingerprint>,
    pub items: Vec<EnumValue>,
}

/// Runtime value handed to the builders.
#[derive(Debug, Clone)]
pub enum EnumValue {
    /// Unset optional, missing root, empty reference.
    Null,
    Leaf(EnumLeafValue),
    Object(SpecObjectRef),
    Sequence(SpecSequenceValue),
}

impl EnumValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Identity of shared objects and shared sequences.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        match self {
            Self::Object(obj) => Some(obj.fingerprint()),
            Self::Sequence(seq) => seq.fingerprint,
            _ => None,
        }
    }
}

/// Sequence with identity, for graphs where a list is reachable from
/// its own elements.
pub struct SharedSeq<V> {
    inner: Rc<RefCell<Vec<V>>>,
}

impl<V> SharedSeq<V> {
    pub fn new() -> Self {
        Self::from(Vec::new())
    }

    pub fn push(&self, value: V) {
        self.inner.borrow_mut().push(value);
    }

    /// Drop every element; clears reference cycles through the sequence.
    pub fn clear(&self) {
        self.inner.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().is_empty()
    }

    pub fn borrow(&self) -> Ref<'_, Vec<V>> {
        self.inner.borrow()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Rc::as_ptr(&self.inner) as *const () as usize
    }
}

impl<V> Default for SharedSeq<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for SharedSeq<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> From<Vec<V>> for SharedSeq<V> {
    fn from(values: Vec<V>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(values)),
        }
    }
}

impl<V: fmt::Debug> fmt::Debug for SharedSeq<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.inner.borrow().iter()).finish()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Conversions

/// Lowering of a Rust value into the export value model.
pub trait ToExportValue {
    /// Declared type, independent of any instance.
    fn export_type() -> EnumTypeDesc
    where
        Self: Sized;

    fn to_export_value(&self) -> EnumValue;
}

macro_rules! impl_leaf_value {
    ($($ty:ty => $kind:ident),+ $(,)?) => {
        $(
            impl ToExportValue for $ty {
                fn export_type() -> EnumTypeDesc {
                    EnumTypeDesc::Leaf(EnumLeafKind::$kind)
                }

                fn to_export_value(&self) -> EnumValue {
                    EnumValue::Leaf(EnumLeafValue::$kind(ToOwned::to_owned(self)))
                }
            }
        )+
    };
}

impl_leaf_value!(
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    SpecDecimal => Decimal,
    bool => Boolean,
    char => Char,
    NaiveDateTime => DateTime,
    String => String,
);

impl ToExportValue for &str {
    fn export_type() -> EnumTypeDesc {
        EnumTypeDesc::Leaf(EnumLeafKind::String)
    }

    fn to_export_value(&self) -> EnumValue {
        EnumValue::Leaf(EnumLeafValue::String((*self).to_string()))
    }
}

impl<Tz: TimeZone> ToExportValue for DateTime<Tz> {
    fn export_type() -> EnumTypeDesc {
        EnumTypeDesc::Leaf(EnumLeafKind::DateTime)
    }

    fn to_export_value(&self) -> EnumValue {
        EnumValue::Leaf(EnumLeafValue::DateTime(self.naive_local()))
    }
}

impl<V: ToExportValue> ToExportValue for Option<V> {
    fn export_type() -> EnumTypeDesc {
        EnumTypeDesc::Optional(Box::new(V::export_type()))
    }

    fn to_export_value(&self) -> EnumValue {
        match self {
            Some(val) => val.to_export_value(),
            None => EnumValue::Null,
        }
    }
}

impl<V: ToExportValue> ToExportValue for Vec<V> {
    fn export_type() -> EnumTypeDesc {
        EnumTypeDesc::Sequence(Box::new(V::export_type()))
    }

    fn to_export_value(&self) -> EnumValue {
        EnumValue::Sequence(SpecSequenceValue {
            element: V::export_type(),
            fingerprint: None,
            items: self.iter().map(ToExportValue::to_export_value).collect(),
        })
    }
}

impl<V: ToExportValue> ToExportValue for SharedSeq<V> {
    fn export_type() -> EnumTypeDesc {
        EnumTypeDesc::Sequence(Box::new(V::export_type()))
    }

    fn to_export_value(&self) -> EnumValue {
        EnumValue::Sequence(SpecSequenceValue {
            element: V::export_type(),
            fingerprint: Some(self.fingerprint()),
            items: self
                .inner
                .borrow()
                .iter()
                .map(ToExportValue::to_export_value)
                .collect(),
        })
    }
}

impl<T: Exportable> ToExportValue for Rc<T> {
    fn export_type() -> EnumTypeDesc {
        EnumTypeDesc::Composite(SpecCompositeType::of::<T>())
    }

    fn to_export_value(&self) -> EnumValue {
        EnumValue::Object(SpecObjectRef::new(self))
    }
}

/// Register a field-less enum as an exportable leaf.
///
/// ```
/// use dataexport_core::impl_export_enum;
///
/// #[derive(Clone, Copy)]
/// enum Status { Active, Retired }
/// impl_export_enum!(Status, "shop::Status", [Active, Retired]);
/// ```
#[macro_export]
macro_rules! impl_export_enum {
    ($name:ident, $full_name:expr, [$($variant:ident),+ $(,)?]) => {
        impl $crate::ToExportValue for $name {
            fn export_type() -> $crate::EnumTypeDesc {
                $crate::EnumTypeDesc::Enumerated($crate::SpecNamedType {
                    name: stringify!($name),
                    full_name: $full_name,
                })
            }

            fn to_export_value(&self) -> $crate::EnumValue {
                let variant = match self {
                    $($name::$variant => stringify!($variant),)+
                };
                $crate::EnumValue::Leaf($crate::EnumLeafValue::Enum {
                    type_name: stringify!($name),
                    variant,
                })
            }
        }
    };
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn decimal_display_keeps_scale_and_sign() {
        assert_eq!(SpecDecimal::new(100, 2).to_string(), "1.00");
        assert_eq!(SpecDecimal::new(-5, 1).to_string(), "-0.5");
        assert_eq!(SpecDecimal::new(7, 3).to_string(), "0.007");
        assert_eq!(SpecDecimal::new(-1234, 0).to_string(), "-1234");
    }

    #[test]
    fn decimal_parse_accepts_plain_notation_only() {
        assert_eq!("12.340".parse::<SpecDecimal>(), Ok(SpecDecimal::new(12340, 3)));
        assert_eq!("-.5".parse::<SpecDecimal>(), Ok(SpecDecimal::new(-5, 1)));
        assert_eq!("+3".parse::<SpecDecimal>(), Ok(SpecDecimal::new(3, 0)));
        assert!("1e5".parse::<SpecDecimal>().is_err());
        assert!("1.2.3".parse::<SpecDecimal>().is_err());
        assert!(".".parse::<SpecDecimal>().is_err());
        assert!("".parse::<SpecDecimal>().is_err());
    }

    #[test]
    fn leaf_render_uses_invariant_text() {
        assert_eq!(EnumLeafValue::Int32(1).render("%Y"), "1");
        assert_eq!(EnumLeafValue::Float64(1.0).render("%Y"), "1");
        assert_eq!(EnumLeafValue::Float32(0.5).render("%Y"), "0.5");
        assert_eq!(EnumLeafValue::Boolean(true).render("%Y"), "True");
        assert_eq!(EnumLeafValue::Char('a').render("%Y"), "a");

        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_opt(13, 5, 0))
            .expect("valid date");
        assert_eq!(
            EnumLeafValue::DateTime(dt).render("%d.%m.%Y %H:%M"),
            "29.02.2024 13:05"
        );
    }

    #[test]
    fn trimmed_only_touches_text() {
        assert_eq!(
            EnumLeafValue::String("  Foo  ".to_string()).trimmed(),
            Some(EnumLeafValue::String("Foo".to_string()))
        );
        assert_eq!(EnumLeafValue::Char(' ').trimmed(), None);
        assert_eq!(
            EnumLeafValue::Int64(-3).trimmed(),
            Some(EnumLeafValue::Int64(-3))
        );
    }

    #[test]
    fn optional_none_lowers_to_null() {
        let value: Option<i32> = None;
        assert!(value.to_export_value().is_null());
        assert_eq!(
            <Option<i32>>::export_type(),
            EnumTypeDesc::Optional(Box::new(EnumTypeDesc::Leaf(EnumLeafKind::Int32)))
        );
    }

    #[test]
    fn shared_seq_clones_keep_identity() {
        let seq = SharedSeq::from(vec![1u8, 2]);
        let seq_clone = seq.clone();
        seq_clone.push(3);

        assert_eq!(seq.len(), 3);
        assert_eq!(seq.fingerprint(), seq_clone.fingerprint());
        assert_eq!(seq.to_export_value().fingerprint(), Some(seq.fingerprint()));
        assert_eq!(vec![1u8].to_export_value().fingerprint(), None);
    }
}
