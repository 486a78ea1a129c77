//! Type classifier: leaf vs composite vs sequence.

use crate::spec::{EnumLeafKind, EnumTypeDesc, SpecCompositeType};

/// Classification of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumTypeClass {
    /// Exported as one scalar.
    Leaf {
        kind: EnumLeafKind,
        /// Declared through at least one optional wrapper.
        if_optional: bool,
    },
    /// Exported by decomposition into members.
    Composite(SpecCompositeType),
    /// Exported element by element.
    Sequence,
}

impl EnumTypeClass {
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    pub fn leaf_kind(&self) -> Option<EnumLeafKind> {
        match self {
            Self::Leaf { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// Classify `desc`. Pure function of the type; optional wrappers are
/// unwrapped first, enumerations are always leaves and sequences are
/// never leaves.
pub fn classify_type(desc: &EnumTypeDesc) -> EnumTypeClass {
    let if_optional = matches!(desc, EnumTypeDesc::Optional(_));
    match desc.unwrap_optional() {
        EnumTypeDesc::Leaf(kind) => EnumTypeClass::Leaf {
            kind: *kind,
            if_optional,
        },
        EnumTypeDesc::Enumerated(_) => EnumTypeClass::Leaf {
            kind: EnumLeafKind::Enum,
            if_optional,
        },
        EnumTypeDesc::Composite(composite) => EnumTypeClass::Composite(*composite),
        EnumTypeDesc::Sequence(_) => EnumTypeClass::Sequence,
        // unwrap_optional never returns a wrapper
        EnumTypeDesc::Optional(inner) => classify_type(inner),
    }
}

/// `true` when `desc` is exported as a single scalar.
pub fn is_leaf(desc: &EnumTypeDesc) -> bool {
    classify_type(desc).is_leaf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Exportable, SpecSchema};
    use crate::spec::SpecNamedType;

    struct Record;

    impl Exportable for Record {
        const TYPE_NAME: &'static str = "Record";
        const TYPE_FULL_NAME: &'static str = "tests::Record";

        fn schema() -> SpecSchema {
            SpecSchema::builder::<Self>().build()
        }
    }

    #[test]
    fn every_leaf_kind_is_leaf_bare_and_optional() {
        for kind in EnumLeafKind::ALL {
            let bare = EnumTypeDesc::Leaf(kind);
            let optional = EnumTypeDesc::Optional(Box::new(bare.clone()));
            assert_eq!(
                classify_type(&bare),
                EnumTypeClass::Leaf {
                    kind,
                    if_optional: false
                }
            );
            assert_eq!(
                classify_type(&optional),
                EnumTypeClass::Leaf {
                    kind,
                    if_optional: true
                }
            );
        }
    }

    #[test]
    fn enumerations_are_leaves() {
        let desc = EnumTypeDesc::Enumerated(SpecNamedType {
            name: "Status",
            full_name: "tests::Status",
        });
        assert_eq!(classify_type(&desc).leaf_kind(), Some(EnumLeafKind::Enum));
    }

    #[test]
    fn records_and_sequences_are_not_leaves() {
        let record = EnumTypeDesc::Composite(SpecCompositeType::of::<Record>());
        let seq_of_leaves = EnumTypeDesc::Sequence(Box::new(EnumTypeDesc::Leaf(
            EnumLeafKind::Int32,
        )));

        assert!(matches!(
            classify_type(&record),
            EnumTypeClass::Composite(c) if c.full_name == "tests::Record"
        ));
        assert!(!is_leaf(&EnumTypeDesc::Optional(Box::new(record))));
        assert_eq!(classify_type(&seq_of_leaves), EnumTypeClass::Sequence);
    }
}
