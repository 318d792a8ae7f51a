//! Column kind catalog
//!
//! Each supported column kind has one immutable [`KindDescriptor`] holding its
//! filter-operator table and its aggregation set. Columns carry a
//! [`ColumnKind`] (the tag plus any parameters such as select options or a
//! link target) and reference the shared descriptor through
//! [`ColumnKind::descriptor`].

use crate::aggregate::AggregationOperator;
use crate::error::SchemaError;
use crate::filter::{FilterOperator, OperandType};
use crate::shape::ValueShape;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Table every attachment column links to.
pub const ATTACHMENT_TABLE: &str = "attachmentTable";

/// Discriminator for the supported column kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KindTag {
    Text,
    Number,
    Date,
    Checkbox,
    SingleSelect,
    Link,
    Attachment,
    AutoNumber,
    AutoDate,
}

impl KindTag {
    pub const ALL: [KindTag; 9] = [
        KindTag::Text,
        KindTag::Number,
        KindTag::Date,
        KindTag::Checkbox,
        KindTag::SingleSelect,
        KindTag::Link,
        KindTag::Attachment,
        KindTag::AutoNumber,
        KindTag::AutoDate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KindTag::Text => "text",
            KindTag::Number => "number",
            KindTag::Date => "date",
            KindTag::Checkbox => "checkbox",
            KindTag::SingleSelect => "singleSelect",
            KindTag::Link => "link",
            KindTag::Attachment => "attachment",
            KindTag::AutoNumber => "autoNumber",
            KindTag::AutoDate => "autoDate",
        }
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KindTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KindTag::ALL
            .iter()
            .copied()
            .find(|tag| tag.as_str() == s)
            .ok_or_else(|| format!("Unknown column kind: {}", s))
    }
}

/// Capability descriptor shared by every column of one kind.
#[derive(Debug)]
pub struct KindDescriptor {
    pub tag: KindTag,
    pub filters: &'static [(FilterOperator, OperandType)],
    pub aggregations: &'static [AggregationOperator],
    /// Auto-generated kinds are never insertable or updatable.
    pub auto_generated: bool,
}

impl KindDescriptor {
    /// Operand expected by `operator`, or `None` if the operator is not legal.
    pub fn operand_for(&self, operator: FilterOperator) -> Option<OperandType> {
        self.filters
            .iter()
            .find(|(op, _)| *op == operator)
            .map(|(_, operand)| *operand)
    }
}

// ============================================================================
// OPERATOR TABLES
// ============================================================================

use AggregationOperator as Agg;
use FilterOperator as Op;
use OperandType as Operand;

const TEXT_FILTERS: &[(FilterOperator, OperandType)] = &[
    (Op::Eq, Operand::Text),
    (Op::Ne, Operand::Text),
    (Op::CaseEqual, Operand::Text),
    (Op::HasAnyOf, Operand::TextList),
    (Op::Contains, Operand::Text),
    (Op::StartsWith, Operand::Text),
    (Op::EndsWith, Operand::Text),
    (Op::DoesNotContain, Operand::Text),
    (Op::IsEmpty, Operand::None),
    (Op::IsNotEmpty, Operand::None),
];

const NUMBER_FILTERS: &[(FilterOperator, OperandType)] = &[
    (Op::Eq, Operand::Number),
    (Op::Ne, Operand::Number),
    (Op::Gt, Operand::Number),
    (Op::Gte, Operand::Number),
    (Op::Lt, Operand::Number),
    (Op::Lte, Operand::Number),
    (Op::HasAnyOf, Operand::NumberList),
    (Op::HasNoneOf, Operand::NumberList),
    (Op::IsEmpty, Operand::None),
    (Op::IsNotEmpty, Operand::None),
];

const DATE_FILTERS: &[(FilterOperator, OperandType)] = &[
    (Op::Eq, Operand::Date),
    (Op::Ne, Operand::Date),
    (Op::Lt, Operand::Date),
    (Op::Gt, Operand::Date),
    (Op::Lte, Operand::Date),
    (Op::Gte, Operand::Date),
    (Op::IsWithin, Operand::DateWithin),
    (Op::IsEmpty, Operand::None),
    (Op::IsNotEmpty, Operand::None),
];

const CHECKBOX_FILTERS: &[(FilterOperator, OperandType)] = &[(Op::Eq, Operand::Flag)];

const SELECT_FILTERS: &[(FilterOperator, OperandType)] = &[
    (Op::HasAnyOf, Operand::SelectOptionList),
    (Op::HasAllOf, Operand::SelectOptionList),
    (Op::IsExactly, Operand::SelectOptionList),
    (Op::Eq, Operand::SelectOption),
    (Op::HasNoneOf, Operand::SelectOptionList),
    (Op::Contains, Operand::Text),
    (Op::DoesNotContain, Operand::Text),
    (Op::IsEmpty, Operand::None),
    (Op::IsNotEmpty, Operand::None),
];

const LINK_FILTERS: &[(FilterOperator, OperandType)] = &[
    (Op::HasAnyOf, Operand::IdList),
    (Op::HasAllOf, Operand::IdList),
    (Op::IsExactly, Operand::IdList),
    (Op::Eq, Operand::Id),
    (Op::HasNoneOf, Operand::IdList),
    (Op::Contains, Operand::Text),
    (Op::DoesNotContain, Operand::Text),
    (Op::IsEmpty, Operand::None),
    (Op::IsNotEmpty, Operand::None),
];

const NUMBER_AGGREGATIONS: &[AggregationOperator] = &[
    Agg::Sum,
    Agg::Average,
    Agg::Median,
    Agg::Min,
    Agg::Max,
    Agg::Range,
    Agg::StandardDeviation,
    Agg::Histogram,
    Agg::Empty,
    Agg::Filled,
    Agg::Unique,
    Agg::PercentEmpty,
    Agg::PercentFilled,
    Agg::PercentUnique,
];

const DATE_AGGREGATIONS: &[AggregationOperator] = &[
    Agg::Empty,
    Agg::Filled,
    Agg::Unique,
    Agg::PercentEmpty,
    Agg::PercentFilled,
    Agg::PercentUnique,
    Agg::Min,
    Agg::Max,
    Agg::DaysRange,
    Agg::MonthRange,
];

const LINK_AGGREGATIONS: &[AggregationOperator] = &[
    Agg::Empty,
    Agg::Filled,
    Agg::PercentEmpty,
    Agg::PercentFilled,
];

static TEXT: KindDescriptor = KindDescriptor {
    tag: KindTag::Text,
    filters: TEXT_FILTERS,
    aggregations: &[],
    auto_generated: false,
};

static NUMBER: KindDescriptor = KindDescriptor {
    tag: KindTag::Number,
    filters: NUMBER_FILTERS,
    aggregations: NUMBER_AGGREGATIONS,
    auto_generated: false,
};

static DATE: KindDescriptor = KindDescriptor {
    tag: KindTag::Date,
    filters: DATE_FILTERS,
    aggregations: DATE_AGGREGATIONS,
    auto_generated: false,
};

static CHECKBOX: KindDescriptor = KindDescriptor {
    tag: KindTag::Checkbox,
    filters: CHECKBOX_FILTERS,
    aggregations: &[],
    auto_generated: false,
};

static SINGLE_SELECT: KindDescriptor = KindDescriptor {
    tag: KindTag::SingleSelect,
    filters: SELECT_FILTERS,
    aggregations: &[],
    auto_generated: false,
};

static LINK: KindDescriptor = KindDescriptor {
    tag: KindTag::Link,
    filters: LINK_FILTERS,
    aggregations: LINK_AGGREGATIONS,
    auto_generated: false,
};

static ATTACHMENT: KindDescriptor = KindDescriptor {
    tag: KindTag::Attachment,
    filters: LINK_FILTERS,
    aggregations: LINK_AGGREGATIONS,
    auto_generated: false,
};

static AUTO_NUMBER: KindDescriptor = KindDescriptor {
    tag: KindTag::AutoNumber,
    filters: NUMBER_FILTERS,
    aggregations: NUMBER_AGGREGATIONS,
    auto_generated: true,
};

static AUTO_DATE: KindDescriptor = KindDescriptor {
    tag: KindTag::AutoDate,
    filters: DATE_FILTERS,
    aggregations: DATE_AGGREGATIONS,
    auto_generated: true,
};

/// Descriptor for a kind tag.
pub fn descriptor(tag: KindTag) -> &'static KindDescriptor {
    match tag {
        KindTag::Text => &TEXT,
        KindTag::Number => &NUMBER,
        KindTag::Date => &DATE,
        KindTag::Checkbox => &CHECKBOX,
        KindTag::SingleSelect => &SINGLE_SELECT,
        KindTag::Link => &LINK,
        KindTag::Attachment => &ATTACHMENT,
        KindTag::AutoNumber => &AUTO_NUMBER,
        KindTag::AutoDate => &AUTO_DATE,
    }
}

// ============================================================================
// COLUMN KIND
// ============================================================================

/// A column's kind together with its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ColumnKind {
    Text,
    Number,
    Date,
    Checkbox,
    SingleSelect {
        options: Vec<String>,
    },
    Link {
        #[serde(rename = "linkedTo")]
        linked_to: String,
    },
    Attachment,
    AutoNumber,
    AutoDate,
}

impl ColumnKind {
    pub fn tag(&self) -> KindTag {
        match self {
            ColumnKind::Text => KindTag::Text,
            ColumnKind::Number => KindTag::Number,
            ColumnKind::Date => KindTag::Date,
            ColumnKind::Checkbox => KindTag::Checkbox,
            ColumnKind::SingleSelect { .. } => KindTag::SingleSelect,
            ColumnKind::Link { .. } => KindTag::Link,
            ColumnKind::Attachment => KindTag::Attachment,
            ColumnKind::AutoNumber => KindTag::AutoNumber,
            ColumnKind::AutoDate => KindTag::AutoDate,
        }
    }

    pub fn descriptor(&self) -> &'static KindDescriptor {
        descriptor(self.tag())
    }

    pub fn is_auto_generated(&self) -> bool {
        self.descriptor().auto_generated
    }

    /// Table this column links to, for link and attachment columns.
    pub fn linked_to(&self) -> Option<&str> {
        match self {
            ColumnKind::Link { linked_to } => Some(linked_to),
            ColumnKind::Attachment => Some(ATTACHMENT_TABLE),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&[String]> {
        match self {
            ColumnKind::SingleSelect { options } => Some(options),
            _ => None,
        }
    }

    /// Shape returned when reading.
    pub fn raw_shape(&self) -> ValueShape {
        match self {
            ColumnKind::Text => ValueShape::Text,
            ColumnKind::Number | ColumnKind::AutoNumber => ValueShape::Number,
            ColumnKind::Date | ColumnKind::AutoDate => ValueShape::Date,
            ColumnKind::Checkbox => ValueShape::Boolean,
            ColumnKind::SingleSelect { options } => ValueShape::Options {
                options: options.clone(),
            },
            ColumnKind::Link { .. } => ValueShape::LinkedRecords,
            ColumnKind::Attachment => ValueShape::Attachments,
        }
    }

    /// Shape accepted on insert; `None` for kinds that cannot be inserted.
    pub fn insert_shape(&self) -> Option<ValueShape> {
        match self {
            ColumnKind::AutoNumber | ColumnKind::AutoDate => None,
            ColumnKind::Link { .. } => Some(ValueShape::IdList),
            ColumnKind::Attachment => Some(ValueShape::AttachmentsOrIds),
            other => Some(other.raw_shape()),
        }
    }

    /// Shape accepted on update; `None` for kinds that cannot be updated.
    pub fn update_shape(&self) -> Option<ValueShape> {
        match self {
            ColumnKind::AutoNumber | ColumnKind::AutoDate => None,
            ColumnKind::Link { .. } => Some(ValueShape::IdListOrDelta),
            ColumnKind::Attachment => Some(ValueShape::AttachmentsIdsOrDelta),
            other => Some(other.raw_shape()),
        }
    }
}

// ============================================================================
// DECLARATIONS
// ============================================================================

/// Loosely-typed column declaration, as written in code or a schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ColumnDeclaration {
    pub name: String,
    pub kind: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_to: Option<String>,
}

impl ColumnDeclaration {
    pub fn new(name: impl Into<String>, kind: KindTag) -> Self {
        Self {
            name: name.into(),
            kind: kind.as_str().to_string(),
            required: false,
            options: Vec::new(),
            linked_to: None,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::Text)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::Number)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::Date)
    }

    pub fn checkbox(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::Checkbox)
    }

    pub fn auto_number(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::AutoNumber)
    }

    pub fn auto_date(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::AutoDate)
    }

    pub fn attachment(name: impl Into<String>) -> Self {
        Self::new(name, KindTag::Attachment)
    }

    pub fn single_select(name: impl Into<String>, options: &[&str]) -> Self {
        Self {
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Self::new(name, KindTag::SingleSelect)
        }
    }

    pub fn link(name: impl Into<String>, linked_to: impl Into<String>) -> Self {
        Self {
            linked_to: Some(linked_to.into()),
            ..Self::new(name, KindTag::Link)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Resolve a declaration to its column kind.
///
/// `table` is only used for error reporting.
pub fn kind_of(table: &str, decl: &ColumnDeclaration) -> Result<ColumnKind, SchemaError> {
    let tag = decl
        .kind
        .parse::<KindTag>()
        .map_err(|_| SchemaError::UnknownKind {
            table: table.to_string(),
            column: decl.name.clone(),
            kind: decl.kind.clone(),
        })?;

    let kind = match tag {
        KindTag::Text => ColumnKind::Text,
        KindTag::Number => ColumnKind::Number,
        KindTag::Date => ColumnKind::Date,
        KindTag::Checkbox => ColumnKind::Checkbox,
        KindTag::Attachment => ColumnKind::Attachment,
        KindTag::AutoNumber => ColumnKind::AutoNumber,
        KindTag::AutoDate => ColumnKind::AutoDate,
        KindTag::SingleSelect => {
            if decl.options.is_empty() {
                return Err(SchemaError::EmptyOptions {
                    table: table.to_string(),
                    column: decl.name.clone(),
                });
            }
            for (i, option) in decl.options.iter().enumerate() {
                if decl.options[..i].contains(option) {
                    return Err(SchemaError::DuplicateOption {
                        table: table.to_string(),
                        column: decl.name.clone(),
                        option: option.clone(),
                    });
                }
            }
            ColumnKind::SingleSelect {
                options: decl.options.clone(),
            }
        }
        KindTag::Link => {
            let linked_to = decl
                .linked_to
                .clone()
                .ok_or_else(|| SchemaError::MissingKindParameter {
                    table: table.to_string(),
                    column: decl.name.clone(),
                    kind: tag,
                    parameter: "linkedTo",
                })?;
            ColumnKind::Link { linked_to }
        }
    };

    if decl.required && kind.is_auto_generated() {
        return Err(SchemaError::RequiredAutoGenerated {
            table: table.to_string(),
            column: decl.name.clone(),
        });
    }

    Ok(kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_shared() {
        let a = ColumnKind::Number;
        let b = ColumnKind::Number;
        assert!(std::ptr::eq(a.descriptor(), b.descriptor()));
        assert!(std::ptr::eq(
            ColumnKind::Link { linked_to: "x".to_string() }.descriptor(),
            ColumnKind::Link { linked_to: "y".to_string() }.descriptor()
        ));
    }

    #[test]
    fn test_link_shapes_differ_per_operation() {
        let kind = ColumnKind::Link {
            linked_to: "goals".to_string(),
        };
        assert_eq!(kind.raw_shape(), ValueShape::LinkedRecords);
        assert_eq!(kind.insert_shape(), Some(ValueShape::IdList));
        assert_eq!(kind.update_shape(), Some(ValueShape::IdListOrDelta));
    }

    #[test]
    fn test_auto_generated_kinds_are_not_writable() {
        for kind in [ColumnKind::AutoNumber, ColumnKind::AutoDate] {
            assert!(kind.is_auto_generated());
            assert_eq!(kind.insert_shape(), None);
            assert_eq!(kind.update_shape(), None);
        }
    }

    #[test]
    fn test_attachment_links_to_internal_table() {
        assert_eq!(ColumnKind::Attachment.linked_to(), Some(ATTACHMENT_TABLE));
    }

    #[test]
    fn test_kind_of_rejects_unknown_kind() {
        let decl = ColumnDeclaration {
            name: "mood".to_string(),
            kind: "emoji".to_string(),
            required: false,
            options: vec![],
            linked_to: None,
        };
        assert!(matches!(
            kind_of("journal", &decl),
            Err(SchemaError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_kind_of_checks_parameters() {
        assert!(matches!(
            kind_of("t", &ColumnDeclaration::single_select("s", &[])),
            Err(SchemaError::EmptyOptions { .. })
        ));
        assert!(matches!(
            kind_of("t", &ColumnDeclaration::single_select("s", &["a", "a"])),
            Err(SchemaError::DuplicateOption { .. })
        ));
        assert!(matches!(
            kind_of("t", &ColumnDeclaration::new("l", KindTag::Link)),
            Err(SchemaError::MissingKindParameter { parameter: "linkedTo", .. })
        ));
        assert!(matches!(
            kind_of("t", &ColumnDeclaration::auto_date("createdAt").required()),
            Err(SchemaError::RequiredAutoGenerated { .. })
        ));
    }

    #[test]
    fn test_every_kind_tag_parses() {
        for tag in KindTag::ALL {
            assert_eq!(tag.as_str().parse::<KindTag>(), Ok(tag));
        }
    }
}
