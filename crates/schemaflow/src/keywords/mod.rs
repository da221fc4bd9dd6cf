pub(crate) mod additional_items;
pub(crate) mod additional_properties;
pub(crate) mod all_of;
pub(crate) mod any_of;
pub(crate) mod boolean;
pub(crate) mod const_;
pub(crate) mod contains;
pub(crate) mod content;
pub(crate) mod custom;
pub(crate) mod dependencies;
pub(crate) mod enum_;
pub(crate) mod format;
pub(crate) mod helpers;
pub(crate) mod if_;
pub(crate) mod items;
pub(crate) mod limits;
pub(crate) mod metadata;
pub(crate) mod multiple_of;
pub(crate) mod not;
pub(crate) mod one_of;
pub(crate) mod pattern;
pub(crate) mod pattern_properties;
pub(crate) mod prefix_items;
pub(crate) mod properties;
pub(crate) mod property_names;
pub(crate) mod ref_;
pub(crate) mod required;
pub(crate) mod type_;
pub(crate) mod unevaluated_items;
pub(crate) mod unevaluated_properties;
pub(crate) mod unique_items;
pub(crate) mod unrecognized;

use core::fmt;

use referencing::{Draft, Vocabulary};
use serde_json::{Map, Value};

use crate::{compiler, error::SchemaError, graph::BoxedConstraint};

pub(crate) type CompilationResult = Result<BoxedConstraint, SchemaError>;

/// Deserialize a keyword value into its compiled constraint.
///
/// `None` means the keyword produces no constraint here (e.g. `then` without
/// an adjacent `if`).
pub(crate) type CompileFunc =
    fn(&compiler::Context<'_>, &Map<String, Value>, &Value) -> Option<CompilationResult>;

/// The name a constraint reports its annotations and errors under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Keyword {
    Builtin(BuiltinKeyword),
    Custom(Box<str>),
    /// Failures of the schema itself, e.g. the `false` schema. Serialized
    /// under the empty key.
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKeyword {
    Ref,
    RecursiveRef,
    DynamicRef,
    AdditionalItems,
    AdditionalProperties,
    AllOf,
    AnyOf,
    Const,
    Contains,
    ContentEncoding,
    ContentMediaType,
    ContentSchema,
    Default,
    Dependencies,
    DependentRequired,
    DependentSchemas,
    Deprecated,
    Description,
    Else,
    Enum,
    Examples,
    ExclusiveMaximum,
    ExclusiveMinimum,
    Format,
    If,
    Items,
    MaxContains,
    MaxItems,
    MaxLength,
    MaxProperties,
    Maximum,
    MinContains,
    MinItems,
    MinLength,
    MinProperties,
    Minimum,
    MultipleOf,
    Not,
    OneOf,
    Pattern,
    PatternProperties,
    PrefixItems,
    Properties,
    PropertyNames,
    ReadOnly,
    Required,
    Then,
    Title,
    Type,
    UnevaluatedItems,
    UnevaluatedProperties,
    UniqueItems,
    WriteOnly,
}

impl BuiltinKeyword {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ref => "$ref",
            Self::RecursiveRef => "$recursiveRef",
            Self::DynamicRef => "$dynamicRef",
            Self::AdditionalItems => "additionalItems",
            Self::AdditionalProperties => "additionalProperties",
            Self::AllOf => "allOf",
            Self::AnyOf => "anyOf",
            Self::Const => "const",
            Self::Contains => "contains",
            Self::ContentEncoding => "contentEncoding",
            Self::ContentMediaType => "contentMediaType",
            Self::ContentSchema => "contentSchema",
            Self::Default => "default",
            Self::Dependencies => "dependencies",
            Self::DependentRequired => "dependentRequired",
            Self::DependentSchemas => "dependentSchemas",
            Self::Deprecated => "deprecated",
            Self::Description => "description",
            Self::Else => "else",
            Self::Enum => "enum",
            Self::Examples => "examples",
            Self::ExclusiveMaximum => "exclusiveMaximum",
            Self::ExclusiveMinimum => "exclusiveMinimum",
            Self::Format => "format",
            Self::If => "if",
            Self::Items => "items",
            Self::MaxContains => "maxContains",
            Self::MaxItems => "maxItems",
            Self::MaxLength => "maxLength",
            Self::MaxProperties => "maxProperties",
            Self::Maximum => "maximum",
            Self::MinContains => "minContains",
            Self::MinItems => "minItems",
            Self::MinLength => "minLength",
            Self::MinProperties => "minProperties",
            Self::Minimum => "minimum",
            Self::MultipleOf => "multipleOf",
            Self::Not => "not",
            Self::OneOf => "oneOf",
            Self::Pattern => "pattern",
            Self::PatternProperties => "patternProperties",
            Self::PrefixItems => "prefixItems",
            Self::Properties => "properties",
            Self::PropertyNames => "propertyNames",
            Self::ReadOnly => "readOnly",
            Self::Required => "required",
            Self::Then => "then",
            Self::Title => "title",
            Self::Type => "type",
            Self::UnevaluatedItems => "unevaluatedItems",
            Self::UnevaluatedProperties => "unevaluatedProperties",
            Self::UniqueItems => "uniqueItems",
            Self::WriteOnly => "writeOnly",
        }
    }
}

impl Keyword {
    pub(crate) fn custom(name: impl Into<String>) -> Self {
        Keyword::Custom(name.into().into_boxed_str())
    }
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Builtin(builtin) => builtin.as_str(),
            Self::Custom(name) => name,
            Self::Schema => "",
        }
    }
}

impl From<BuiltinKeyword> for Keyword {
    fn from(value: BuiltinKeyword) -> Self {
        Keyword::Builtin(value)
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution priority of a keyword within its schema. Lower runs first, and
/// source order breaks ties. The ordering encodes every sibling dependency:
/// `items` after `prefixItems`, `additionalProperties` after `properties` and
/// `patternProperties`, `then`/`else` after `if`, the `unevaluated` pair
/// after every other applicator.
pub(crate) fn priority(keyword: &str) -> i32 {
    match keyword {
        "$ref" | "$recursiveRef" | "$dynamicRef" => -10,
        "properties" | "prefixItems" | "propertyNames" => 10,
        "patternProperties" => 11,
        "additionalProperties" | "items" => 12,
        "additionalItems" => 13,
        "contains" => 14,
        "allOf" | "anyOf" | "oneOf" | "not" | "dependencies" | "dependentSchemas" => 20,
        "if" => 30,
        "then" => 31,
        "else" => 32,
        "unevaluatedItems" | "unevaluatedProperties" => 100,
        _ => 0,
    }
}

/// Look up the active compile function for a keyword under the context's
/// draft and vocabularies.
pub(crate) fn get_for_draft(
    ctx: &compiler::Context<'_>,
    keyword: &str,
) -> Option<(Keyword, CompileFunc)> {
    match (ctx.draft(), keyword) {
        // Reference keywords
        (_, "$ref") => Some((BuiltinKeyword::Ref.into(), ref_::compile_ref)),
        (Draft::Draft201909, "$recursiveRef") => Some((
            BuiltinKeyword::RecursiveRef.into(),
            ref_::compile_recursive_ref,
        )),
        (Draft::Draft202012 | Draft::DraftNext, "$dynamicRef") => {
            Some((BuiltinKeyword::DynamicRef.into(), ref_::compile_dynamic_ref))
        }
        // Applicators
        (Draft::Draft6 | Draft::Draft7 | Draft::Draft201909, "additionalItems")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((
                BuiltinKeyword::AdditionalItems.into(),
                additional_items::compile,
            ))
        }
        (_, "additionalProperties") if ctx.has_vocabulary(&Vocabulary::Applicator) => Some((
            BuiltinKeyword::AdditionalProperties.into(),
            additional_properties::compile,
        )),
        (_, "allOf") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::AllOf.into(), all_of::compile))
        }
        (_, "anyOf") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::AnyOf.into(), any_of::compile))
        }
        (_, "oneOf") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::OneOf.into(), one_of::compile))
        }
        (_, "not") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::Not.into(), not::compile))
        }
        (_, "contains") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::Contains.into(), contains::compile))
        }
        (Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext, "if")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((BuiltinKeyword::If.into(), if_::compile_if))
        }
        (Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext, "then")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((BuiltinKeyword::Then.into(), if_::compile_then))
        }
        (Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext, "else")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((BuiltinKeyword::Else.into(), if_::compile_else))
        }
        (Draft::Draft6 | Draft::Draft7, "dependencies") => {
            Some((BuiltinKeyword::Dependencies.into(), dependencies::compile))
        }
        (
            Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "dependentRequired",
        ) if ctx.has_vocabulary(&Vocabulary::Validation) => Some((
            BuiltinKeyword::DependentRequired.into(),
            dependencies::compile_dependent_required,
        )),
        (
            Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "dependentSchemas",
        ) if ctx.has_vocabulary(&Vocabulary::Applicator) => Some((
            BuiltinKeyword::DependentSchemas.into(),
            dependencies::compile_dependent_schemas,
        )),
        (_, "items") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::Items.into(), items::compile))
        }
        (Draft::Draft202012 | Draft::DraftNext, "prefixItems")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((BuiltinKeyword::PrefixItems.into(), prefix_items::compile))
        }
        (_, "properties") if ctx.has_vocabulary(&Vocabulary::Applicator) => {
            Some((BuiltinKeyword::Properties.into(), properties::compile))
        }
        (_, "patternProperties") if ctx.has_vocabulary(&Vocabulary::Applicator) => Some((
            BuiltinKeyword::PatternProperties.into(),
            pattern_properties::compile,
        )),
        (_, "propertyNames") if ctx.has_vocabulary(&Vocabulary::Applicator) => Some((
            BuiltinKeyword::PropertyNames.into(),
            property_names::compile,
        )),
        (Draft::Draft201909, "unevaluatedItems")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((
                BuiltinKeyword::UnevaluatedItems.into(),
                unevaluated_items::compile,
            ))
        }
        (Draft::Draft202012 | Draft::DraftNext, "unevaluatedItems")
            if ctx.has_vocabulary(&Vocabulary::Unevaluated) =>
        {
            Some((
                BuiltinKeyword::UnevaluatedItems.into(),
                unevaluated_items::compile,
            ))
        }
        (Draft::Draft201909, "unevaluatedProperties")
            if ctx.has_vocabulary(&Vocabulary::Applicator) =>
        {
            Some((
                BuiltinKeyword::UnevaluatedProperties.into(),
                unevaluated_properties::compile,
            ))
        }
        (Draft::Draft202012 | Draft::DraftNext, "unevaluatedProperties")
            if ctx.has_vocabulary(&Vocabulary::Unevaluated) =>
        {
            Some((
                BuiltinKeyword::UnevaluatedProperties.into(),
                unevaluated_properties::compile,
            ))
        }
        // Validation
        (_, "const") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Const.into(), const_::compile))
        }
        (_, "enum") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Enum.into(), enum_::compile))
        }
        (_, "maximum") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Maximum.into(), limits::compile_maximum))
        }
        (_, "minimum") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Minimum.into(), limits::compile_minimum))
        }
        (_, "exclusiveMaximum") if ctx.has_vocabulary(&Vocabulary::Validation) => Some((
            BuiltinKeyword::ExclusiveMaximum.into(),
            limits::compile_exclusive_maximum,
        )),
        (_, "exclusiveMinimum") if ctx.has_vocabulary(&Vocabulary::Validation) => Some((
            BuiltinKeyword::ExclusiveMinimum.into(),
            limits::compile_exclusive_minimum,
        )),
        (_, "multipleOf") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::MultipleOf.into(), multiple_of::compile))
        }
        (_, "maxLength") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::MaxLength.into(), limits::compile_max_length))
        }
        (_, "minLength") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::MinLength.into(), limits::compile_min_length))
        }
        (_, "maxItems") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::MaxItems.into(), limits::compile_max_items))
        }
        (_, "minItems") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::MinItems.into(), limits::compile_min_items))
        }
        (_, "maxProperties") if ctx.has_vocabulary(&Vocabulary::Validation) => Some((
            BuiltinKeyword::MaxProperties.into(),
            limits::compile_max_properties,
        )),
        (_, "minProperties") if ctx.has_vocabulary(&Vocabulary::Validation) => Some((
            BuiltinKeyword::MinProperties.into(),
            limits::compile_min_properties,
        )),
        (
            Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "maxContains" | "minContains",
        ) if ctx.has_vocabulary(&Vocabulary::Validation) => {
            // Compiled as part of the sibling `contains`
            Some((BuiltinKeyword::MaxContains.into(), contains::compile_bound))
        }
        (_, "pattern") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Pattern.into(), pattern::compile))
        }
        (_, "required") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Required.into(), required::compile))
        }
        (_, "type") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::Type.into(), type_::compile))
        }
        (_, "uniqueItems") if ctx.has_vocabulary(&Vocabulary::Validation) => {
            Some((BuiltinKeyword::UniqueItems.into(), unique_items::compile))
        }
        // Format
        (Draft::Draft201909, "format") if ctx.has_vocabulary(&Vocabulary::Format) => {
            Some((BuiltinKeyword::Format.into(), format::compile))
        }
        (Draft::Draft202012 | Draft::DraftNext, "format")
            if ctx.has_vocabulary(&Vocabulary::FormatAnnotation)
                || ctx.has_vocabulary(&Vocabulary::Format) =>
        {
            Some((BuiltinKeyword::Format.into(), format::compile))
        }
        (Draft::Draft6 | Draft::Draft7, "format") => {
            Some((BuiltinKeyword::Format.into(), format::compile))
        }
        // Content
        (
            Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "contentEncoding",
        ) if ctx.has_vocabulary(&Vocabulary::Content) => Some((
            BuiltinKeyword::ContentEncoding.into(),
            content::compile_encoding,
        )),
        (
            Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "contentMediaType",
        ) if ctx.has_vocabulary(&Vocabulary::Content) => Some((
            BuiltinKeyword::ContentMediaType.into(),
            content::compile_media_type,
        )),
        (Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext, "contentSchema")
            if ctx.has_vocabulary(&Vocabulary::Content) =>
        {
            Some((BuiltinKeyword::ContentSchema.into(), content::compile_schema))
        }
        // Meta-data annotations
        (_, "title") if ctx.has_vocabulary(&Vocabulary::Metadata) => {
            Some((BuiltinKeyword::Title.into(), metadata::compile_title))
        }
        (_, "description") if ctx.has_vocabulary(&Vocabulary::Metadata) => Some((
            BuiltinKeyword::Description.into(),
            metadata::compile_description,
        )),
        (_, "default") if ctx.has_vocabulary(&Vocabulary::Metadata) => {
            Some((BuiltinKeyword::Default.into(), metadata::compile_default))
        }
        (_, "examples") if ctx.has_vocabulary(&Vocabulary::Metadata) => {
            Some((BuiltinKeyword::Examples.into(), metadata::compile_examples))
        }
        (
            Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "readOnly",
        ) if ctx.has_vocabulary(&Vocabulary::Metadata) => {
            Some((BuiltinKeyword::ReadOnly.into(), metadata::compile_read_only))
        }
        (
            Draft::Draft7 | Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext,
            "writeOnly",
        ) if ctx.has_vocabulary(&Vocabulary::Metadata) => {
            Some((BuiltinKeyword::WriteOnly.into(), metadata::compile_write_only))
        }
        (Draft::Draft201909 | Draft::Draft202012 | Draft::DraftNext, "deprecated")
            if ctx.has_vocabulary(&Vocabulary::Metadata) =>
        {
            Some((BuiltinKeyword::Deprecated.into(), metadata::compile_deprecated))
        }
        // Unknown or inactive under this dialect
        _ => None,
    }
}
