//! scoped link property values.
//!
//! a link property may carry, next to its default value, an ordered list of
//! overrides each applying under a (category, timespan) scope. terminology for
//! classifying a stored scope against a query scope:
//!
//! - `matching`: a scope that could be applied for the query. includes the
//!   default scopes and scopes wholly containing the query timespan.
//! - `overlapping`: a scope that fully or partially overlaps the query.
//!   includes defaults, all matching scopes, and scopes with at least
//!   `min_overlap_minutes` of timespan overlap.
//! - `conflicting`: overlapping but not matching. defaults never conflict.
//! - `independent`: not overlapping.

mod ops;

pub use ops::{
    conflicting_scopes, expand_scoped_property_sets, has_conflicting_scopes, matching_scopes,
    merge_scoped_values, overlapping_scopes, resolve_scoped_value,
};

use serde::{Deserialize, Serialize};

use crate::time::{Timespan, DEFAULT_TIMESPAN};
use crate::value::PropertyValue;

/// the category denoting "applies to any category".
pub const DEFAULT_CATEGORY: &str = "any";

/// minimum minutes of timespan overlap for a scope to count as overlapping.
pub const DEFAULT_MIN_OVERLAP_MINUTES: u32 = 60;

#[derive(thiserror::Error, Debug, Clone)]
pub enum ScopeError {
    #[error("existing scoped value conflicts with change for scope {0}; set overwrite to 'conflicting' or 'all' to replace it")]
    ScopeConflict(String),
    #[error("cannot apply a 'change' delta to non-numeric value: {0}")]
    NonNumericChange(String),
    #[error("scoped property set must have either 'set' or 'change': {0}")]
    MissingSetOrChange(String),
    #[error("no scoped value fully contains the queried scope: {0}")]
    StrictResolve(String),
}

/// a single scoped override: the value applies under the given category and
/// timespan. the default scope is category "any" over ["00:00", "24:00"].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedValueItem {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_timespan")]
    pub timespan: Timespan,
    pub value: PropertyValue,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

fn default_timespan() -> Timespan {
    DEFAULT_TIMESPAN
}

impl ScopedValueItem {
    pub fn new(category: &str, timespan: Timespan, value: PropertyValue) -> ScopedValueItem {
        ScopedValueItem {
            category: category.to_string(),
            timespan,
            value,
        }
    }

    pub fn has_default_category(&self) -> bool {
        self.category == DEFAULT_CATEGORY
    }

    pub fn has_default_timespan(&self) -> bool {
        self.timespan.is_default()
    }
}

/// an individual scoped write: one category, one timespan, and a `set` value
/// or additive `change` delta. grouped project card entries are expanded to
/// these before merging (see [`expand_scoped_property_sets`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedPropertySetItem {
    pub category: String,
    pub timespan: Timespan,
    pub set: Option<PropertyValue>,
    pub change: Option<PropertyValue>,
}

/// a scoped write as it appears in a project change: category and timespan
/// may each be given singular or as a list, in which case the write applies
/// to the cartesian product of the two dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopedPropertySet {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub timespan: Option<Timespan>,
    #[serde(default)]
    pub timespans: Option<Vec<Timespan>>,
    #[serde(default)]
    pub set: Option<PropertyValue>,
    #[serde(default)]
    pub change: Option<PropertyValue>,
}

/// policy for resolving writes that conflict with existing scoped values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// fail the write with [`ScopeError::ScopeConflict`].
    Error,
    /// drop existing conflicting items, keep independent ones.
    Conflicting,
    /// replace the whole scoped value list with the incoming items.
    All,
}
