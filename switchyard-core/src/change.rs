//! property change records shared by the roadway and transit editors.

use serde::{Deserialize, Serialize};

use crate::scope::{OverwritePolicy, ScopedPropertySet};
use crate::value::PropertyValue;

/// policy when an asserted `existing` value does not match the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingValueConflict {
    Error,
    Warn,
    Skip,
}

/// a declarative change to one property on a set of selected rows.
///
/// `set` replaces the value, `change` adds a numeric delta, `existing`
/// asserts the current value before the edit. `scoped` carries scoped
/// overrides to merge into the property's scoped value list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    #[serde(default)]
    pub existing: Option<PropertyValue>,
    #[serde(default)]
    pub set: Option<PropertyValue>,
    #[serde(default)]
    pub change: Option<PropertyValue>,
    #[serde(default)]
    pub scoped: Option<Vec<ScopedPropertySet>>,
    #[serde(default)]
    pub overwrite_scoped: Option<OverwritePolicy>,
    #[serde(default)]
    pub existing_value_conflict: Option<ExistingValueConflict>,
}

impl PropertyChange {
    pub fn set(value: PropertyValue) -> PropertyChange {
        PropertyChange {
            existing: None,
            set: Some(value),
            change: None,
            scoped: None,
            overwrite_scoped: None,
            existing_value_conflict: None,
        }
    }

    pub fn change(delta: PropertyValue) -> PropertyChange {
        PropertyChange {
            existing: None,
            set: None,
            change: Some(delta),
            scoped: None,
            overwrite_scoped: None,
            existing_value_conflict: None,
        }
    }

    /// true when the change carries neither a scalar edit nor scoped writes.
    pub fn is_empty(&self) -> bool {
        self.set.is_none() && self.change.is_none() && self.scoped.is_none()
    }
}

/// append a project name to a row's comma-delimited provenance column.
pub fn append_project(projects: &mut String, project_name: Option<&str>) {
    if let Some(name) = project_name {
        projects.push_str(name);
        projects.push(',');
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_change_record_roundtrip() {
        let raw = r#"{"existing": 3, "set": 2, "scoped": [{"timespan": ["06:00", "09:00"], "set": 1}]}"#;
        let change: PropertyChange = serde_json::from_str(raw).unwrap();
        assert_eq!(change.existing, Some(PropertyValue::Int(3)));
        assert_eq!(change.set, Some(PropertyValue::Int(2)));
        assert_eq!(change.scoped.as_ref().unwrap().len(), 1);
        assert!(!change.is_empty());
    }

    #[test]
    fn test_append_project_accumulates() {
        let mut projects = String::new();
        append_project(&mut projects, Some("widen 6th"));
        append_project(&mut projects, None);
        append_project(&mut projects, Some("hov lane"));
        assert_eq!(projects, "widen 6th,hov lane,");
    }
}
