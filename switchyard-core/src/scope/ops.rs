//! classification, resolution and merging of scoped property values.

use itertools::Itertools;

use super::{
    OverwritePolicy, ScopeError, ScopedPropertySet, ScopedPropertySetItem, ScopedValueItem,
    DEFAULT_CATEGORY,
};
use crate::time::{Timespan, DEFAULT_TIMESPAN};
use crate::value::PropertyValue;

fn category_applies(item: &ScopedValueItem, category: &str) -> bool {
    category == DEFAULT_CATEGORY || item.category == category || item.has_default_category()
}

/// filter scoped values to those matching the query scope: the category is
/// equal (or default on either side) and the item timespan contains the query
/// timespan or is the default.
pub fn matching_scopes<'a>(
    items: &'a [ScopedValueItem],
    category: &str,
    timespan: &Timespan,
) -> Vec<&'a ScopedValueItem> {
    items
        .iter()
        .filter(|item| category_applies(item, category))
        .filter(|item| {
            timespan.is_default() || item.has_default_timespan() || item.timespan.contains(timespan)
        })
        .collect()
}

/// filter scoped values to those overlapping the query scope by at least
/// `min_overlap_minutes`. defaults overlap everything in their dimension.
pub fn overlapping_scopes<'a>(
    items: &'a [ScopedValueItem],
    category: &str,
    timespan: &Timespan,
    min_overlap_minutes: u32,
) -> Vec<&'a ScopedValueItem> {
    items
        .iter()
        .filter(|item| category_applies(item, category))
        .filter(|item| {
            timespan.is_default()
                || item.has_default_timespan()
                || item.timespan.contains(timespan)
                || item.timespan.overlap_minutes(timespan) >= min_overlap_minutes
        })
        .collect()
}

/// filter scoped values to those conflicting with the query scope: sharing a
/// category (or default), intersecting in time, with neither span containing
/// the other. default scopes never conflict.
pub fn conflicting_scopes<'a>(
    items: &'a [ScopedValueItem],
    category: &str,
    timespan: &Timespan,
) -> Vec<&'a ScopedValueItem> {
    if category == DEFAULT_CATEGORY && timespan.is_default() {
        return vec![];
    }
    items
        .iter()
        .filter(|item| category_applies(item, category))
        .filter(|item| !item.has_default_timespan())
        .filter(|item| {
            item.timespan.overlaps(timespan)
                && !item.timespan.contains(timespan)
                && !timespan.contains(&item.timespan)
        })
        .collect()
}

/// true if any pair of items in the list conflicts. used as a table-level
/// invariant on every scoped property column.
pub fn has_conflicting_scopes(items: &[ScopedValueItem]) -> bool {
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let (a, b) = (&items[i], &items[j]);
            let share_category = a.category == b.category
                || a.has_default_category()
                || b.has_default_category();
            if !share_category || a.has_default_timespan() || b.has_default_timespan() {
                continue;
            }
            if a.timespan.overlaps(&b.timespan)
                && !a.timespan.contains(&b.timespan)
                && !b.timespan.contains(&a.timespan)
            {
                return true;
            }
        }
    }
    false
}

/// resolve the value of a scoped property for a query scope.
///
/// non-strict reads consider items overlapping the query by at least
/// `min_overlap_minutes` and return the one with the longest overlap; strict
/// reads require an item whose timespan fully contains the query. when no
/// item applies, the default value is returned (non-strict only).
pub fn resolve_scoped_value(
    default: &PropertyValue,
    items: &[ScopedValueItem],
    category: &str,
    timespan: &Timespan,
    min_overlap_minutes: u32,
    strict: bool,
) -> Result<PropertyValue, ScopeError> {
    let candidates = if strict {
        let matching = matching_scopes(items, category, timespan);
        if matching.is_empty() {
            return Err(ScopeError::StrictResolve(format!("({category}, {timespan})")));
        }
        matching
    } else {
        overlapping_scopes(items, category, timespan, min_overlap_minutes)
    };

    let best = candidates.into_iter().max_by_key(|item| {
        let overlap = if item.has_default_timespan() {
            timespan.duration_secs() / 60
        } else {
            item.timespan.overlap_minutes(timespan)
        };
        (overlap, item.timespan.duration_secs())
    });
    Ok(best.map(|item| item.value.clone()).unwrap_or_else(|| default.clone()))
}

/// expand grouped scoped write specs into individual (category, timespan)
/// writes: the cartesian product of the two dimensions, substituting defaults
/// where a dimension is not provided.
pub fn expand_scoped_property_sets(sets: &[ScopedPropertySet]) -> Vec<ScopedPropertySetItem> {
    let mut expanded = vec![];
    for set in sets {
        let categories: Vec<String> = match (&set.categories, &set.category) {
            (Some(cats), _) => cats.clone(),
            (None, Some(cat)) => vec![cat.clone()],
            (None, None) => vec![DEFAULT_CATEGORY.to_string()],
        };
        let timespans: Vec<Timespan> = match (&set.timespans, &set.timespan) {
            (Some(spans), _) => spans.clone(),
            (None, Some(span)) => vec![*span],
            (None, None) => vec![DEFAULT_TIMESPAN],
        };
        for (category, timespan) in categories.iter().cartesian_product(timespans.iter()) {
            expanded.push(ScopedPropertySetItem {
                category: category.clone(),
                timespan: *timespan,
                set: set.set.clone(),
                change: set.change.clone(),
            });
        }
    }
    expanded
}

/// build the updated item for one scope, applying `set` or an additive
/// `change` against the base value.
fn update_for_scope(
    set_item: &ScopedPropertySetItem,
    base_value: &PropertyValue,
) -> Result<ScopedValueItem, ScopeError> {
    if let Some(value) = &set_item.set {
        return Ok(ScopedValueItem::new(
            &set_item.category,
            set_item.timespan,
            value.clone(),
        ));
    }
    if let Some(delta) = &set_item.change {
        let value = base_value.checked_add(delta).ok_or_else(|| {
            ScopeError::NonNumericChange(format!("{base_value} + {delta}"))
        })?;
        return Ok(ScopedValueItem::new(&set_item.category, set_item.timespan, value));
    }
    Err(ScopeError::MissingSetOrChange(format!("{set_item:?}")))
}

/// merge a list of scoped writes into an existing scoped value list.
///
/// with [`OverwritePolicy::All`] (or an empty existing list) the writes
/// replace the list wholesale. otherwise each write first resolves conflicting
/// existing items (dropped under `Conflicting`, fatal under `Error`), then
/// replaces every matching item with an updated one, appending when nothing
/// matches.
pub fn merge_scoped_values(
    existing: &[ScopedValueItem],
    set_items: &[ScopedPropertySetItem],
    default_value: &PropertyValue,
    policy: OverwritePolicy,
) -> Result<Vec<ScopedValueItem>, ScopeError> {
    if policy == OverwritePolicy::All || existing.is_empty() {
        return set_items
            .iter()
            .map(|item| update_for_scope(item, default_value))
            .collect();
    }

    let mut updated: Vec<ScopedValueItem> = existing.to_vec();
    for set_item in set_items {
        log::debug!("merging scoped write: {set_item:?}");

        let conflicting: Vec<ScopedValueItem> =
            conflicting_scopes(&updated, &set_item.category, &set_item.timespan)
                .into_iter()
                .cloned()
                .collect();
        if !conflicting.is_empty() {
            match policy {
                OverwritePolicy::Conflicting => {
                    updated.retain(|item| !conflicting.contains(item));
                }
                _ => {
                    return Err(ScopeError::ScopeConflict(format!(
                        "({}, {}) conflicts with {} existing item(s)",
                        set_item.category,
                        set_item.timespan,
                        conflicting.len()
                    )));
                }
            }
        }

        let matching: Vec<ScopedValueItem> =
            matching_scopes(&updated, &set_item.category, &set_item.timespan)
                .into_iter()
                .cloned()
                .collect();
        updated.retain(|item| !matching.contains(item));

        if matching.is_empty() {
            updated.push(update_for_scope(set_item, default_value)?);
        } else {
            for matched in &matching {
                updated.push(update_for_scope(set_item, &matched.value)?);
            }
        }
    }
    Ok(updated)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::time::Time;

    fn ts(start: &str, end: &str) -> Timespan {
        Timespan::new(Time::parse(start).unwrap(), Time::parse(end).unwrap())
    }

    fn peak_lanes() -> Vec<ScopedValueItem> {
        vec![ScopedValueItem::new(
            DEFAULT_CATEGORY,
            ts("06:00", "09:00"),
            PropertyValue::Int(2),
        )]
    }

    #[test]
    fn test_resolve_contained_query_returns_override() {
        let value = resolve_scoped_value(
            &PropertyValue::Int(3),
            &peak_lanes(),
            DEFAULT_CATEGORY,
            &ts("07:00", "08:00"),
            60,
            false,
        )
        .unwrap();
        assert_eq!(value, PropertyValue::Int(2));
    }

    #[test]
    fn test_resolve_disjoint_query_returns_default() {
        let value = resolve_scoped_value(
            &PropertyValue::Int(3),
            &peak_lanes(),
            DEFAULT_CATEGORY,
            &ts("10:00", "11:00"),
            60,
            false,
        )
        .unwrap();
        assert_eq!(value, PropertyValue::Int(3));
    }

    #[test]
    fn test_resolve_strict_requires_containing_scope() {
        let result = resolve_scoped_value(
            &PropertyValue::Int(3),
            &peak_lanes(),
            DEFAULT_CATEGORY,
            &ts("08:00", "10:00"),
            60,
            true,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_category_specific_beats_nothing() {
        let items = vec![ScopedValueItem::new("sov", ts("06:00", "09:00"), PropertyValue::Int(1))];
        let hov = resolve_scoped_value(
            &PropertyValue::Int(3),
            &items,
            "hov",
            &ts("07:00", "08:00"),
            60,
            false,
        )
        .unwrap();
        assert_eq!(hov, PropertyValue::Int(3));
        let sov = resolve_scoped_value(
            &PropertyValue::Int(3),
            &items,
            "sov",
            &ts("07:00", "08:00"),
            60,
            false,
        )
        .unwrap();
        assert_eq!(sov, PropertyValue::Int(1));
    }

    #[test]
    fn test_conflicting_scope_write_errors() {
        let set = vec![ScopedPropertySetItem {
            category: DEFAULT_CATEGORY.to_string(),
            timespan: ts("07:00", "10:00"),
            set: Some(PropertyValue::Int(1)),
            change: None,
        }];
        let result = merge_scoped_values(
            &peak_lanes(),
            &set,
            &PropertyValue::Int(3),
            OverwritePolicy::Error,
        );
        assert!(matches!(result, Err(ScopeError::ScopeConflict(_))));
    }

    #[test]
    fn test_conflicting_scope_write_overwrites_when_allowed() {
        let set = vec![ScopedPropertySetItem {
            category: DEFAULT_CATEGORY.to_string(),
            timespan: ts("07:00", "10:00"),
            set: Some(PropertyValue::Int(1)),
            change: None,
        }];
        let merged = merge_scoped_values(
            &peak_lanes(),
            &set,
            &PropertyValue::Int(3),
            OverwritePolicy::Conflicting,
        )
        .unwrap();
        assert_eq!(
            merged,
            vec![ScopedValueItem::new(
                DEFAULT_CATEGORY,
                ts("07:00", "10:00"),
                PropertyValue::Int(1)
            )]
        );
    }

    #[test]
    fn test_matching_scope_write_applies_change_to_matched_value() {
        let set = vec![ScopedPropertySetItem {
            category: DEFAULT_CATEGORY.to_string(),
            timespan: ts("06:00", "09:00"),
            set: None,
            change: Some(PropertyValue::Int(1)),
        }];
        let merged = merge_scoped_values(
            &peak_lanes(),
            &set,
            &PropertyValue::Int(3),
            OverwritePolicy::Error,
        )
        .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].value, PropertyValue::Int(3));
    }

    #[test]
    fn test_independent_scope_write_appends() {
        let set = vec![ScopedPropertySetItem {
            category: DEFAULT_CATEGORY.to_string(),
            timespan: ts("15:00", "18:00"),
            set: Some(PropertyValue::Int(1)),
            change: None,
        }];
        let merged = merge_scoped_values(
            &peak_lanes(),
            &set,
            &PropertyValue::Int(3),
            OverwritePolicy::Error,
        )
        .unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_change_on_non_numeric_default_fails() {
        let set = vec![ScopedPropertySetItem {
            category: DEFAULT_CATEGORY.to_string(),
            timespan: ts("15:00", "18:00"),
            set: None,
            change: Some(PropertyValue::Int(1)),
        }];
        let result = merge_scoped_values(
            &[],
            &set,
            &PropertyValue::Str("unknown".to_string()),
            OverwritePolicy::Error,
        );
        assert!(matches!(result, Err(ScopeError::NonNumericChange(_))));
    }

    #[test]
    fn test_overwrite_all_replaces_list() {
        let set = vec![ScopedPropertySetItem {
            category: "hov".to_string(),
            timespan: ts("07:00", "10:00"),
            set: Some(PropertyValue::Int(1)),
            change: None,
        }];
        let merged =
            merge_scoped_values(&peak_lanes(), &set, &PropertyValue::Int(3), OverwritePolicy::All)
                .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].category, "hov");
    }

    #[test]
    fn test_grouped_expansion_is_cartesian() {
        let grouped = vec![ScopedPropertySet {
            category: None,
            categories: Some(vec!["sov".to_string(), "hov".to_string()]),
            timespan: None,
            timespans: Some(vec![ts("06:00", "09:00"), ts("15:00", "18:00")]),
            set: Some(PropertyValue::Int(1)),
            change: None,
        }];
        let expanded = expand_scoped_property_sets(&grouped);
        assert_eq!(expanded.len(), 4);
    }

    #[test]
    fn test_grouped_expansion_defaults_missing_dimensions() {
        let grouped = vec![ScopedPropertySet {
            category: None,
            categories: None,
            timespan: Some(ts("06:00", "09:00")),
            timespans: None,
            set: Some(PropertyValue::Int(1)),
            change: None,
        }];
        let expanded = expand_scoped_property_sets(&grouped);
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].category, DEFAULT_CATEGORY);
    }

    #[test]
    fn test_conflict_detection_on_lists() {
        let ok = vec![
            ScopedValueItem::new(DEFAULT_CATEGORY, ts("06:00", "09:00"), PropertyValue::Int(2)),
            ScopedValueItem::new(DEFAULT_CATEGORY, ts("15:00", "18:00"), PropertyValue::Int(2)),
        ];
        assert!(!has_conflicting_scopes(&ok));
        let bad = vec![
            ScopedValueItem::new(DEFAULT_CATEGORY, ts("06:00", "09:00"), PropertyValue::Int(2)),
            ScopedValueItem::new(DEFAULT_CATEGORY, ts("08:00", "10:00"), PropertyValue::Int(1)),
        ];
        assert!(has_conflicting_scopes(&bad));
        let disjoint_categories = vec![
            ScopedValueItem::new("sov", ts("06:00", "09:00"), PropertyValue::Int(2)),
            ScopedValueItem::new("hov", ts("08:00", "10:00"), PropertyValue::Int(1)),
        ];
        assert!(!has_conflicting_scopes(&disjoint_categories));
    }
}
