//! generation of new table ids from existing ones.

use std::collections::HashSet;

#[derive(thiserror::Error, Debug, Clone)]
pub enum IdError {
    #[error("cannot generate a new id from '{0}' within the maximum number of iterations")]
    IdCreation(String),
}

const ITER_VAL: i64 = 10;
const MAX_ITER: i64 = 1000;

/// split an id string into (prefix, numeric core, suffix). an id with no
/// digits yields a zero core.
fn split_prefix_num_suffix(id: &str) -> (&str, i64, &str) {
    let start = match id.find(|c: char| c.is_ascii_digit()) {
        Some(i) => i,
        None => return (id, 0, ""),
    };
    let end = id[start..]
        .find(|c: char| !c.is_ascii_digit())
        .map(|i| start + i)
        .unwrap_or(id.len());
    let num = id[start..end].parse::<i64>().unwrap_or(0);
    (&id[..start], num, &id[end..])
}

/// generate a new id not present in `existing` by adding `scalar` to the
/// numeric core of `input_id` and stepping until unused. used when a copied
/// row needs a unique id, e.g. cloning a transit shape.
pub fn generate_new_id_from_existing(
    input_id: &str,
    existing: &HashSet<String>,
    scalar: i64,
) -> Result<String, IdError> {
    let (prefix, num, suffix) = split_prefix_num_suffix(input_id);
    for i in 1..=MAX_ITER {
        let candidate = format!("{}{}{}", prefix, num + scalar + ITER_VAL * i, suffix);
        if !existing.contains(&candidate) {
            return Ok(candidate);
        }
    }
    log::error!("cannot generate new id from '{input_id}' within {MAX_ITER} iterations");
    Err(IdError::IdCreation(input_id.to_string()))
}

/// generate `n` new ids, each avoiding both `existing` and the ids generated
/// before it. order of the result matches the inputs.
pub fn generate_new_ids_from_existing(
    input_ids: &[String],
    existing: &HashSet<String>,
    scalar: i64,
) -> Result<Vec<String>, IdError> {
    let mut taken = existing.clone();
    let mut new_ids = Vec::with_capacity(input_ids.len());
    for input_id in input_ids {
        let new_id = generate_new_id_from_existing(input_id, &taken, scalar)?;
        taken.insert(new_id.clone());
        new_ids.push(new_id);
    }
    Ok(new_ids)
}

/// create `n` string ids of the form `{prefix}{int}{suffix}`, continuing past
/// the largest integer already used with that prefix and suffix.
pub fn create_str_int_combo_ids(
    n: usize,
    taken: &[String],
    prefix: &str,
    suffix: &str,
) -> Vec<String> {
    let max_taken = taken
        .iter()
        .filter_map(|id| {
            let core = id.strip_prefix(prefix)?.strip_suffix(suffix)?;
            core.parse::<i64>().ok()
        })
        .max()
        .unwrap_or(0);
    (1..=n as i64)
        .map(|i| format!("{}{}{}", prefix, max_taken + i, suffix))
        .collect()
}

/// create `n` integer ids continuing past the largest taken id.
pub fn next_int_ids(n: usize, taken: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let start = taken.into_iter().max().unwrap_or(0) + 1;
    (start..start + n as i64).collect()
}
