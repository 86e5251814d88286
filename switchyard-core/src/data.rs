//! ordered-sequence segmentation used when splicing a replacement segment
//! into a trip pattern or shape.

#[derive(thiserror::Error, Debug, Clone)]
pub enum DataError {
    #[error("segment {position} item '{item}' not found in data")]
    SegmentBound { item: String, position: &'static str },
}

/// the value in a selection bound meaning "to the start/end of the data".
pub const SEGMENT_END_VAL: i64 = 0;

/// segment a sequence into (before, selected, after) based on the first and
/// last items of `selection`, inclusive of both. a bound equal to
/// [`SEGMENT_END_VAL`] extends the segment to the corresponding end of the
/// data. when a bound occurs multiple times the largest segment is selected.
pub fn segment_by_selection<T: Clone>(
    selection: (i64, i64),
    data: &[T],
    key: impl Fn(&T) -> i64,
) -> Result<(Vec<T>, Vec<T>, Vec<T>), DataError> {
    let keys: Vec<i64> = data.iter().map(&key).collect();
    let start_item = if selection.0 == SEGMENT_END_VAL {
        *keys.first().unwrap_or(&SEGMENT_END_VAL)
    } else {
        selection.0
    };
    let end_item = if selection.1 == SEGMENT_END_VAL {
        *keys.last().unwrap_or(&SEGMENT_END_VAL)
    } else {
        selection.1
    };

    let start_idx = keys.iter().position(|k| *k == start_item).ok_or(DataError::SegmentBound {
        item: start_item.to_string(),
        position: "start",
    })?;
    let end_idx = keys[start_idx..]
        .iter()
        .rposition(|k| *k == end_item)
        .map(|i| start_idx + i)
        .ok_or(DataError::SegmentBound {
            item: end_item.to_string(),
            position: "end",
        })?;

    Ok((
        data[..start_idx].to_vec(),
        data[start_idx..=end_idx].to_vec(),
        data[end_idx + 1..].to_vec(),
    ))
}

/// segment a sequence as [`segment_by_selection`], then shrink the selected
/// segment where the replacement list overlaps its bounds so that existing
/// rows are preserved: a replacement starting with the segment's first item
/// moves that row to the before segment, and symmetrically for the last item.
///
/// returns the (possibly shortened) replacement list alongside the three
/// segments.
pub fn segment_by_selection_min_overlap<T: Clone>(
    selection: (i64, i64),
    data: &[T],
    key: impl Fn(&T) -> i64,
    replacements: &[i64],
) -> Result<(Vec<i64>, (Vec<T>, Vec<T>, Vec<T>)), DataError> {
    let (mut before, mut segment, mut after) = segment_by_selection(selection, data, &key)?;
    let mut replacements = replacements.to_vec();

    if let (Some(first_repl), Some(first_row)) = (replacements.first(), segment.first()) {
        if *first_repl == key(first_row) {
            replacements.remove(0);
            before.push(segment.remove(0));
            log::debug!("segment start overlaps with replacement; keeping existing row");
        }
    }
    if let (Some(last_repl), Some(last_row)) = (replacements.last(), segment.last()) {
        if *last_repl == key(last_row) {
            replacements.pop();
            after.insert(0, segment.pop().expect("segment is non-empty"));
            log::debug!("segment end overlaps with replacement; keeping existing row");
        }
    }

    Ok((replacements, (before, segment, after)))
}
