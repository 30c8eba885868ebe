use super::{
    keys::alphanumeric_key,
    record::{Cell, RawRecord, Record},
    schema::SourceDescriptor,
};
use crate::{MergeError, Result};

/// Reorders `record` so its cells follow the alphanumeric order of `raw_columns`.
/// Names sharing a key keep their relative order.
pub fn realign(record: RawRecord, raw_columns: &[String]) -> Result<RawRecord> {
    if record.len() != raw_columns.len() {
        return Err(MergeError::MalformedRecord {
            source_id: String::from("<unknown>"),
            expected: raw_columns.len(),
            found: record.len(),
        });
    }
    let mut pairs: Vec<_> = raw_columns
        .iter()
        .map(|column| alphanumeric_key(column))
        .zip(record)
        .collect();
    pairs.sort_by(|(a, _), (b, _)| a.cmp(b));
    Ok(pairs.into_iter().map(|(_, cell)| cell).collect())
}

/// Pads an ordered record to schema width: each set bit takes the next cell,
/// each clear bit yields [`Cell::Absent`].
pub fn complete(ordered: RawRecord, presence: &[bool]) -> Result<Record> {
    let expected = presence.iter().filter(|present| **present).count();
    let found = ordered.len();
    let mismatch = || MergeError::PresenceMismatch {
        source_id: String::from("<unknown>"),
        expected,
        found,
    };
    if expected != found {
        return Err(mismatch());
    }

    let mut cells = ordered.into_iter();
    let mut padded = Vec::with_capacity(presence.len());
    for present in presence {
        if *present {
            padded.push(cells.next().ok_or_else(mismatch)?);
        } else {
            padded.push(Cell::Absent);
        }
    }
    Ok(padded)
}

/// Realigns (when the source needs it) and completes one raw record.
pub(crate) fn align_record(descriptor: &SourceDescriptor, record: RawRecord) -> Result<Record> {
    if record.len() != descriptor.raw_columns.len() {
        return Err(MergeError::MalformedRecord {
            source_id: descriptor.source_id.clone(),
            expected: descriptor.raw_columns.len(),
            found: record.len(),
        });
    }

    let ordered = if descriptor.needs_realignment {
        apply_order(record, &descriptor.realign_order).ok_or_else(|| {
            MergeError::message(format!(
                "Realignment order of {} is not a permutation of its {} columns",
                descriptor.source_id,
                descriptor.raw_columns.len()
            ))
        })?
    } else {
        record
    };

    complete(ordered, &descriptor.presence).map_err(|error| match error {
        MergeError::PresenceMismatch {
            expected, found, ..
        } => MergeError::PresenceMismatch {
            source_id: descriptor.source_id.clone(),
            expected,
            found,
        },
        other => other,
    })
}

/// `None` when `order` names a position twice or one past the record.
fn apply_order(record: RawRecord, order: &[usize]) -> Option<RawRecord> {
    debug_assert_eq!(record.len(), order.len());
    let mut slots: Vec<Option<Cell>> = record.into_iter().map(Some).collect();
    order
        .iter()
        .map(|index| slots.get_mut(*index).and_then(Option::take))
        .collect()
}
