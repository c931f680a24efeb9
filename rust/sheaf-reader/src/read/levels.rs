//! Offset and presence reconstruction from level streams.
//!
//! A batch of decoded leaf values comes with one repetition and one
//! definition level per value slot. Every composite node on the path from
//! the root to the leaf reinterprets the same two streams at its own depth:
//! arrays and maps rebuild their per-row offsets, nullable nodes rebuild
//! their presence flags. Levels that describe a different depth are skipped:
//! a definition level below `repeated_parent_def_level` belongs to a null
//! ancestor and produces no slot here, a repetition level above
//! `repetition_level` extends a collection nested deeper down.

use sheaf_column::offsets::Offsets;
use sheaf_column::presence::Presence;
use sheaf_format::schema::FieldSchema;

/// Appends the offsets (and presence flags, when `presence` is given) of an
/// array or map node from the level streams of one decoded batch.
///
/// A level equal to the node's repetition level continues the collection
/// started by an earlier level; anything lower starts a new slot. A new
/// slot holds one element when the definition level reaches the node's
/// definition level, and is empty otherwise. The slot is non-null already
/// at `definition_level - 1`, the present-but-empty state.
pub fn fill_array_offsets(
    field: &FieldSchema,
    offsets: &mut Offsets,
    mut presence: Option<&mut Presence>,
    rep_levels: &[u16],
    def_levels: &[u16],
) {
    debug_assert_eq!(rep_levels.len(), def_levels.len());
    let empty_def_level = field.definition_level.saturating_sub(1);
    for (&rep, &def) in rep_levels.iter().zip(def_levels) {
        if def < field.repeated_parent_def_level || rep > field.repetition_level {
            continue;
        }
        if rep == field.repetition_level {
            offsets.extend_last(1);
            continue;
        }
        offsets.push_length((def >= field.definition_level) as usize);
        if let Some(presence) = presence.as_deref_mut() {
            if def >= empty_def_level {
                presence.push_non_null();
            } else {
                presence.push_null();
            }
        }
    }
}

/// Appends the presence flags of a struct node from the level streams of one
/// decoded batch.
///
/// A struct itself repeats only through enclosing collections, so every
/// surviving level is one slot; the slot is null when the definition level
/// stays below the node's definition level.
pub fn fill_struct_presence(
    field: &FieldSchema,
    presence: &mut Presence,
    rep_levels: &[u16],
    def_levels: &[u16],
) {
    debug_assert_eq!(rep_levels.len(), def_levels.len());
    for (&rep, &def) in rep_levels.iter().zip(def_levels) {
        if def < field.repeated_parent_def_level || rep > field.repetition_level {
            continue;
        }
        if def >= field.definition_level {
            presence.push_non_null();
        } else {
            presence.push_null();
        }
    }
}

#[cfg(test)]
mod tests {
    use sheaf_format::schema::{FieldBuilder, PhysicalType, SchemaBuilder};

    use super::*;

    fn list_of_required_ints() -> FieldSchema {
        let root = SchemaBuilder::new(vec![FieldBuilder::list(
            "tags",
            FieldBuilder::scalar("item", PhysicalType::Int64).required(),
        )])
        .finish();
        root.children[0].clone()
    }

    #[test]
    fn test_array_offsets_null_empty_and_values() {
        let field = list_of_required_ints();
        assert_eq!(field.definition_level, 2);
        assert_eq!(field.repetition_level, 1);

        // rows: null, [], [a, b]
        let rep = [0, 0, 0, 1];
        let def = [0, 1, 2, 2];
        let mut offsets = Offsets::new();
        let mut presence = Presence::new();
        fill_array_offsets(&field, &mut offsets, Some(&mut presence), &rep, &def);

        assert_eq!(offsets.as_slice(), &[0, 0, 0, 2]);
        assert!(presence.is_null(0));
        assert!(presence.is_valid(1));
        assert!(presence.is_valid(2));
    }

    #[test]
    fn test_array_offsets_resume_continuation() {
        let field = list_of_required_ints();
        let mut offsets = Offsets::new();

        // [a, b] split across two batches at an element boundary
        fill_array_offsets(&field, &mut offsets, None, &[0], &[2]);
        fill_array_offsets(&field, &mut offsets, None, &[1], &[2]);
        assert_eq!(offsets.as_slice(), &[0, 2]);
    }

    #[test]
    fn test_nested_lists_skip_foreign_depths() {
        let root = SchemaBuilder::new(vec![FieldBuilder::list(
            "rows",
            FieldBuilder::list(
                "items",
                FieldBuilder::scalar("v", PhysicalType::Int64).required(),
            ),
        )])
        .finish();
        let outer = root.children[0].clone();
        let inner = outer.children[0].clone();
        assert_eq!(inner.repeated_parent_def_level, outer.definition_level);

        // rows: null, [[1], [2, 3]]
        let rep = [0, 0, 1, 2];
        let def = [0, 4, 4, 4];

        let mut outer_offsets = Offsets::new();
        let mut outer_presence = Presence::new();
        fill_array_offsets(
            &outer,
            &mut outer_offsets,
            Some(&mut outer_presence),
            &rep,
            &def,
        );
        // the null row is one empty slot; rep level 2 belongs to the inner list
        assert_eq!(outer_offsets.as_slice(), &[0, 0, 2]);
        assert!(outer_presence.is_null(0));
        assert!(outer_presence.is_valid(1));

        let mut inner_offsets = Offsets::new();
        let mut inner_presence = Presence::new();
        fill_array_offsets(
            &inner,
            &mut inner_offsets,
            Some(&mut inner_presence),
            &rep,
            &def,
        );
        // the null outer row contributes no inner slot at all
        assert_eq!(inner_offsets.as_slice(), &[0, 1, 3]);
        assert_eq!(inner_presence.count_nulls(), 0);
    }

    #[test]
    fn test_struct_presence() {
        let root = SchemaBuilder::new(vec![FieldBuilder::record(
            "person",
            vec![
                FieldBuilder::scalar("name", PhysicalType::Binary).required(),
                FieldBuilder::list(
                    "nicknames",
                    FieldBuilder::scalar("n", PhysicalType::Binary).required(),
                ),
            ],
        )])
        .finish();
        let person = root.children[0].clone();
        assert_eq!(person.definition_level, 1);

        // rows (levels of the nicknames leaf): null person,
        // person with ["a", "b"], person with a null nicknames list
        let rep = [0, 0, 1, 0];
        let def = [0, 3, 3, 1];
        let mut presence = Presence::new();
        fill_struct_presence(&person, &mut presence, &rep, &def);

        assert_eq!(presence.len(), 3);
        assert!(presence.is_null(0));
        assert!(presence.is_valid(1));
        assert!(presence.is_valid(2));
    }
}
