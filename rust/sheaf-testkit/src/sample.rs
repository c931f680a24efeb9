//! A representative schema and seeded random row generation.

use fastrand::Rng;

use sheaf_format::schema::{FieldBuilder, FieldSchema, PhysicalType, SchemaBuilder};

use crate::rows::Cell;

const WORDS: &[&str] = &[
    "amber", "basalt", "cedar", "delta", "ember", "fjord", "garnet", "harbor", "indigo", "juniper",
    "krill", "lagoon", "mesa", "nickel", "onyx", "pumice", "quartz", "reef", "slate", "tundra",
];

/// Builds a schema exercising every field shape: required and nullable flat
/// scalars, a list, a map and a struct holding a nested list.
pub fn sample_schema() -> FieldSchema {
    SchemaBuilder::new(vec![
        FieldBuilder::scalar("id", PhysicalType::Int64).required(),
        FieldBuilder::scalar("name", PhysicalType::Binary),
        FieldBuilder::scalar("score", PhysicalType::Float64),
        FieldBuilder::scalar("active", PhysicalType::Boolean),
        FieldBuilder::scalar("created", PhysicalType::Timestamp).required(),
        FieldBuilder::list(
            "tags",
            FieldBuilder::scalar("tag", PhysicalType::Binary).required(),
        ),
        FieldBuilder::map(
            "attrs",
            FieldBuilder::scalar("key", PhysicalType::Binary).required(),
            FieldBuilder::scalar("value", PhysicalType::Int64),
        ),
        FieldBuilder::record(
            "location",
            vec![
                FieldBuilder::scalar("city", PhysicalType::Binary).required(),
                FieldBuilder::list(
                    "grid",
                    FieldBuilder::scalar("cell", PhysicalType::Int32).required(),
                ),
            ],
        ),
    ])
    .finish()
}

/// Generates `count` rows matching [`sample_schema`], deterministic for a
/// given seed. Roughly one cell in eight of each nullable field is null,
/// and collections include empty instances.
pub fn sample_rows(count: usize, seed: u64) -> Vec<Cell> {
    let mut rng = Rng::with_seed(seed);
    (0..count).map(|index| sample_row(&mut rng, index)).collect()
}

fn sample_row(rng: &mut Rng, index: usize) -> Cell {
    let word = |rng: &mut Rng| Cell::str(WORDS[rng.usize(..WORDS.len())]);
    let name = nullable(rng, word);
    let score = nullable(rng, |rng| Cell::Float((rng.u32(..10_000) as f64) / 100.0));
    let active = nullable(rng, |rng| Cell::Bool(rng.bool()));
    let created = Cell::Ts(1_700_000_000_000_000 + index as i64 * 1_000_000);
    let tags = nullable(rng, |rng| {
        let len = rng.usize(..4);
        Cell::List((0..len).map(|_| word(rng)).collect())
    });
    let attrs = nullable(rng, |rng| {
        let len = rng.usize(..3);
        Cell::Map(
            (0..len)
                .map(|_| (word(rng), nullable(rng, |rng| Cell::Int(rng.i64(0..1000)))))
                .collect(),
        )
    });
    let location = nullable(rng, |rng| {
        let grid = nullable(rng, |rng| {
            let len = rng.usize(..3);
            Cell::List((0..len).map(|_| Cell::Int(rng.i32(..) as i64)).collect())
        });
        Cell::Record(vec![word(rng), grid])
    });
    Cell::Record(vec![
        Cell::Int(index as i64),
        name,
        score,
        active,
        created,
        tags,
        attrs,
        location,
    ])
}

fn nullable(rng: &mut Rng, fill: impl FnOnce(&mut Rng) -> Cell) -> Cell {
    if rng.u8(..8) == 0 {
        Cell::Null
    } else {
        fill(rng)
    }
}
