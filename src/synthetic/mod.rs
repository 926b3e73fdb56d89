//! Synthetic housing datasets for demos and tests

use polars::prelude::*;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::error::Result;

/// Houses above this size are labelled expensive
pub const EXPENSIVE_SQFT: i64 = 2200;

/// Generate `num_rows` houses with `id`, `sqft` and `is_expensive` columns.
///
/// Square footage is uniform in 500..=4500. One extra row reuses id 1 with a
/// 9999 sqft house, so the output always holds `num_rows + 1` rows.
pub fn housing_frame(num_rows: usize, seed: Option<u64>) -> Result<DataFrame> {
    let mut rng = match seed {
        Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
        None => Xoshiro256PlusPlus::from_entropy(),
    };

    let mut ids: Vec<i64> = Vec::with_capacity(num_rows + 1);
    let mut sqft: Vec<i64> = Vec::with_capacity(num_rows + 1);
    let mut labels: Vec<i64> = Vec::with_capacity(num_rows + 1);
    for i in 0..num_rows {
        let size = rng.gen_range(500..=4500);
        ids.push(i as i64);
        sqft.push(size);
        labels.push(i64::from(size > EXPENSIVE_SQFT));
    }
    ids.push(1);
    sqft.push(9999);
    labels.push(1);

    Ok(df! {
        "id" => ids,
        "sqft" => sqft,
        "is_expensive" => labels,
    }?)
}

/// Serialize a frame as CSV with a header row
pub fn to_csv_bytes(df: &mut DataFrame) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf).include_header(true).finish(df)?;
    Ok(buf)
}
