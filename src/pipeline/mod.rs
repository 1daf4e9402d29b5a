pub mod classify;
pub mod normalize;
pub mod split;
pub mod table;

pub use classify::{classify, Classification, Verdict};
pub use table::{IngredientRecord, LookupTable, Status};

#[derive(Debug)]
pub struct Analysis {
    pub ingredients: Vec<String>,
    pub classification: Classification,
}

/// Three-pass pipeline: raw label text → normalized string → ingredient names
/// → classification against the lookup table.
pub fn analyze(raw: &str, table: &LookupTable) -> Analysis {
    let cleaned = normalize::normalize(raw);
    let ingredients = split::split_ingredients(&cleaned);
    let classification = classify::classify(&ingredients, table);
    Analysis {
        ingredients,
        classification,
    }
}

// ── Tests ──
