use super::table::{LookupTable, Status};

/// Product-level verdict derived from all parsed ingredients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Halal,
    NonHalal,
    Doubtful,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Halal => "halal",
            Verdict::NonHalal => "non-halal",
            Verdict::Doubtful => "doubtful",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub verdict: Verdict,
    /// Ingredients absent from the table, in first-encounter order, no dedup.
    pub unknown: Vec<String>,
}

/// Single pass over the ingredients in order. A non-halal or doubtful hit sets
/// the verdict to non-halal; an ingredient missing from the table sets it to
/// doubtful and records the name. The verdict therefore follows the *last*
/// flagged ingredient in the list: an unknown ingredient after a non-halal one
/// downgrades the verdict to doubtful. Downstream consumers depend on this
/// ordering behavior; see DESIGN.md before changing it to worst-case
/// aggregation.
///
/// Total over any input; an empty list yields `{Halal, []}`.
pub fn classify(ingredients: &[String], table: &LookupTable) -> Classification {
    let mut verdict = Verdict::Halal;
    let mut unknown = Vec::new();

    for ingredient in ingredients {
        match table.status_of(ingredient) {
            Some(Status::NonHalal) | Some(Status::Doubtful) => verdict = Verdict::NonHalal,
            Some(Status::Halal) => {}
            None => {
                verdict = Verdict::Doubtful;
                unknown.push(ingredient.clone());
            }
        }
    }

    Classification { verdict, unknown }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::table::IngredientRecord;

    fn table(entries: &[(&str, Status)]) -> LookupTable {
        let records: Vec<IngredientRecord> = entries
            .iter()
            .map(|(name, status)| IngredientRecord {
                name: name.to_string(),
                canonical_name: name.to_string(),
                status: *status,
            })
            .collect();
        LookupTable::build(&records)
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn all_halal() {
        let t = table(&[
            ("water", Status::Halal),
            ("sugar", Status::Halal),
            ("salt", Status::Halal),
        ]);
        let c = classify(&names(&["water", "sugar", "salt"]), &t);
        assert_eq!(c.verdict, Verdict::Halal);
        assert!(c.unknown.is_empty());
    }

    #[test]
    fn non_halal_last() {
        let t = table(&[("sugar", Status::Halal), ("lard", Status::NonHalal)]);
        let c = classify(&names(&["sugar", "lard"]), &t);
        assert_eq!(c.verdict, Verdict::NonHalal);
        assert!(c.unknown.is_empty());
    }

    #[test]
    fn doubtful_status_flags_product_non_halal() {
        let t = table(&[("gelatin", Status::Doubtful)]);
        let c = classify(&names(&["gelatin"]), &t);
        assert_eq!(c.verdict, Verdict::NonHalal);
    }

    #[test]
    fn unknown_after_non_halal_wins() {
        let t = table(&[("sugar", Status::Halal), ("lard", Status::NonHalal)]);
        let c = classify(&names(&["sugar", "lard", "xylitol"]), &t);
        assert_eq!(c.verdict, Verdict::Doubtful);
        assert_eq!(c.unknown, vec!["xylitol"]);
    }

    #[test]
    fn unknown_order_preserved_without_dedup() {
        let t = table(&[("water", Status::Halal)]);
        let c = classify(&names(&["zeta", "water", "alpha", "zeta"]), &t);
        assert_eq!(c.unknown, vec!["zeta", "alpha", "zeta"]);
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let t = table(&[("Lard", Status::NonHalal)]);
        let c = classify(&names(&["LARD"]), &t);
        assert_eq!(c.verdict, Verdict::NonHalal);
    }

    #[test]
    fn empty_sequence_is_halal() {
        let t = table(&[]);
        let c = classify(&[], &t);
        assert_eq!(c.verdict, Verdict::Halal);
        assert!(c.unknown.is_empty());
    }
}
