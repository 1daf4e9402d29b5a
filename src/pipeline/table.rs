use std::collections::HashMap;

/// Per-ingredient status as recorded in the reference dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Halal,
    NonHalal,
    Doubtful,
}

impl Status {
    pub fn parse(s: &str) -> Option<Status> {
        match s.trim().to_lowercase().as_str() {
            "halal" => Some(Status::Halal),
            "non-halal" | "non halal" | "non_halal" => Some(Status::NonHalal),
            "doubtful" => Some(Status::Doubtful),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Halal => "halal",
            Status::NonHalal => "non-halal",
            Status::Doubtful => "doubtful",
        }
    }
}

/// One row of the reference dataset.
#[derive(Debug, Clone)]
pub struct IngredientRecord {
    pub name: String,
    pub canonical_name: String,
    pub status: Status,
}

/// Immutable name → status mapping built once per dataset snapshot.
/// Keys are lowercased and trimmed; safe to share across threads after build.
#[derive(Debug, Default)]
pub struct LookupTable {
    entries: HashMap<String, Status>,
}

impl LookupTable {
    /// Records with an empty name are dropped. Duplicate names: the later
    /// record in the input wins.
    pub fn build(records: &[IngredientRecord]) -> Self {
        let mut entries = HashMap::with_capacity(records.len());
        for record in records {
            let key = record.name.trim().to_lowercase();
            if key.is_empty() {
                continue;
            }
            entries.insert(key, record.status);
        }
        LookupTable { entries }
    }

    pub fn status_of(&self, name: &str) -> Option<Status> {
        self.entries.get(&name.trim().to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ── Tests ──
