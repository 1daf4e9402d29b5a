use std::sync::LazyLock;

use regex::Regex;

static ALLERGEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"allergen information:?.*").unwrap());
static CONTAINS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(contains|may contain:).*?(\.|$)").unwrap());

/// Boilerplate the vision model wraps around the actual ingredient list.
/// Matched as plain substrings against the lowercased text, in order; grown
/// one phrase at a time as new output styles show up.
pub const BOILERPLATE_PHRASES: &[&str] = &[
    "ingredients:",
    "the ingredients listed on the image",
    "here are the ingredients as listed on the image: ",
    "are as follows:  -",
    "are as follows:",
    "are:",
    "the ingredients listed",
    "the image shows a list of ingredients",
    "which includes items like",
    "the list is a typical example of ingredients you might find on the packaging of a processed food product",
    "and it provides important information for consumers about what is in the product as well as potential allergens they should be aware of",
    "the text also mentions",
    "here are the ingredients exactly as they appear in the image:",
    "sure",
    "here is the list of ingredients exactly as they appear in the image:",
    "in the image",
    "the ingredients  are listed as follows:",
    "on the packaging",
    "the ingredients exactly as they appear",
];

/// Clean raw extracted label text down to a comma-separated ingredient string.
/// An all-boilerplate input comes back empty; callers treat that as "no
/// ingredients found", not an error.
pub fn normalize(raw: &str) -> String {
    normalize_with(raw, BOILERPLATE_PHRASES)
}

/// Same as [`normalize`] with a caller-supplied phrase catalogue.
pub fn normalize_with(raw: &str, phrases: &[&str]) -> String {
    // Unify bracket styles so the splitter only has to know about parentheses,
    // and turn line breaks into candidate ingredient boundaries.
    let mut text = raw.to_lowercase().replace('[', "(").replace(']', ")");
    text = text.replace('\n', ",");

    // Allergen footer: everything from the phrase to the end is disclosure,
    // not ingredients.
    text = ALLERGEN_RE.replace_all(&text, "").into_owned();

    // "contains ..." / "may contain: ..." clauses run to the next period or
    // end of string.
    text = CONTAINS_RE.replace_all(&text, "").into_owned();

    for phrase in phrases {
        text = text.replace(phrase, "");
    }

    text = text.replace(';', ",");

    if text.ends_with('.') {
        text.pop();
    }

    // Bullet-list hyphens and stray periods.
    text.replace(['-', '.'], "")
}

// ── Tests ──
