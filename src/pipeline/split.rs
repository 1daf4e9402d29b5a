/// Split normalized text into ingredient names on commas at parenthesis depth
/// zero, so a sub-ingredient list like "natural flavor (vanilla, caramel)"
/// stays one token. Segments are trimmed; empty segments are dropped; order is
/// preserved.
///
/// Unbalanced input is not rejected: an unclosed "(" swallows the rest of the
/// string into one token, and a stray ")" at depth zero is ignored.
pub fn split_ingredients(cleaned: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth: u32 = 0;

    for c in cleaned.chars() {
        match c {
            '(' => {
                depth += 1;
                current.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                push_segment(&mut parts, &current);
                current.clear();
            }
            _ => current.push(c),
        }
    }
    push_segment(&mut parts, &current);

    parts
}

fn push_segment(parts: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !trimmed.is_empty() {
        parts.push(trimmed.to_string());
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_commas() {
        assert_eq!(split_ingredients("water, sugar, salt"), vec!["water", "sugar", "salt"]);
    }

    #[test]
    fn parenthesized_sublist_stays_whole() {
        assert_eq!(
            split_ingredients("a (b, c), d"),
            vec!["a (b, c)", "d"]
        );
    }

    #[test]
    fn nested_sublist_is_one_ingredient() {
        assert_eq!(
            split_ingredients("emulsifier (e471, e472)"),
            vec!["emulsifier (e471, e472)"]
        );
    }

    #[test]
    fn order_preserved() {
        let parts = split_ingredients("salt, sugar, water");
        assert_eq!(parts, vec!["salt", "sugar", "water"]);
    }

    #[test]
    fn empty_segments_dropped() {
        assert_eq!(split_ingredients(",, water ,  , sugar,"), vec!["water", "sugar"]);
    }

    #[test]
    fn unclosed_paren_swallows_remainder() {
        assert_eq!(
            split_ingredients("flavoring (vanilla, caramel, salt"),
            vec!["flavoring (vanilla, caramel, salt"]
        );
    }

    #[test]
    fn stray_close_paren_does_not_stop_splitting() {
        assert_eq!(
            split_ingredients("water), sugar, salt"),
            vec!["water)", "sugar", "salt"]
        );
    }

    #[test]
    fn empty_input() {
        assert!(split_ingredients("").is_empty());
        assert!(split_ingredients("   ").is_empty());
    }
}
