//! Picks the canonical policy link among the candidates

use crate::types::LinkCandidate;

/// Terms in decreasing order of preference
pub const PRIORITY_TERMS: [&str; 5] = ["privacy", "cookie", "terms", "policy", "legal"];

/// Select exactly one candidate.
///
/// For each priority term in order, the first candidate whose text contains
/// it (case-insensitive) wins. Without any match the first candidate is
/// returned. `None` only for an empty input.
pub fn select_link(candidates: &[LinkCandidate]) -> Option<&LinkCandidate> {
    let lowered: Vec<String> = candidates.iter().map(|c| c.text.to_lowercase()).collect();

    PRIORITY_TERMS
        .iter()
        .find_map(|term| {
            lowered
                .iter()
                .position(|text| text.contains(term))
                .map(|i| &candidates[i])
        })
        .or_else(|| candidates.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn link(text: &str, href: &str) -> LinkCandidate {
        LinkCandidate {
            text: text.to_string(),
            href: Url::parse(href).unwrap(),
        }
    }

    #[test]
    fn test_privacy_beats_terms() {
        let candidates = vec![
            link("Privacy Policy", "https://x.com/privacy"),
            link("Terms", "https://x.com/terms"),
        ];
        assert_eq!(select_link(&candidates).unwrap().href.as_str(), "https://x.com/privacy");
    }

    #[test]
    fn test_priority_ignores_input_order() {
        let candidates = vec![
            link("Legal notice", "https://x.com/legal"),
            link("Terms of use", "https://x.com/terms"),
            link("Cookie preferences", "https://x.com/cookies"),
            link("Your PRIVACY choices", "https://x.com/choices"),
        ];
        assert_eq!(select_link(&candidates).unwrap().text, "Your PRIVACY choices");

        let without_privacy = &candidates[..3];
        assert_eq!(select_link(without_privacy).unwrap().text, "Cookie preferences");
    }

    #[test]
    fn test_first_match_of_term_wins() {
        let candidates = vec![
            link("Cookie policy", "https://x.com/a"),
            link("Cookie settings", "https://x.com/b"),
        ];
        assert_eq!(select_link(&candidates).unwrap().href.as_str(), "https://x.com/a");
    }

    #[test]
    fn test_fallback_to_first() {
        let candidates = vec![
            link("Impressum", "https://x.de/impressum"),
            link("Datenschutz", "https://x.de/datenschutz"),
        ];
        assert_eq!(select_link(&candidates).unwrap().text, "Impressum");
    }

    #[test]
    fn test_empty_has_no_selection() {
        assert!(select_link(&[]).is_none());
    }

    #[test]
    fn test_selection_is_member_of_input() {
        let texts = ["A", "legal stuff", "b policy", "terms", "x"];
        for start in 0..texts.len() {
            let mut rotated = texts.to_vec();
            rotated.rotate_left(start);
            let candidates: Vec<LinkCandidate> = rotated
                .iter()
                .enumerate()
                .map(|(i, t)| link(t, &format!("https://x.com/{}", i)))
                .collect();
            let chosen = select_link(&candidates).unwrap();
            assert!(candidates.contains(chosen));
            assert_eq!(chosen.text, "terms");
        }
    }
}
