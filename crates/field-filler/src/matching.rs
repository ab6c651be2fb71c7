//! Fuzzy matching of free-text answers onto closed option sets.
//!
//! Scoring rule: 0.9 when either lowercased string contains the other,
//! otherwise a normalized edit-similarity ratio; the best candidate wins
//! and is accepted only at or above 0.6. The substring short-circuit and
//! the threshold are tuned values; changing them changes which near-miss
//! answers land.

pub const SUBSTRING_SCORE: f64 = 0.9;
pub const MATCH_THRESHOLD: f64 = 0.6;

/// Best-scoring option for `target`, if any candidate clears the
/// acceptance threshold. Ties keep the earliest option.
pub fn best_match<'a>(target: &str, options: &'a [String]) -> Option<&'a str> {
    let target_lower = target.to_lowercase();

    let mut best: Option<&str> = None;
    let mut best_score = 0.0_f64;

    for option in options {
        let option_lower = option.to_lowercase();

        let score = if target_lower.contains(&option_lower) || option_lower.contains(&target_lower)
        {
            SUBSTRING_SCORE
        } else {
            similarity_ratio(&target_lower, &option_lower)
        };

        if score > best_score {
            best_score = score;
            best = Some(option.as_str());
        }
    }

    if best_score >= MATCH_THRESHOLD {
        best
    } else {
        None
    }
}

/// Normalized edit similarity: `1 - levenshtein(a, b) / max(len)`.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max_len = a_chars.len().max(b_chars.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a_chars, &b_chars) as f64 / max_len as f64
}

fn levenshtein(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution_cost = if ca == cb { 0 } else { 1 };
            current[j + 1] = (previous[j] + substitution_cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        previous.copy_from_slice(&current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn substring_relation_short_circuits_at_0_9() {
        let opts = options(&["United States of America", "Canada"]);
        assert_eq!(
            best_match("United States", &opts),
            Some("United States of America")
        );
        // works in both directions
        let opts = options(&["USA"]);
        assert_eq!(best_match("usa (citizen)", &opts), Some("USA"));
    }

    #[test]
    fn usa_against_country_names_does_not_fire() {
        // no substring relation, and the edit ratio is far below threshold
        let opts = options(&["United States", "United Kingdom"]);
        assert_eq!(best_match("USA", &opts), None);
    }

    #[test]
    fn case_insensitive_equality_is_a_perfect_match() {
        let opts = options(&["Yes", "No", "Prefer not to say"]);
        assert_eq!(best_match("yes", &opts), Some("Yes"));
        assert_eq!(best_match("PREFER NOT TO SAY", &opts), Some("Prefer not to say"));
    }

    #[test]
    fn threshold_boundary_at_0_6() {
        let base = "a".repeat(100);

        // 41 substitutions: ratio 0.59, below threshold
        let mut below = vec!['a'; 100];
        for slot in below.iter_mut().take(41) {
            *slot = 'b';
        }
        let below: String = below.into_iter().collect();
        assert!((similarity_ratio(&base, &below) - 0.59).abs() < 1e-9);
        assert_eq!(best_match(&base, &options(&[below.as_str()])), None);

        // 39 substitutions: ratio 0.61, accepted
        let mut above = vec!['a'; 100];
        for slot in above.iter_mut().take(39) {
            *slot = 'b';
        }
        let above: String = above.into_iter().collect();
        assert!((similarity_ratio(&base, &above) - 0.61).abs() < 1e-9);
        assert_eq!(
            best_match(&base, &options(&[above.as_str()])).map(str::to_string),
            Some(above)
        );
    }

    #[test]
    fn exact_boundary_value_is_accepted() {
        // 4 substitutions over length 10: ratio exactly 0.6
        let target = "aaaaaaaaaa";
        let candidate = "bbbbaaaaaa";
        assert!((similarity_ratio(target, candidate) - 0.6).abs() < 1e-9);
        assert_eq!(
            best_match(target, &options(&[candidate])),
            Some("bbbbaaaaaa")
        );
    }

    #[test]
    fn ties_keep_the_earliest_option() {
        let opts = options(&["Yes", "yes"]);
        assert_eq!(best_match("YES", &opts), Some("Yes"));
    }

    #[test]
    fn empty_options_never_match() {
        assert_eq!(best_match("anything", &[]), None);
    }

    #[test]
    fn levenshtein_spot_checks() {
        assert_eq!(similarity_ratio("docker", "docker"), 1.0);
        assert!((similarity_ratio("docker", "doker") - (1.0 - 1.0 / 6.0)).abs() < 1e-9);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", ""), 0.0);
    }
}
