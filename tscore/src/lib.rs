//! Score aggregation over a record stream.
//!
//! Input is one record per line, `id,value,owner`. Unowned records carry
//! the literal owner `none` and do not score. Malformed lines are skipped
//! with a diagnostic rather than aborting the run.

use std::fmt::Write as _;

/// Per-owner totals, in order of first appearance in the input.
pub fn reduce(input: &str) -> Vec<(String, i64)> {
    let mut totals: Vec<(String, i64)> = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.splitn(3, ',');
        let (Some(_id), Some(value), Some(owner)) =
            (fields.next(), fields.next(), fields.next())
        else {
            tracing::warn!(line = lineno + 1, "skipping malformed record");
            continue;
        };
        let Ok(value) = value.trim().parse::<i64>() else {
            tracing::warn!(line = lineno + 1, "skipping record with non-numeric value");
            continue;
        };
        let owner = owner.trim();
        if owner.is_empty() || owner == "none" {
            continue;
        }
        match totals.iter_mut().find(|(name, _)| name == owner) {
            Some((_, total)) => *total += value,
            None => totals.push((owner.to_string(), value)),
        }
    }
    totals
}

pub fn render(totals: &[(String, i64)]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "===== USER SCORES =====");
    if totals.is_empty() {
        let _ = writeln!(out, "No users with items found in this hunt.");
        return out;
    }
    for (owner, total) in totals {
        let _ = writeln!(out, "{owner}: {total} points");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_per_owner_in_first_seen_order() {
        let totals = reduce("1,10,alice\n2,5,bob\n3,7,alice\n");
        assert_eq!(
            totals,
            vec![("alice".to_string(), 17), ("bob".to_string(), 5)]
        );
    }

    #[test]
    fn skips_unowned_and_malformed_records() {
        let totals = reduce("1,10,none\n2,not-a-number,bob\nbare line\n3,4,carol\n\n");
        assert_eq!(totals, vec![("carol".to_string(), 4)]);
    }

    #[test]
    fn negative_values_subtract() {
        let totals = reduce("1,10,alice\n2,-3,alice\n");
        assert_eq!(totals, vec![("alice".to_string(), 7)]);
    }

    #[test]
    fn render_formats_header_and_points() {
        let text = render(&[("alice".to_string(), 17)]);
        assert_eq!(text, "===== USER SCORES =====\nalice: 17 points\n");
    }

    #[test]
    fn render_reports_empty_hunt() {
        let text = render(&[]);
        assert_eq!(
            text,
            "===== USER SCORES =====\nNo users with items found in this hunt.\n"
        );
    }
}
