//! Stat-column discovery for per-player tables.

/// A stat and the label fragments providers use for it.
#[derive(Debug, Clone, Copy)]
pub struct StatSemantic {
    pub name: &'static str,
    needles: &'static [&'static str],
}

pub const POINTS: StatSemantic = StatSemantic {
    name: "points",
    needles: &["pts", "points"],
};

impl StatSemantic {
    /// Index of the column for this stat. Exact (case-insensitive) label
    /// matches win over substring matches, so `PTS` is preferred over
    /// `PTS_PLAYER_NAME` when both are present.
    pub fn find_column<'a, I>(&self, labels: I) -> Option<usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let labels: Vec<String> = labels.into_iter().map(|l| l.trim().to_lowercase()).collect();

        labels
            .iter()
            .position(|l| self.needles.iter().any(|n| l == n))
            .or_else(|| {
                labels
                    .iter()
                    .position(|l| self.needles.iter().any(|n| l.contains(n)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_espn_points_label() {
        let labels = ["MIN", "FG", "3PT", "FT", "REB", "AST", "PTS"];
        assert_eq!(POINTS.find_column(labels), Some(6));
    }

    #[test]
    fn test_case_and_phrasing_vary() {
        assert_eq!(POINTS.find_column(["Min", "Total Points"]), Some(1));
        assert_eq!(POINTS.find_column(["min", "pts"]), Some(1));
    }

    #[test]
    fn test_exact_match_beats_substring() {
        let labels = ["GAME_ID", "PTS_PLAYER_NAME", "PTS"];
        assert_eq!(POINTS.find_column(labels), Some(2));
    }

    #[test]
    fn test_no_points_column() {
        assert_eq!(POINTS.find_column(["MIN", "REB", "3PT"]), None);
    }
}
