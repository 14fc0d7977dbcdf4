use crate::aggregate::{SeasonScoreboard, Week};

pub const PLAYER_COLUMN: &str = "Player";
pub const AVERAGE_COLUMN: &str = "Avg. Score";

/// Players by week, with a trailing average. Missing cells are `None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreboardTable {
    pub weeks: Vec<String>,
    pub rows: Vec<ScoreboardRow>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ScoreboardRow {
    pub player: String,
    pub scores: Vec<Option<f64>>,
    pub average: Option<f64>,
}

/// Week columns are numbered relative to the first observed week, starting at 1.
/// Rows are ordered by average score, best first, then by name.
pub fn present(board: &SeasonScoreboard) -> ScoreboardTable {
    let weeks: Vec<Week> = board.weeks().into_iter().collect();

    let labels = match weeks.first() {
        Some(first) => weeks
            .iter()
            .map(|week| {
                let number = week.weeks_since(first).unwrap_or_default() + 1;
                format!("Week {}", number)
            })
            .collect(),
        None => Vec::new(),
    };

    let mut rows: Vec<ScoreboardRow> = board
        .players()
        .map(|player| {
            let totals = board.weekly_totals(player);

            ScoreboardRow {
                player: player.to_owned(),
                scores: weeks.iter().map(|w| totals.get(w).copied()).collect(),
                average: board.average(player),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        let a_avg = a.average.unwrap_or(f64::NEG_INFINITY);
        let b_avg = b.average.unwrap_or(f64::NEG_INFINITY);
        b_avg.total_cmp(&a_avg).then_with(|| a.player.cmp(&b.player))
    });

    ScoreboardTable {
        weeks: labels,
        rows,
    }
}

impl std::fmt::Display for ScoreboardTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cell = |v: &Option<f64>| v.map(|v| format!("{:.2}", v)).unwrap_or_default();

        let header: Vec<&str> = std::iter::once(PLAYER_COLUMN)
            .chain(self.weeks.iter().map(|w| w.as_str()))
            .chain(std::iter::once(AVERAGE_COLUMN))
            .collect();
        let body: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| {
                std::iter::once(row.player.clone())
                    .chain(row.scores.iter().map(cell))
                    .chain(std::iter::once(cell(&row.average)))
                    .collect()
            })
            .collect();

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for line in body.iter() {
            for (width, value) in widths.iter_mut().zip(line.iter()) {
                *width = (*width).max(value.chars().count());
            }
        }

        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        for line in std::iter::once(&header).chain(body.iter()) {
            let mut cells = line.iter().zip(widths.iter().copied());
            if let Some((name, width)) = cells.next() {
                write!(f, "{:<width$}", name, width = width)?;
            }
            for (value, width) in cells {
                write!(f, "  {:>width$}", value, width = width)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
