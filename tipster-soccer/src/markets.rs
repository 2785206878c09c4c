//! Reduction of a scoreline grid into named market probabilities.

use serde::{Deserialize, Serialize};

use tipster::linear::matrix::Matrix;

use crate::domain::{MarketCode, Score, Side};

/// Result/total combinations evaluated alongside the primary markets.
pub const COMBOS: [MarketCode; 4] = [
    MarketCode::WinAndUnder(Side::Home, 3),
    MarketCode::WinAndOver(Side::Home, 2),
    MarketCode::WinAndUnder(Side::Away, 3),
    MarketCode::WinAndOver(Side::Away, 2),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopScoreline {
    pub score: Score,
    pub probability: f64,
}

/// Probabilities of every evaluated selection, keyed by market code in evaluation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketProbabilities {
    entries: Vec<(MarketCode, f64)>,
    pub top_scorelines: Vec<TopScoreline>,
}
impl MarketProbabilities {
    pub fn get(&self, code: &MarketCode) -> Option<f64> {
        self.entries
            .iter()
            .find(|(entry_code, _)| entry_code == code)
            .map(|(_, prob)| *prob)
    }

    /// Overwrites the probability of an evaluated selection. Returns `false` if the selection was
    /// not evaluated.
    pub fn set(&mut self, code: &MarketCode, prob: f64) -> bool {
        match self.entries.iter_mut().find(|(entry_code, _)| entry_code == code) {
            Some((_, existing)) => {
                *existing = prob;
                true
            }
            None => false,
        }
    }

    pub fn entries(&self) -> &[(MarketCode, f64)] {
        &self.entries
    }

    pub fn home_win(&self) -> f64 {
        self.get(&MarketCode::HOME).unwrap_or_default()
    }

    pub fn draw(&self) -> f64 {
        self.get(&MarketCode::Draw).unwrap_or_default()
    }

    pub fn away_win(&self) -> f64 {
        self.get(&MarketCode::AWAY).unwrap_or_default()
    }

    pub fn btts(&self) -> f64 {
        self.get(&MarketCode::BttsYes).unwrap_or_default()
    }

    pub fn over(&self, line: u8) -> Option<f64> {
        self.get(&MarketCode::Over(line))
    }

    pub fn under(&self, line: u8) -> Option<f64> {
        self.get(&MarketCode::Under(line))
    }

    /// The total-goals lines evaluated, in ascending order.
    pub fn lines(&self) -> Vec<u8> {
        self.entries
            .iter()
            .filter_map(|(code, _)| match code {
                MarketCode::Over(line) => Some(*line),
                _ => None,
            })
            .collect()
    }

    /// Recomputes the derived selections (double chance, unders, BTTS no) from their primaries,
    /// after the primaries have been altered.
    pub fn rederive(&mut self) {
        let (home_win, draw, away_win) = (self.home_win(), self.draw(), self.away_win());
        self.set(&MarketCode::HomeOrDraw, home_win + draw);
        self.set(&MarketCode::HomeOrAway, home_win + away_win);
        self.set(&MarketCode::DrawOrAway, draw + away_win);
        for line in self.lines() {
            if let Some(over) = self.over(line) {
                self.set(&MarketCode::Under(line), 1.0 - over);
            }
        }
        let btts = self.btts();
        self.set(&MarketCode::BttsNo, 1.0 - btts);
    }
}

impl MarketCode {
    /// Sums the grid over the scorelines that settle this selection as a winner.
    pub fn gather(&self, scoregrid: &Matrix<f64>) -> f64 {
        let mut prob = 0.0;
        for ((home_goals, away_goals), &cell) in scoregrid.cells() {
            if self.wins(home_goals, away_goals) {
                prob += cell;
            }
        }
        prob
    }

    fn wins(&self, home_goals: usize, away_goals: usize) -> bool {
        let total = home_goals + away_goals;
        match self {
            MarketCode::Win(Side::Home) => home_goals > away_goals,
            MarketCode::Win(Side::Away) => home_goals < away_goals,
            MarketCode::Draw => home_goals == away_goals,
            MarketCode::HomeOrDraw => home_goals >= away_goals,
            MarketCode::HomeOrAway => home_goals != away_goals,
            MarketCode::DrawOrAway => home_goals <= away_goals,
            MarketCode::Over(line) => total > *line as usize,
            MarketCode::Under(line) => total <= *line as usize,
            MarketCode::BttsYes => home_goals > 0 && away_goals > 0,
            MarketCode::BttsNo => home_goals == 0 || away_goals == 0,
            MarketCode::WinAndUnder(side, line) => {
                MarketCode::Win(*side).wins(home_goals, away_goals) && total <= *line as usize
            }
            MarketCode::WinAndOver(side, line) => {
                MarketCode::Win(*side).wins(home_goals, away_goals) && total > *line as usize
            }
        }
    }
}

/// Aggregates the grid into 1X2, double chance, the given total-goals `lines`, BTTS and the
/// result/total combos, along with the `top_n` most probable scorelines.
pub fn aggregate(scoregrid: &Matrix<f64>, lines: &[u8], top_n: usize) -> MarketProbabilities {
    let home_win = MarketCode::HOME.gather(scoregrid);
    let draw = MarketCode::Draw.gather(scoregrid);
    let away_win = MarketCode::AWAY.gather(scoregrid);
    let btts = MarketCode::BttsYes.gather(scoregrid);

    let mut entries = Vec::with_capacity(8 + lines.len() * 2 + COMBOS.len());
    entries.push((MarketCode::HOME, home_win));
    entries.push((MarketCode::Draw, draw));
    entries.push((MarketCode::AWAY, away_win));
    entries.push((MarketCode::HomeOrDraw, home_win + draw));
    entries.push((MarketCode::HomeOrAway, home_win + away_win));
    entries.push((MarketCode::DrawOrAway, draw + away_win));

    let mut sorted_lines = lines.to_vec();
    sorted_lines.sort_unstable();
    sorted_lines.dedup();
    for line in sorted_lines {
        let over = MarketCode::Over(line).gather(scoregrid);
        entries.push((MarketCode::Over(line), over));
        entries.push((MarketCode::Under(line), 1.0 - over));
    }

    entries.push((MarketCode::BttsYes, btts));
    entries.push((MarketCode::BttsNo, 1.0 - btts));
    for combo in COMBOS {
        entries.push((combo, combo.gather(scoregrid)));
    }

    MarketProbabilities {
        entries,
        top_scorelines: top_scorelines(scoregrid, top_n),
    }
}

/// The `n` most probable scorelines, ordered by descending probability. Ties are broken in favour
/// of fewer total goals, then fewer home goals.
pub fn top_scorelines(scoregrid: &Matrix<f64>, n: usize) -> Vec<TopScoreline> {
    let mut scorelines: Vec<_> = scoregrid
        .cells()
        .map(|((home_goals, away_goals), &probability)| TopScoreline {
            score: Score::new(home_goals as u8, away_goals as u8),
            probability,
        })
        .collect();
    scorelines.sort_by(|a, b| {
        b.probability
            .total_cmp(&a.probability)
            .then(a.score.total().cmp(&b.score.total()))
            .then(a.score.home.cmp(&b.score.home))
    });
    scorelines.truncate(n);
    scorelines
}

#[cfg(test)]
mod tests {
    use assert_float_eq::*;
    use tipster::probs::SliceExt;

    use crate::scoregrid::{dixon_coles_grid, Intensities};

    use super::*;

    fn create_test_4x4_scoregrid() -> Matrix<f64> {
        let mut scoregrid = Matrix::allocate(4, 4);
        scoregrid[0].copy_from_slice(&[0.04, 0.03, 0.02, 0.01]);
        scoregrid[1].copy_from_slice(&[0.08, 0.12, 0.06, 0.04]);
        scoregrid[2].copy_from_slice(&[0.12, 0.09, 0.10, 0.03]);
        scoregrid[3].copy_from_slice(&[0.06, 0.08, 0.07, 0.05]);
        scoregrid
    }

    #[test]
    fn gather_4x4() {
        let scoregrid = create_test_4x4_scoregrid();
        assert_float_absolute_eq!(1.0, scoregrid.flatten().sum(), 1e-12);
        assert_float_absolute_eq!(0.50, MarketCode::HOME.gather(&scoregrid), 1e-12);
        assert_float_absolute_eq!(0.31, MarketCode::Draw.gather(&scoregrid), 1e-12);
        assert_float_absolute_eq!(0.19, MarketCode::AWAY.gather(&scoregrid), 1e-12);
        assert_float_absolute_eq!(0.41, MarketCode::Under(2).gather(&scoregrid), 1e-12);
        assert_float_absolute_eq!(0.59, MarketCode::Over(2).gather(&scoregrid), 1e-12);
        assert_float_absolute_eq!(0.64, MarketCode::BttsYes.gather(&scoregrid), 1e-12);
        assert_float_absolute_eq!(
            0.20,
            MarketCode::WinAndUnder(Side::Home, 2).gather(&scoregrid),
            1e-12
        );
        assert_float_absolute_eq!(
            0.30,
            MarketCode::WinAndOver(Side::Home, 2).gather(&scoregrid),
            1e-12
        );
    }

    #[test]
    fn aggregate_invariants() {
        for (home, away, rho) in [(1.5, 1.1, -0.08), (0.4, 2.7, 0.05), (3.2, 0.3, 0.0)] {
            let scoregrid = dixon_coles_grid(&Intensities { home, away }, rho, 10);
            let probs = aggregate(&scoregrid, &[1, 2, 3], 10);
            let result = probs.home_win() + probs.draw() + probs.away_win();
            assert_float_absolute_eq!(1.0, result, 1e-9);
            for line in [1, 2, 3] {
                let total = probs.over(line).unwrap() + probs.under(line).unwrap();
                assert_float_absolute_eq!(1.0, total, 1e-12);
            }
            assert_float_absolute_eq!(
                1.0,
                probs.btts() + probs.get(&MarketCode::BttsNo).unwrap(),
                1e-12
            );
            for (code, prob) in probs.entries() {
                assert!((-1e-12..=1.0 + 1e-12).contains(prob), "{code}: {prob}");
            }
            assert_float_absolute_eq!(
                probs.home_win() + probs.draw(),
                probs.get(&MarketCode::HomeOrDraw).unwrap(),
                1e-12
            );
        }
    }

    #[test]
    fn aggregate_lines_sorted_and_deduplicated() {
        let scoregrid = create_test_4x4_scoregrid();
        let probs = aggregate(&scoregrid, &[3, 1, 3], 3);
        assert_eq!(vec![1, 3], probs.lines());
        assert_eq!(None, probs.over(2));
        assert_eq!(3, probs.top_scorelines.len());
    }

    #[test]
    fn top_scorelines_ordering() {
        let scoregrid = create_test_4x4_scoregrid();
        let top = top_scorelines(&scoregrid, 4);
        let scores: Vec<_> = top.iter().map(|scoreline| scoreline.score.to_string()).collect();
        // 1-1 and 2-0 tie at 0.12; the tie goes to the fewer home goals at the same total
        assert_eq!(vec!["1-1", "2-0", "2-2", "2-1"], scores);
        assert_float_absolute_eq!(0.12, top[0].probability, 1e-12);
    }

    #[test]
    fn rederive_after_update() {
        let scoregrid = create_test_4x4_scoregrid();
        let mut probs = aggregate(&scoregrid, &[2], 5);
        assert!(probs.set(&MarketCode::HOME, 0.5));
        assert!(probs.set(&MarketCode::Draw, 0.3));
        assert!(probs.set(&MarketCode::AWAY, 0.2));
        assert!(probs.set(&MarketCode::Over(2), 0.6));
        assert!(!probs.set(&MarketCode::Over(4), 0.6));
        probs.rederive();
        assert_float_absolute_eq!(0.8, probs.get(&MarketCode::HomeOrDraw).unwrap(), 1e-12);
        assert_float_absolute_eq!(0.4, probs.under(2).unwrap(), 1e-12);
    }
}
