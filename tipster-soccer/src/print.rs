use stanza::style::HAlign::Left;
use stanza::style::{HAlign, Header, MinWidth, Styles};
use stanza::table::{Col, Row, Table};

use crate::blend::BlendDetail;
use crate::markets::TopScoreline;
use crate::pick::ValueRow;
use crate::predict::Prediction;
use crate::rating::Ratings;

fn header(labels: &[&str]) -> Row {
    Row::new(
        Styles::default().with(Header(true)),
        labels.iter().map(|&label| label.into()).collect(),
    )
}

fn left(min_width: usize) -> Col {
    Col::new(Styles::default().with(MinWidth(min_width)).with(Left))
}

fn right(min_width: usize) -> Col {
    Col::new(Styles::default().with(MinWidth(min_width)).with(HAlign::Right))
}

/// Model and final probabilities of every evaluated selection.
pub fn tabulate_markets(prediction: &Prediction) -> Table {
    let mut table = Table::default()
        .with_cols(vec![left(10), left(24), right(7), right(7)])
        .with_row(header(&["Code", "Selection", "Model", "Final"]));
    for (code, prob) in prediction.markets.entries() {
        let model = prediction.model.get(code).unwrap_or_default();
        table.push_row(Row::new(
            Styles::default(),
            vec![
                code.to_string().into(),
                code.label().into(),
                format!("{:.1}%", model * 100.0).into(),
                format!("{:.1}%", prob * 100.0).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_scorelines(scorelines: &[TopScoreline]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![left(6), right(7)])
        .with_row(header(&["Score", "Prob"]));
    for scoreline in scorelines {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                scoreline.score.to_string().into(),
                format!("{:.2}%", scoreline.probability * 100.0).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_value(rows: &[ValueRow]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![left(10), right(7), right(6), right(6), right(7), right(7), right(6)])
        .with_row(header(&["Code", "Prob", "Odds", "Fair", "Edge", "EV", "Kelly"]));
    for row in rows {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                row.code.to_string().into(),
                format!("{:.1}%", row.probability * 100.0).into(),
                format!("{:.2}", row.price).into(),
                format!("{:.2}", row.fair_price).into(),
                format!("{:+.1}", row.edge * 100.0).into(),
                format!("{:+.1}%", row.expected_value * 100.0).into(),
                format!("{:.3}", row.kelly).into(),
            ],
        ));
    }
    table
}

pub fn tabulate_blend(detail: &[BlendDetail]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![left(10), right(7), right(7), right(7)])
        .with_row(header(&["Code", "Model", "Market", "Blended"]));
    for detail in detail {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                detail.code.to_string().into(),
                format!("{:.1}%", detail.model * 100.0).into(),
                format!("{:.1}%", detail.market * 100.0).into(),
                format!("{:.1}%", detail.blended * 100.0).into(),
            ],
        ));
    }
    table
}

/// Team ratings, strongest attack first.
pub fn tabulate_ratings(ratings: &Ratings) -> Table {
    let mut table = Table::default()
        .with_cols(vec![left(16), right(8), right(8), right(8)])
        .with_row(header(&["Team", "Attack", "Defense", "Fixtures"]));
    let mut teams: Vec<_> = ratings.roster.names().iter().zip(ratings.teams.iter()).collect();
    teams.sort_by(|a, b| b.1.attack.total_cmp(&a.1.attack));
    for (name, team) in teams {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                name.clone().into(),
                format!("{:+.3}", team.attack).into(),
                format!("{:+.3}", team.defense).into(),
                format!("{}", team.fixtures).into(),
            ],
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use stanza::renderer::console::Console;
    use stanza::renderer::Renderer;

    use crate::domain::{MarketCode, Score};

    use super::*;

    #[test]
    fn render_scorelines() {
        let table = tabulate_scorelines(&[
            TopScoreline {
                score: Score::new(1, 0),
                probability: 0.1234,
            },
            TopScoreline {
                score: Score::new(1, 1),
                probability: 0.11,
            },
        ]);
        assert_eq!(3, table.num_rows());
        let rendered = Console::default().render(&table).to_string();
        assert!(rendered.contains("12.34%"), "{rendered}");
        assert!(rendered.contains("1-1"), "{rendered}");
    }

    #[test]
    fn render_value() {
        let table = tabulate_value(&[ValueRow {
            code: MarketCode::Over(2),
            probability: 0.55,
            price: 2.0,
            fair_price: 1.0 / 0.55,
            edge: 0.05,
            expected_value: 0.1,
            kelly: 0.1,
        }]);
        let rendered = Console::default().render(&table).to_string();
        assert!(rendered.contains("O2_5"), "{rendered}");
        assert!(rendered.contains("+10.0%"), "{rendered}");
    }
}
