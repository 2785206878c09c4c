use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::error::{InvalidOdds, UnknownMarketCode};

#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Score {
    pub home: u8,
    pub away: u8,
}
impl Score {
    pub fn new(home: u8, away: u8) -> Self {
        Self { home, away }
    }

    pub fn total(&self) -> u16 {
        self.home as u16 + self.away as u16
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.home, self.away)
    }
}

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Home,
    Away,
}

/// A completed fixture.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub home_goals: u8,
    pub away_goals: u8,
}
impl MatchRecord {
    pub fn score(&self) -> Score {
        Score::new(self.home_goals, self.away_goals)
    }
}

/// A selection that can be priced. Total-goals lines are half-integers: `Over(2)` is over 2.5
/// goals (a total of at least 3) and `Under(2)` is under 2.5 goals (a total of at most 2).
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MarketCode {
    Win(Side),
    Draw,
    HomeOrDraw,
    HomeOrAway,
    DrawOrAway,
    Over(u8),
    Under(u8),
    BttsYes,
    BttsNo,
    WinAndUnder(Side, u8),
    WinAndOver(Side, u8),
}
impl MarketCode {
    pub const HOME: MarketCode = MarketCode::Win(Side::Home);
    pub const AWAY: MarketCode = MarketCode::Win(Side::Away);

    pub fn kind(&self) -> MarketKind {
        match self {
            MarketCode::Win(_) | MarketCode::Draw => MarketKind::MatchResult,
            MarketCode::HomeOrDraw | MarketCode::HomeOrAway | MarketCode::DrawOrAway => {
                MarketKind::DoubleChance
            }
            MarketCode::Over(_) | MarketCode::Under(_) => MarketKind::TotalGoals,
            MarketCode::BttsYes | MarketCode::BttsNo => MarketKind::BothTeamsToScore,
            MarketCode::WinAndUnder(_, _) | MarketCode::WinAndOver(_, _) => MarketKind::Combo,
        }
    }

    /// The complementary selection of a two-way market.
    pub fn complement(&self) -> Option<MarketCode> {
        match self {
            MarketCode::Over(line) => Some(MarketCode::Under(*line)),
            MarketCode::Under(line) => Some(MarketCode::Over(*line)),
            MarketCode::BttsYes => Some(MarketCode::BttsNo),
            MarketCode::BttsNo => Some(MarketCode::BttsYes),
            _ => None,
        }
    }

    /// A human-readable name of the selection.
    pub fn label(&self) -> String {
        match self {
            MarketCode::Win(Side::Home) => "Home win".into(),
            MarketCode::Win(Side::Away) => "Away win".into(),
            MarketCode::Draw => "Draw".into(),
            MarketCode::HomeOrDraw => "Home or draw".into(),
            MarketCode::HomeOrAway => "Home or away".into(),
            MarketCode::DrawOrAway => "Draw or away".into(),
            MarketCode::Over(line) => format!("Over {line}.5 goals"),
            MarketCode::Under(line) => format!("Under {line}.5 goals"),
            MarketCode::BttsYes => "Both teams to score".into(),
            MarketCode::BttsNo => "Not both teams to score".into(),
            MarketCode::WinAndUnder(side, line) => {
                format!("{} & under {line}.5 goals", side_label(side))
            }
            MarketCode::WinAndOver(side, line) => {
                format!("{} & over {line}.5 goals", side_label(side))
            }
        }
    }
}

fn side_label(side: &Side) -> &'static str {
    match side {
        Side::Home => "Home win",
        Side::Away => "Away win",
    }
}

fn side_code(side: &Side) -> &'static str {
    match side {
        Side::Home => "1",
        Side::Away => "2",
    }
}

impl Display for MarketCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MarketCode::Win(side) => write!(f, "{}", side_code(side)),
            MarketCode::Draw => write!(f, "X"),
            MarketCode::HomeOrDraw => write!(f, "1X"),
            MarketCode::HomeOrAway => write!(f, "12"),
            MarketCode::DrawOrAway => write!(f, "X2"),
            MarketCode::Over(line) => write!(f, "O{line}_5"),
            MarketCode::Under(line) => write!(f, "U{line}_5"),
            MarketCode::BttsYes => write!(f, "BTTS_YES"),
            MarketCode::BttsNo => write!(f, "BTTS_NO"),
            MarketCode::WinAndUnder(side, line) => write!(f, "{}_&_U{line}_5", side_code(side)),
            MarketCode::WinAndOver(side, line) => write!(f, "{}_&_O{line}_5", side_code(side)),
        }
    }
}

/// Parses the `{n}_5` (or `{n}.5`) half-integer suffix of a totals code, yielding `n`.
fn parse_line(s: &str) -> Option<u8> {
    let whole = s.strip_suffix("_5").or_else(|| s.strip_suffix(".5"))?;
    whole.parse().ok()
}

fn parse_totals(s: &str) -> Option<MarketCode> {
    if let Some(line) = s.strip_prefix('O') {
        parse_line(line).map(MarketCode::Over)
    } else if let Some(line) = s.strip_prefix('U') {
        parse_line(line).map(MarketCode::Under)
    } else {
        None
    }
}

impl FromStr for MarketCode {
    type Err = UnknownMarketCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_uppercase();
        let code = match normalised.as_str() {
            "1" => Some(MarketCode::HOME),
            "X" => Some(MarketCode::Draw),
            "2" => Some(MarketCode::AWAY),
            "1X" => Some(MarketCode::HomeOrDraw),
            "12" => Some(MarketCode::HomeOrAway),
            "X2" => Some(MarketCode::DrawOrAway),
            "BTTS_YES" | "BTTS" => Some(MarketCode::BttsYes),
            "BTTS_NO" | "NOBTTS" => Some(MarketCode::BttsNo),
            other => match other.split_once("_&_") {
                Some((result, totals)) => {
                    let side = match result {
                        "1" => Some(Side::Home),
                        "2" => Some(Side::Away),
                        _ => None,
                    };
                    side.zip(parse_totals(totals)).and_then(|(side, totals)| match totals {
                        MarketCode::Over(line) => Some(MarketCode::WinAndOver(side, line)),
                        MarketCode::Under(line) => Some(MarketCode::WinAndUnder(side, line)),
                        _ => None,
                    })
                }
                None => parse_totals(other),
            },
        };
        code.ok_or_else(|| UnknownMarketCode(s.to_string()))
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    Serialize,
    Deserialize,
)]
pub enum MarketKind {
    #[strum(serialize = "1X2")]
    MatchResult,
    #[strum(serialize = "double chance")]
    DoubleChance,
    #[strum(serialize = "total goals")]
    TotalGoals,
    #[strum(serialize = "BTTS")]
    BothTeamsToScore,
    #[strum(serialize = "combo")]
    Combo,
}

/// Decimal odds quoted by a bookmaker for a single request. Entries that cannot be used are
/// retained as rejections rather than failing the whole quote.
#[derive(Clone, Debug, Default)]
pub struct OddsQuote {
    prices: FxHashMap<MarketCode, f64>,
    rejected: Vec<InvalidOdds>,
}
impl OddsQuote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a price for the given code, rejecting it unless it is finite and greater than 1.0.
    pub fn insert(&mut self, code: MarketCode, price: f64) {
        if price.is_finite() && price > 1.0 {
            self.prices.insert(code, price);
        } else {
            self.rejected.push(InvalidOdds::OutOfRange { code, price });
        }
    }

    pub fn insert_raw(&mut self, code: &str, price: f64) {
        match code.parse() {
            Ok(code) => self.insert(code, price),
            Err(UnknownMarketCode(code)) => self.rejected.push(InvalidOdds::Malformed {
                entry: format!("{code}={price}"),
            }),
        }
    }

    /// Parses a comma-separated list of `code=price` pairs, such as `1=2.1,X=3.3,O2_5=1.9`.
    pub fn parse(s: &str) -> Self {
        let mut quote = Self::new();
        for entry in s.split(',').map(str::trim).filter(|entry| !entry.is_empty()) {
            match entry.split_once('=') {
                Some((code, price)) => match price.trim().parse::<f64>() {
                    Ok(price) => quote.insert_raw(code, price),
                    Err(_) => quote.rejected.push(InvalidOdds::Malformed {
                        entry: entry.to_string(),
                    }),
                },
                None => quote.rejected.push(InvalidOdds::Malformed {
                    entry: entry.to_string(),
                }),
            }
        }
        quote
    }

    pub fn price(&self, code: &MarketCode) -> Option<f64> {
        self.prices.get(code).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Quoted prices, ordered by market code.
    pub fn prices(&self) -> Vec<(MarketCode, f64)> {
        let mut prices: Vec<_> = self.prices.iter().map(|(code, price)| (*code, *price)).collect();
        prices.sort_by(|a, b| a.0.cmp(&b.0));
        prices
    }

    pub fn rejected(&self) -> &[InvalidOdds] {
        &self.rejected
    }
}

impl<S: AsRef<str>> FromIterator<(S, f64)> for OddsQuote {
    fn from_iter<T: IntoIterator<Item = (S, f64)>>(iter: T) -> Self {
        let mut quote = Self::new();
        for (code, price) in iter {
            quote.insert_raw(code.as_ref(), price);
        }
        quote
    }
}
