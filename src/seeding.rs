use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::clinched::ClinchedTiebreakers;
use crate::constants::RUN_ID_STRIDE;
use crate::error::Result;
use crate::game::{GameLog, GameResult};
use crate::standings::Record;
use crate::team::LeagueStructure;
use crate::tiebreak::{TieBreak, TieBreaker};

/// Identifies one trial across all batches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialKey {
    pub job_id: u32,
    pub trial: u32,
}

impl TrialKey {
    pub fn new(job_id: u32, trial: u32) -> Self {
        TrialKey { job_id, trial }
    }

    /// Single-number id used in tabular output
    pub fn run_id(&self) -> u64 {
        self.job_id as u64 * RUN_ID_STRIDE + self.trial as u64
    }
}

/// Final standings of one team in one trial.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StandingsRow {
    pub key: TrialKey,
    pub team: String,
    pub division: String,
    pub league: String,
    pub rating: f64,
    pub wins: u32,
    pub losses: u32,
    pub wpct: f64,
    pub div_win: bool,
    /// Rank within the league, 1 is best
    pub lg_rank: u32,
    /// Position value from tie resolution; larger is better, 0 when untied
    pub tiebreak: u32,
}

impl StandingsRow {
    pub fn record(&self) -> Record {
        Record::new(self.wins, self.losses)
    }
}

/// Inputs shared by every trial in a batch.
#[derive(Clone, Copy, Debug)]
pub struct SeedingContext<'a> {
    pub structure: &'a LeagueStructure,
    pub clinched: &'a ClinchedTiebreakers,
    pub played: &'a [GameResult],
}

/// Memoised tie resolution for one trial.
///
/// A tied set is resolved once, so the division race and the league
/// ranking see the same order even when it was drawn at random.
struct TrialTies<'a> {
    breaker: TieBreaker<'a>,
    resolved: HashMap<Vec<String>, TieBreak>,
}

impl<'a> TrialTies<'a> {
    fn order<R: Rng>(&mut self, mut teams: Vec<String>, rng: &mut R) -> Result<Vec<String>> {
        teams.sort();
        if let Some(tb) = self.resolved.get(&teams) {
            return Ok(tb.order.clone());
        }
        let tb = self.breaker.break_tie(&teams, rng)?;
        let order = tb.order.clone();
        self.resolved.insert(teams, tb);
        Ok(order)
    }
}

/// Assign division winners and league ranks for one trial.
///
/// Every team in the structure gets a row; a team without a record is
/// 0-0. Ties on win percentage are resolved with the trial's played and
/// simulated games.
pub fn seed_trial<R: Rng>(
    key: TrialKey,
    records: &BTreeMap<String, Record>,
    simulated: &[GameResult],
    ctx: &SeedingContext<'_>,
    rng: &mut R,
) -> Result<Vec<StandingsRow>> {
    let mut rows: Vec<StandingsRow> = ctx
        .structure
        .teams()
        .map(|team| {
            let record = records.get(&team.code).copied().unwrap_or_default();
            StandingsRow {
                key,
                team: team.code.clone(),
                division: team.division.clone(),
                league: team.league.clone(),
                rating: team.rating,
                wins: record.wins,
                losses: record.losses,
                wpct: record.win_pct(),
                div_win: false,
                lg_rank: 0,
                tiebreak: 0,
            }
        })
        .collect();

    let mut ties = TrialTies {
        breaker: TieBreaker::new(ctx.structure, ctx.clinched, GameLog::new(ctx.played, simulated)),
        resolved: HashMap::new(),
    };

    add_division_winners(&mut rows, &mut ties, rng)?;
    add_league_ranks(&mut rows, &mut ties, rng)?;
    Ok(rows)
}

fn add_division_winners<R: Rng>(
    rows: &mut [StandingsRow],
    ties: &mut TrialTies<'_>,
    rng: &mut R,
) -> Result<()> {
    let mut best: HashMap<&str, f64> = HashMap::new();
    for row in rows.iter() {
        let entry = best.entry(row.division.as_str()).or_insert(f64::MIN);
        if row.wpct > *entry {
            *entry = row.wpct;
        }
    }

    let mut leaders: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for row in rows.iter() {
        if row.wpct == best[row.division.as_str()] {
            leaders
                .entry(row.division.clone())
                .or_default()
                .push(row.team.clone());
        }
    }

    for (_, tied) in leaders {
        let winner = if tied.len() == 1 {
            tied[0].clone()
        } else {
            ties.order(tied, rng)?.swap_remove(0)
        };
        if let Some(row) = rows.iter_mut().find(|r| r.team == winner) {
            row.div_win = true;
        }
    }

    Ok(())
}

fn add_league_ranks<R: Rng>(
    rows: &mut [StandingsRow],
    ties: &mut TrialTies<'_>,
    rng: &mut R,
) -> Result<()> {
    // Group by (league, wpct); the wpct bits keep equal fractions together
    let mut groups: BTreeMap<(String, u64), Vec<String>> = BTreeMap::new();
    for row in rows.iter() {
        groups
            .entry((row.league.clone(), row.wpct.to_bits()))
            .or_default()
            .push(row.team.clone());
    }

    let mut tiebreak: HashMap<String, u32> = HashMap::new();
    for (_, tied) in groups {
        if tied.len() < 2 {
            continue;
        }
        let order = ties.order(tied, rng)?;
        let n = order.len() as u32;
        for (pos, team) in order.into_iter().enumerate() {
            tiebreak.insert(team, n - pos as u32);
        }
    }
    for row in rows.iter_mut() {
        row.tiebreak = tiebreak.get(&row.team).copied().unwrap_or(0);
    }

    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|&a, &b| {
        let (ra, rb) = (&rows[a], &rows[b]);
        ra.league
            .cmp(&rb.league)
            .then(rb.div_win.cmp(&ra.div_win))
            .then(rb.wpct.total_cmp(&ra.wpct))
            .then(rb.tiebreak.cmp(&ra.tiebreak))
            .then(ra.team.cmp(&rb.team))
    });

    let mut rank = 0;
    let mut league: Option<String> = None;
    for idx in order {
        if league.as_deref() != Some(rows[idx].league.as_str()) {
            league = Some(rows[idx].league.clone());
            rank = 0;
        }
        rank += 1;
        rows[idx].lg_rank = rank;
    }

    Ok(())
}
