use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pennant_core::clinched::ClinchedTiebreakers;
use pennant_core::config::SimConfig;
use pennant_core::game::{GameLog, GameResult, PlayedGame, RemainingGame};
use pennant_core::season::{BatchTask, SeasonState};
use pennant_core::team::{LeagueStructure, Team};
use pennant_core::tiebreak::TieBreaker;
use pennant_core::win_prob::{calculate_win_prob, series_win_prob};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn create_30_team_structure() -> LeagueStructure {
    let mut teams = Vec::new();
    for league in ["A", "N"] {
        for div in ["E", "C", "W"] {
            for i in 0..5 {
                let code = format!("{}{}{}", league, div, i);
                let rating = 1440.0 + 30.0 * i as f64;
                teams.push(Team::new(code, format!("{}L{}", league, div), league, rating));
            }
        }
    }
    LeagueStructure::new(teams).unwrap()
}

/// Every pair meets six times; the last two meetings are still to play.
fn create_30_team_season() -> SeasonState {
    let structure = create_30_team_structure();
    let codes: Vec<String> = structure.codes().cloned().collect();

    let mut played = Vec::new();
    let mut remaining = Vec::new();
    let mut id = 0;
    for (i, home) in codes.iter().enumerate() {
        for away in &codes[i + 1..] {
            for meeting in 0..6 {
                id += 1;
                if meeting >= 4 {
                    remaining.push(RemainingGame::new(id, home.as_str(), away.as_str()));
                } else if (id + i as u64) % 2 == 0 {
                    played.push(PlayedGame::new(id, home.as_str(), away.as_str(), 4, 3));
                } else {
                    played.push(PlayedGame::new(id, home.as_str(), away.as_str(), 2, 6));
                }
            }
        }
    }

    SeasonState::new(structure, played, remaining, SimConfig::default()).unwrap()
}

fn bench_calculate_win_prob(c: &mut Criterion) {
    c.bench_function("calculate_win_prob", |b| {
        b.iter(|| calculate_win_prob(black_box(1560.0), black_box(1495.0)))
    });
}

fn bench_series_win_prob(c: &mut Criterion) {
    c.bench_function("series_win_prob_best_of_7", |b| {
        b.iter(|| series_win_prob(black_box(7), black_box(1560.0), black_box(1495.0)))
    });
}

fn bench_break_tie(c: &mut Criterion) {
    let structure = create_30_team_structure();
    let clinched = ClinchedTiebreakers::new();
    let mut games = Vec::new();
    for (w, l) in [("AE0", "AE1"), ("AE1", "AE2"), ("AE2", "AE0"), ("AE0", "AC0"), ("AE1", "AC1")] {
        games.extend(vec![GameResult::new(w, l); 3]);
    }
    let breaker = TieBreaker::new(&structure, &clinched, GameLog::new(&games, &[]));
    let tied: Vec<String> = ["AE0", "AE1", "AE2"].iter().map(|t| t.to_string()).collect();

    c.bench_function("break_tie_three_way_cycle", |b| {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        b.iter(|| breaker.break_tie(black_box(&tied), &mut rng).unwrap())
    });
}

fn bench_simulate_batch(c: &mut Criterion) {
    let season = create_30_team_season();
    let task = BatchTask::new(0, 100, Some(42));

    c.bench_function("simulate_batch_30_teams_100_trials", |b| {
        b.iter(|| black_box(&season).simulate_batch(&task).unwrap())
    });
}

criterion_group!(
    benches,
    bench_calculate_win_prob,
    bench_series_win_prob,
    bench_break_tie,
    bench_simulate_batch,
);
criterion_main!(benches);
