use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// A completed game with its final score.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedGame {
    pub game_id: u64,
    pub team1: String,
    pub team2: String,
    pub score1: u32,
    pub score2: u32,
}

impl PlayedGame {
    pub fn new(
        game_id: u64,
        team1: impl Into<String>,
        team2: impl Into<String>,
        score1: u32,
        score2: u32,
    ) -> Self {
        PlayedGame {
            game_id,
            team1: team1.into(),
            team2: team2.into(),
            score1,
            score2,
        }
    }

    /// Winner/loser form of the game. Tied scores are rejected.
    pub fn result(&self) -> Result<GameResult> {
        if self.score1 > self.score2 {
            Ok(GameResult::new(self.team1.clone(), self.team2.clone()))
        } else if self.score2 > self.score1 {
            Ok(GameResult::new(self.team2.clone(), self.team1.clone()))
        } else {
            Err(SimError::TiedScore {
                game_id: self.game_id,
            })
        }
    }
}

/// A scheduled game that has not been played yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemainingGame {
    pub game_id: u64,
    pub team1: String,
    pub team2: String,
}

impl RemainingGame {
    pub fn new(game_id: u64, team1: impl Into<String>, team2: impl Into<String>) -> Self {
        RemainingGame {
            game_id,
            team1: team1.into(),
            team2: team2.into(),
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.team1 == team || self.team2 == team
    }

    /// Result of this game given whether team1 won
    pub fn result(&self, team1_won: bool) -> GameResult {
        if team1_won {
            GameResult::new(self.team1.clone(), self.team2.clone())
        } else {
            GameResult::new(self.team2.clone(), self.team1.clone())
        }
    }
}

/// Outcome of a game, played or simulated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameResult {
    pub winner: String,
    pub loser: String,
}

impl GameResult {
    pub fn new(winner: impl Into<String>, loser: impl Into<String>) -> Self {
        GameResult {
            winner: winner.into(),
            loser: loser.into(),
        }
    }

    pub fn involves(&self, team: &str) -> bool {
        self.winner == team || self.loser == team
    }

    /// True when both participants are members of `teams`
    pub fn is_between<S: AsRef<str>>(&self, teams: &[S]) -> bool {
        let member = |code: &str| teams.iter().any(|t| t.as_ref() == code);
        member(&self.winner) && member(&self.loser)
    }
}

/// Convert played games to results, failing on the first tied score.
pub fn played_results(played: &[PlayedGame]) -> Result<Vec<GameResult>> {
    played.iter().map(PlayedGame::result).collect()
}

/// Number of remaining games played exclusively between members of `teams`
pub fn count_games_between<S: AsRef<str>>(remaining: &[RemainingGame], teams: &[S]) -> usize {
    let member = |code: &str| teams.iter().any(|t| t.as_ref() == code);
    remaining
        .iter()
        .filter(|g| member(&g.team1) && member(&g.team2))
        .count()
}

/// Games seen by the tiebreaker engine for one trial: the played results
/// followed by that trial's simulated results.
#[derive(Clone, Copy, Debug)]
pub struct GameLog<'a> {
    played: &'a [GameResult],
    simulated: &'a [GameResult],
}

impl<'a> GameLog<'a> {
    pub fn new(played: &'a [GameResult], simulated: &'a [GameResult]) -> Self {
        GameLog { played, simulated }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a GameResult> + 'a {
        self.played.iter().chain(self.simulated.iter())
    }

    pub fn len(&self) -> usize {
        self.played.len() + self.simulated.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
