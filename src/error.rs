use thiserror::Error;

/// Errors raised while preparing or running a season simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No remaining games to simulate")]
    NoRemainingGames,

    #[error("Unknown team: {team}")]
    UnknownTeam { team: String },

    #[error("Duplicate team in league structure: {team}")]
    DuplicateTeam { team: String },

    #[error("No rating for team: {team}")]
    MissingRating { team: String },

    #[error("Team {team} has no games")]
    TeamMissingFromGames { team: String },

    #[error("Game {game_id} has tied scores")]
    TiedScore { game_id: u64 },

    #[error("Invalid bracket template: {0}")]
    InvalidBracket(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SimError {
    /// Whether the error comes from the input tables rather than from
    /// configuration or the environment.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            SimError::UnknownTeam { .. }
                | SimError::DuplicateTeam { .. }
                | SimError::MissingRating { .. }
                | SimError::TeamMissingFromGames { .. }
                | SimError::TiedScore { .. }
                | SimError::NoRemainingGames
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
