//! Tournament, participant and match data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tournament ID type
pub type TournamentId = i64;

/// Participant ID type
pub type ParticipantId = i64;

/// Match ID type
pub type MatchId = i64;

/// Default capacity for tournaments created without an explicit bound
pub const DEFAULT_MAX_PARTICIPANTS: i32 = 8;

/// Tournament lifecycle status.
///
/// `Setup -> Active` on bracket generation, `Active -> Completed` once the
/// final match has a winner. `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Accepting participants, no bracket yet
    Setup,
    /// Bracket generated, matches being played
    Active,
    /// Final match decided
    Completed,
}

impl TournamentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentStatus::Setup => "setup",
            TournamentStatus::Active => "active",
            TournamentStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TournamentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "setup" => Ok(TournamentStatus::Setup),
            "active" => Ok(TournamentStatus::Active),
            "completed" => Ok(TournamentStatus::Completed),
            other => Err(format!("unknown tournament status: {other}")),
        }
    }
}

/// Bracket format requested for a tournament.
///
/// Only single elimination is played. `DoubleElimination` is accepted and
/// stored for compatibility but brackets are always built as single
/// elimination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentFormat {
    #[default]
    SingleElimination,
    DoubleElimination,
}

impl TournamentFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TournamentFormat::SingleElimination => "single_elimination",
            TournamentFormat::DoubleElimination => "double_elimination",
        }
    }

    /// The format the engine actually builds
    pub fn effective(self) -> TournamentFormat {
        TournamentFormat::SingleElimination
    }
}

impl FromStr for TournamentFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_elimination" => Ok(TournamentFormat::SingleElimination),
            "double_elimination" => Ok(TournamentFormat::DoubleElimination),
            other => Err(format!("unknown tournament type: {other}")),
        }
    }
}

/// Participant registration status. Only approved participants count toward
/// capacity and enter the bracket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantStatus {
    Pending,
    #[default]
    Approved,
}

impl ParticipantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ParticipantStatus::Pending => "pending",
            ParticipantStatus::Approved => "approved",
        }
    }
}

impl FromStr for ParticipantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ParticipantStatus::Pending),
            "approved" => Ok(ParticipantStatus::Approved),
            other => Err(format!("unknown participant status: {other}")),
        }
    }
}

/// Tournament row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    /// Upper bound on approved participants
    pub max_participants: i32,
    #[serde(rename = "tournament_type")]
    pub format: TournamentFormat,
    pub status: TournamentStatus,
    /// Gate checked by callers before result changes; the engine ignores it
    pub is_paused: bool,
    pub created_at: DateTime<Utc>,
}

/// Tournament creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTournament {
    pub name: String,
    pub start_date: DateTime<Utc>,
    #[serde(default = "default_max_participants")]
    pub max_participants: i32,
    #[serde(default, rename = "tournament_type")]
    pub format: TournamentFormat,
}

fn default_max_participants() -> i32 {
    DEFAULT_MAX_PARTICIPANTS
}

impl NewTournament {
    /// Single-elimination tournament with the default capacity
    pub fn new(name: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            start_date,
            max_participants: DEFAULT_MAX_PARTICIPANTS,
            format: TournamentFormat::SingleElimination,
        }
    }

    pub fn with_max_participants(mut self, max_participants: i32) -> Self {
        self.max_participants = max_participants;
        self
    }

    pub fn with_format(mut self, format: TournamentFormat) -> Self {
        self.format = format;
        self
    }
}

/// Tournament with its approved participant count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentInfo {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub participant_count: i64,
}

/// Participant row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    pub tournament_id: TournamentId,
    /// Optional link to an external user account
    pub user_id: Option<i64>,
    pub name: String,
    /// 1-based rank; assigned at bracket generation when missing
    pub seed: Option<i32>,
    pub status: ParticipantStatus,
    pub created_at: DateTime<Utc>,
}

/// Participant registration request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewParticipant {
    pub name: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub seed: Option<i32>,
    #[serde(default)]
    pub status: ParticipantStatus,
}

impl NewParticipant {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            user_id: None,
            seed: None,
            status: ParticipantStatus::Approved,
        }
    }

    pub fn with_seed(mut self, seed: i32) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn pending(mut self) -> Self {
        self.status = ParticipantStatus::Pending;
        self
    }
}

/// Which side of a match a participant occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    First,
    Second,
}

/// A bracket node.
///
/// Match `m` of round `r` is fed by matches `2m - 1` and `2m` of round
/// `r - 1`, and its winner moves to match `ceil(m / 2)` of round `r + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    pub round: i32,
    pub match_number: i32,
    pub participant1_id: Option<ParticipantId>,
    pub participant2_id: Option<ParticipantId>,
    pub winner_id: Option<ParticipantId>,
    pub score: Option<String>,
}

impl Match {
    /// Both sides are known
    pub fn is_ready(&self) -> bool {
        self.participant1_id.is_some() && self.participant2_id.is_some()
    }

    pub fn is_decided(&self) -> bool {
        self.winner_id.is_some()
    }

    pub fn has_participant(&self, participant_id: ParticipantId) -> bool {
        self.participant1_id == Some(participant_id) || self.participant2_id == Some(participant_id)
    }

    pub fn slot(&self, slot: Slot) -> Option<ParticipantId> {
        match slot {
            Slot::First => self.participant1_id,
            Slot::Second => self.participant2_id,
        }
    }

    pub fn set_slot(&mut self, slot: Slot, participant_id: Option<ParticipantId>) {
        match slot {
            Slot::First => self.participant1_id = participant_id,
            Slot::Second => self.participant2_id = participant_id,
        }
    }
}

/// A match row that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMatch {
    pub round: i32,
    pub match_number: i32,
    pub participant1_id: Option<ParticipantId>,
    pub participant2_id: Option<ParticipantId>,
}
