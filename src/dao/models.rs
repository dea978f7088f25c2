use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use time::{Date, format_description::FormatItem, macros::format_description};
use utoipa::ToSchema;
use uuid::Uuid;

/// External numeric handle supplied by the messaging transport.
pub type Identity = i64;

/// ISO calendar format used when dates are persisted as strings.
pub const STORED_DATE_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Simulator a lap time was flown in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Simulator {
    #[serde(rename = "fpv_freerider", alias = "FPV Freerider")]
    FpvFreerider,
    #[serde(rename = "dcl_the_game", alias = "DCL The Game")]
    DclTheGame,
    #[serde(rename = "liftoff", alias = "Liftoff")]
    Liftoff,
}

/// Track (map) a lap time was flown on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum Track {
    #[serde(rename = "map1")]
    Map1,
    #[serde(rename = "map2")]
    Map2,
}

/// Flight assistance mode used for the lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum FlightMode {
    #[serde(rename = "self_leveling", alias = "Self-Leveling")]
    SelfLeveling,
    #[serde(rename = "acro", alias = "Acro")]
    Acro,
}

impl Simulator {
    /// Every simulator, in the order the transport should offer them.
    pub const ALL: [Simulator; 3] = [
        Simulator::FpvFreerider,
        Simulator::DclTheGame,
        Simulator::Liftoff,
    ];

    /// Stable code used in storage keys and the API.
    pub fn code(self) -> &'static str {
        match self {
            Simulator::FpvFreerider => "fpv_freerider",
            Simulator::DclTheGame => "dcl_the_game",
            Simulator::Liftoff => "liftoff",
        }
    }

    /// Human readable label shown on transport buttons.
    pub fn label(self) -> &'static str {
        match self {
            Simulator::FpvFreerider => "FPV Freerider",
            Simulator::DclTheGame => "DCL The Game",
            Simulator::Liftoff => "Liftoff",
        }
    }
}

impl Track {
    /// Every track, in the order the transport should offer them.
    pub const ALL: [Track; 2] = [Track::Map1, Track::Map2];

    /// Stable code used in storage keys and the API.
    pub fn code(self) -> &'static str {
        match self {
            Track::Map1 => "map1",
            Track::Map2 => "map2",
        }
    }

    /// Human readable label shown on transport buttons.
    pub fn label(self) -> &'static str {
        self.code()
    }
}

impl FlightMode {
    /// Every flight mode, in the order the transport should offer them.
    pub const ALL: [FlightMode; 2] = [FlightMode::SelfLeveling, FlightMode::Acro];

    /// Stable code used in storage keys and the API.
    pub fn code(self) -> &'static str {
        match self {
            FlightMode::SelfLeveling => "self_leveling",
            FlightMode::Acro => "acro",
        }
    }

    /// Human readable label shown on transport buttons.
    pub fn label(self) -> &'static str {
        match self {
            FlightMode::SelfLeveling => "Self-Leveling",
            FlightMode::Acro => "Acro",
        }
    }
}

/// Simulator/track/mode combination identifying one leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Board {
    pub simulator: Simulator,
    pub track: Track,
    pub mode: FlightMode,
}

impl Board {
    /// Board of one simulator, track and mode.
    pub fn new(simulator: Simulator, track: Track, mode: FlightMode) -> Self {
        Self {
            simulator,
            track,
            mode,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.simulator.code(),
            self.track.code(),
            self.mode.code()
        )
    }
}

/// Key of a single "current personal best" slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Quadruple {
    pub identity: Identity,
    pub board: Board,
}

/// Registered club member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    /// External identity; unique.
    pub identity: Identity,
    pub last_name: String,
    pub first_name: String,
    /// Study or club group label.
    pub group: String,
    pub birth_date: Date,
}

/// Current personal best of one user on one board.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntity {
    pub id: Uuid,
    pub identity: Identity,
    pub board: Board,
    /// Best lap time in seconds.
    pub best_time: f64,
    pub created_at: SystemTime,
    /// Relative path of the image substantiating the time, if any.
    pub evidence_path: Option<String>,
}

impl ResultEntity {
    /// Build a fresh result stamped with the current time.
    pub fn new(
        identity: Identity,
        board: Board,
        best_time: f64,
        evidence_path: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            board,
            best_time,
            created_at: SystemTime::now(),
            evidence_path,
        }
    }

    /// Key under which this result is stored.
    pub fn quadruple(&self) -> Quadruple {
        Quadruple {
            identity: self.identity,
            board: self.board,
        }
    }

    /// True when this result is strictly faster than `stored`; ties do not replace.
    pub fn beats(&self, stored: &ResultEntity) -> bool {
        self.best_time < stored.best_time
    }
}

/// Outcome of offering a candidate result to a store.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// No previous result existed for the quadruple.
    Inserted(ResultEntity),
    /// The candidate was strictly better and took the previous row's place.
    Replaced {
        current: ResultEntity,
        previous: ResultEntity,
    },
    /// The stored result is at least as good; nothing changed.
    Rejected { best: ResultEntity },
}

/// One ranked leaderboard row joined with its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub identity: Identity,
    pub last_name: String,
    pub first_name: String,
    pub group: String,
    pub best_time: f64,
    pub created_at: SystemTime,
}

impl LeaderboardRow {
    /// Join a stored result with the member who flew it.
    pub fn from_parts(user: &UserEntity, result: &ResultEntity) -> Self {
        Self {
            identity: user.identity,
            last_name: user.last_name.clone(),
            first_name: user.first_name.clone(),
            group: user.group.clone(),
            best_time: result.best_time,
            created_at: result.created_at,
        }
    }

    /// `Last First` as printed on leaderboard lines.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.last_name, self.first_name)
    }
}

/// Rank results best first: time, then earlier submission, then identity.
pub fn rank_order(a: &ResultEntity, b: &ResultEntity) -> std::cmp::Ordering {
    a.best_time
        .total_cmp(&b.best_time)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.identity.cmp(&b.identity))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn board() -> Board {
        Board::new(Simulator::Liftoff, Track::Map1, FlightMode::Acro)
    }

    #[test]
    fn serde_names_match_codes() {
        for simulator in Simulator::ALL {
            assert_eq!(
                serde_json::to_value(simulator).unwrap(),
                serde_json::Value::String(simulator.code().into())
            );
        }
        for track in Track::ALL {
            assert_eq!(
                serde_json::to_value(track).unwrap(),
                serde_json::Value::String(track.code().into())
            );
        }
        for mode in FlightMode::ALL {
            assert_eq!(
                serde_json::to_value(mode).unwrap(),
                serde_json::Value::String(mode.code().into())
            );
        }
    }

    #[test]
    fn button_labels_are_accepted_as_input() {
        let simulator: Simulator = serde_json::from_str("\"DCL The Game\"").unwrap();
        assert_eq!(simulator, Simulator::DclTheGame);
        let mode: FlightMode = serde_json::from_str("\"Self-Leveling\"").unwrap();
        assert_eq!(mode, FlightMode::SelfLeveling);
        assert!(serde_json::from_str::<Track>("\"map3\"").is_err());
    }

    #[test]
    fn ties_do_not_beat_stored_result() {
        let stored = ResultEntity::new(1, board(), 38.106, None);
        let tie = ResultEntity::new(1, board(), 38.106, None);
        let faster = ResultEntity::new(1, board(), 38.105, None);
        assert!(!tie.beats(&stored));
        assert!(faster.beats(&stored));
        assert!(!stored.beats(&faster));
    }

    #[test]
    fn rank_order_breaks_ties_by_submission_time_then_identity() {
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        let mut early = ResultEntity::new(9, board(), 30.0, None);
        early.created_at = base;
        let mut late = ResultEntity::new(1, board(), 30.0, None);
        late.created_at = base + Duration::from_secs(5);
        let mut same_time = ResultEntity::new(2, board(), 30.0, None);
        same_time.created_at = base;

        let mut rows = vec![late.clone(), early.clone(), same_time.clone()];
        rows.sort_by(rank_order);
        let order: Vec<Identity> = rows.iter().map(|row| row.identity).collect();
        assert_eq!(order, vec![2, 9, 1]);
    }

    #[test]
    fn board_display_uses_codes() {
        assert_eq!(board().to_string(), "liftoff/map1/acro");
    }
}
