use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use time::Date;
use uuid::Uuid;

use crate::dao::models::{
    Board, FlightMode, Identity, Quadruple, ResultEntity, STORED_DATE_FORMAT, Simulator, Track,
    UserEntity,
};

use super::error::MongoDaoError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    identity: Identity,
    last_name: String,
    first_name: String,
    group: String,
    /// ISO `YYYY-MM-DD`.
    birth_date: String,
}

impl From<&UserEntity> for MongoUserDocument {
    fn from(value: &UserEntity) -> Self {
        Self {
            identity: value.identity,
            last_name: value.last_name.clone(),
            first_name: value.first_name.clone(),
            group: value.group.clone(),
            birth_date: value
                .birth_date
                .format(STORED_DATE_FORMAT)
                .unwrap_or_default(),
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoUserDocument) -> Result<Self, Self::Error> {
        let birth_date = Date::parse(&value.birth_date, STORED_DATE_FORMAT).map_err(|err| {
            MongoDaoError::MalformedDocument {
                id: value.identity.to_string(),
                reason: format!("birth_date `{}`: {err}", value.birth_date),
            }
        })?;

        Ok(Self {
            identity: value.identity,
            last_name: value.last_name,
            first_name: value.first_name,
            group: value.group,
            birth_date,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoResultDocument {
    #[serde(rename = "_id")]
    id: Binary,
    user_id: Identity,
    simulator: Simulator,
    track: Track,
    mode: FlightMode,
    best_time: f64,
    created_at: DateTime,
    evidence_path: Option<String>,
}

impl From<&ResultEntity> for MongoResultDocument {
    fn from(value: &ResultEntity) -> Self {
        Self {
            id: uuid_as_binary(value.id),
            user_id: value.identity,
            simulator: value.board.simulator,
            track: value.board.track,
            mode: value.board.mode,
            best_time: value.best_time,
            created_at: DateTime::from_system_time(value.created_at),
            evidence_path: value.evidence_path.clone(),
        }
    }
}

impl MongoResultDocument {
    pub fn identity(&self) -> Identity {
        self.user_id
    }

    pub fn into_entity(self) -> Result<ResultEntity, MongoDaoError> {
        let id = Uuid::from_slice(&self.id.bytes).map_err(|err| {
            MongoDaoError::MalformedDocument {
                id: format!("{:?}", self.id.bytes),
                reason: err.to_string(),
            }
        })?;

        Ok(ResultEntity {
            id,
            identity: self.user_id,
            board: Board::new(self.simulator, self.track, self.mode),
            best_time: self.best_time,
            created_at: self.created_at.to_system_time(),
            evidence_path: self.evidence_path,
        })
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn board_filter(board: Board) -> Document {
    doc! {
        "simulator": board.simulator.code(),
        "track": board.track.code(),
        "mode": board.mode.code(),
    }
}

pub fn quadruple_filter(key: Quadruple) -> Document {
    let mut filter = board_filter(key.board);
    filter.insert("user_id", key.identity);
    filter
}
