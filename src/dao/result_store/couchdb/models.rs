use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::Date;
use uuid::Uuid;

use crate::dao::models::{
    Board, FlightMode, Identity, Quadruple, ResultEntity, STORED_DATE_FORMAT, Simulator, Track,
    UserEntity,
};

use super::error::CouchDaoError;

pub const USER_PREFIX: &str = "user::";
pub const RESULT_PREFIX: &str = "result::";
pub const END_SUFFIX: &str = "\u{ffff}";

#[derive(Debug, Deserialize)]
pub struct AllDocsResponse {
    pub rows: Vec<AllDocsRow>,
}

/// Row of an `_all_docs` answer; keyed lookups of missing documents carry no `doc`.
#[derive(Debug, Deserialize)]
pub struct AllDocsRow {
    pub key: String,
    #[serde(default)]
    pub doc: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct AllDocsKeys<'a> {
    pub keys: &'a [String],
}

pub fn user_doc_id(identity: Identity) -> String {
    format!("{USER_PREFIX}{identity}")
}

/// Every result of a board shares this prefix, so a range scan yields the board.
pub fn board_prefix(board: Board) -> String {
    format!(
        "{RESULT_PREFIX}{}::{}::{}::",
        board.simulator.code(),
        board.track.code(),
        board.mode.code()
    )
}

/// One document per quadruple: the id itself enforces the single current best.
pub fn result_doc_id(key: Quadruple) -> String {
    format!("{}{}", board_prefix(key.board), key.identity)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub identity: Identity,
    pub last_name: String,
    pub first_name: String,
    pub group: String,
    pub birth_date: String,
}

impl CouchUserDocument {
    pub fn from_entity(user: &UserEntity, rev: Option<String>) -> Self {
        Self {
            id: user_doc_id(user.identity),
            rev,
            identity: user.identity,
            last_name: user.last_name.clone(),
            first_name: user.first_name.clone(),
            group: user.group.clone(),
            birth_date: user
                .birth_date
                .format(STORED_DATE_FORMAT)
                .unwrap_or_default(),
        }
    }

    pub fn into_entity(self) -> Result<UserEntity, CouchDaoError> {
        let birth_date = Date::parse(&self.birth_date, STORED_DATE_FORMAT).map_err(|err| {
            CouchDaoError::MalformedDocument {
                doc_id: self.id.clone(),
                reason: format!("birth_date `{}`: {err}", self.birth_date),
            }
        })?;

        Ok(UserEntity {
            identity: self.identity,
            last_name: self.last_name,
            first_name: self.first_name,
            group: self.group,
            birth_date,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouchResultDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    pub result_id: Uuid,
    pub user_id: Identity,
    pub simulator: Simulator,
    pub track: Track,
    pub mode: FlightMode,
    pub best_time: f64,
    pub created_at: SystemTime,
    #[serde(default)]
    pub evidence_path: Option<String>,
}

impl CouchResultDocument {
    pub fn from_entity(result: &ResultEntity, rev: Option<String>) -> Self {
        Self {
            id: result_doc_id(result.quadruple()),
            rev,
            result_id: result.id,
            user_id: result.identity,
            simulator: result.board.simulator,
            track: result.board.track,
            mode: result.board.mode,
            best_time: result.best_time,
            created_at: result.created_at,
            evidence_path: result.evidence_path.clone(),
        }
    }

    pub fn into_entity(self) -> ResultEntity {
        ResultEntity {
            id: self.result_id,
            identity: self.user_id,
            board: Board::new(self.simulator, self.track, self.mode),
            best_time: self.best_time,
            created_at: self.created_at,
            evidence_path: self.evidence_path,
        }
    }
}
