mod config;
mod error;
mod models;
mod store;

pub use config::CouchConfig;
pub use error::{CouchDaoError, CouchResult};
pub use store::CouchResultStore;

use crate::dao::storage::StorageError;

impl From<CouchDaoError> for StorageError {
    fn from(err: CouchDaoError) -> Self {
        if err.is_conflict() {
            StorageError::conflict(err.to_string())
        } else {
            StorageError::unavailable(err.to_string(), err)
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn revision_race_maps_to_conflict() {
        let err = CouchDaoError::write_rejected("result::liftoff::map1::acro::7", StatusCode::CONFLICT);
        assert!(matches!(StorageError::from(err), StorageError::Conflict { .. }));

        let err = CouchDaoError::write_rejected("user::7", StatusCode::SERVICE_UNAVAILABLE);
        assert!(matches!(StorageError::from(err), StorageError::Unavailable { .. }));
    }
}
