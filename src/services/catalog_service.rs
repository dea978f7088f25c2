use crate::{
    dao::models::{FlightMode, Simulator, Track},
    dto::catalog::{CatalogOption, CatalogResponse},
};

/// Every simulator, track and mode the API accepts.
pub fn catalog() -> CatalogResponse {
    CatalogResponse {
        simulators: Simulator::ALL
            .into_iter()
            .map(|simulator| CatalogOption::new(simulator.code(), simulator.label()))
            .collect(),
        tracks: Track::ALL
            .into_iter()
            .map(|track| CatalogOption::new(track.code(), track.label()))
            .collect(),
        modes: FlightMode::ALL
            .into_iter()
            .map(|mode| CatalogOption::new(mode.code(), mode.label()))
            .collect(),
    }
}
