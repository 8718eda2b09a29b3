//! Server module - HTTP API over the pollution and data-center tables

mod error;
mod geojson;
mod routes;

pub use error::{ApiError, ApiResponse};
pub use geojson::{datacenter_features, observation_features};
pub use routes::build_router;

use crate::data::{DataCenterRow, DataProcessor, LoaderError, Observation, PollutionLoader};
use polars::prelude::DataFrame;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::info;

/// The built pollution table in both frame and record form.
pub struct PollutionTable {
    pub df: DataFrame,
    pub observations: Vec<Observation>,
}

/// Process-wide pollution table, built once on first demand.
///
/// Concurrent first requests wait on the same load. A failed load leaves the
/// cell empty so the next request retries, reusing whatever the loader has
/// already memoized.
pub struct PollutionStore {
    loader: Mutex<PollutionLoader>,
    table: OnceCell<Arc<PollutionTable>>,
}

impl PollutionStore {
    pub fn new(loader: PollutionLoader) -> Self {
        Self {
            loader: Mutex::new(loader),
            table: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.table.initialized()
    }

    pub async fn table(&self) -> Result<Arc<PollutionTable>, LoaderError> {
        let table = self
            .table
            .get_or_try_init(|| async {
                let mut loader = self.loader.lock().await;
                let df = loader.load().await?.clone();
                let observations = DataProcessor::from_frame(&df)?;
                info!("Pollution table ready: {} observations", observations.len());
                Ok::<_, LoaderError>(Arc::new(PollutionTable { df, observations }))
            })
            .await?;
        Ok(Arc::clone(table))
    }
}

// Application state
#[derive(Clone)]
pub struct AppState {
    pub pollution: Arc<PollutionStore>,
    pub datacenters: Arc<Vec<DataCenterRow>>,
}

impl AppState {
    pub fn new(loader: PollutionLoader, datacenters: Vec<DataCenterRow>) -> Self {
        Self {
            pollution: Arc::new(PollutionStore::new(loader)),
            datacenters: Arc::new(datacenters),
        }
    }
}
