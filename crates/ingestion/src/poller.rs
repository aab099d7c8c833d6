//! Kinematics poller
//!
//! The simulator never pushes vehicle state, so it is queried once per
//! publish cycle and written into the store like any other stream.

use std::sync::Arc;

use contracts::{VehicleKinematics, VehicleStateSource};
use tracing::{trace, warn};

use crate::error::{IngestionError, Result};
use crate::metrics::IngestionMetrics;
use crate::store::LatestValueStore;
use crate::validate::validate_kinematics;

/// Pulls kinematics from a [`VehicleStateSource`] into the store
#[derive(Clone)]
pub struct KinematicsPoller {
    source: Arc<dyn VehicleStateSource>,
    store: Arc<LatestValueStore>,
    metrics: Arc<IngestionMetrics>,
}

impl KinematicsPoller {
    pub fn new(
        source: Arc<dyn VehicleStateSource>,
        store: Arc<LatestValueStore>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            source,
            store,
            metrics,
        }
    }

    pub fn vehicle_id(&self) -> &str {
        self.source.vehicle_id()
    }

    /// Query once and store the result
    ///
    /// Blocking. On failure the previously stored kinematics stay in place.
    pub fn poll(&self) -> Result<VehicleKinematics> {
        let result = self
            .source
            .kinematics()
            .map_err(|e| IngestionError::KinematicsQuery {
                vehicle: self.vehicle_id().to_string(),
                message: e.to_string(),
            })
            .and_then(|kinematics| validate_kinematics(&kinematics).map(|()| kinematics));

        match result {
            Ok(kinematics) => {
                self.store.write_kinematics(kinematics);
                self.metrics.record_kinematics_poll(true);
                observability::record_kinematics_poll(true);
                trace!(vehicle = %self.vehicle_id(), "kinematics polled");
                Ok(kinematics)
            }
            Err(e) => {
                self.metrics.record_kinematics_poll(false);
                observability::record_kinematics_poll(false);
                warn!(
                    vehicle = %self.vehicle_id(),
                    error = %e,
                    "Kinematics poll failed, keeping previous value"
                );
                Err(e)
            }
        }
    }
}
