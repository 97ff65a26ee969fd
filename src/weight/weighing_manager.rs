// Copyright (C) 2025 Paul Hampson
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License version 3 as  published by the
// Free Software Foundation.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program.  If not, see <https://www.gnu.org/licenses/>.

use crate::config::{CALIBRATION_SAMPLES, WEIGHT_POLL_PERIOD};
use crate::weight::messaging::{
    CornerWeights, WeighingError, WeightChannelPublisher, WeightEvents, WeightRequest,
    WeightRequestSubscriber,
};
use crate::weight::{Corner, LoadCell};
use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_sync::pubsub::WaitResult;
use embassy_time::Ticker;
use strum::{EnumCount, IntoEnumIterator};

/// Owns the four corner channels. Polls them in turn and serves tare/calibration requests
/// between polls, so reads of one channel never overlap.
pub struct WeighingManager {
    request_subscriber: WeightRequestSubscriber<'static>,
    weight_channel_publisher: WeightChannelPublisher<'static>,
    load_cells: [LoadCell; Corner::COUNT],
}

impl WeighingManager {
    pub fn new(
        request_subscriber: WeightRequestSubscriber<'static>,
        weight_channel_publisher: WeightChannelPublisher<'static>,
        load_cells: [LoadCell; Corner::COUNT],
    ) -> Self {
        Self {
            request_subscriber,
            weight_channel_publisher,
            load_cells,
        }
    }

    pub async fn run(&mut self) -> ! {
        let mut poll_timer = Ticker::every(WEIGHT_POLL_PERIOD);
        loop {
            let request_or_timer =
                select(self.request_subscriber.next_message(), poll_timer.next()).await;
            match request_or_timer {
                Either::First(message) => match message {
                    WaitResult::Message(request) => self.handle_request(request).await,
                    WaitResult::Lagged(missed) => {
                        warn!("Missed {} weight requests", missed);
                    }
                },
                Either::Second(_) => {
                    self.do_measurement();
                }
            }
        }
    }

    /// Tares every corner in turn. Corners that fail keep their previous offset.
    pub async fn tare_all(&mut self) -> Result<(), WeighingError> {
        let mut result = Ok(());
        for corner in Corner::iter() {
            if let Err(e) = self.tare_corner(corner).await {
                result = Err(e);
            }
        }
        result
    }

    async fn tare_corner(&mut self, corner: Corner) -> Result<(), WeighingError> {
        let load_cell = &mut self.load_cells[corner.index()];
        match load_cell.tare().await {
            Ok(()) => {
                info!("{} tared at {}", corner.name(), load_cell.offset());
                Ok(())
            }
            Err(e) => {
                warn!("{} tare failed: {}", corner.name(), e);
                Err(WeighingError::TareFailed(corner))
            }
        }
    }

    async fn calibrate_corner(&mut self, corner: Corner, mass: f32) -> Result<(), WeighingError> {
        let load_cell = &mut self.load_cells[corner.index()];
        match load_cell.calibrate(mass, CALIBRATION_SAMPLES).await {
            Ok(()) => {
                info!(
                    "{} calibrated at {} counts per gram",
                    corner.name(),
                    load_cell.scale()
                );
                Ok(())
            }
            Err(e) => {
                warn!("{} calibration failed: {}", corner.name(), e);
                Err(WeighingError::CalibrationFailed(corner))
            }
        }
    }

    async fn handle_request(&mut self, request: WeightRequest) {
        let result = match request {
            WeightRequest::Tare => self.tare_all().await,
            WeightRequest::CalibrateCorner(corner, mass) => {
                self.calibrate_corner(corner, mass).await
            }
        };

        match result {
            Ok(()) => self
                .weight_channel_publisher
                .publish_immediate(WeightEvents::RequestCompleted(request)),
            Err(e) => self
                .weight_channel_publisher
                .publish_immediate(WeightEvents::RequestFailed(e)),
        }
    }

    fn do_measurement(&mut self) {
        let mut weights = CornerWeights {
            grams: [0.0; Corner::COUNT],
            total_grams: 0.0,
            faulted: [false; Corner::COUNT],
        };

        for corner in Corner::iter() {
            let load_cell = &mut self.load_cells[corner.index()];
            match load_cell.get_weight() {
                Ok(grams) => {
                    weights.grams[corner.index()] = grams;
                    weights.faulted[corner.index()] = load_cell.last_error().is_some();
                }
                Err(e) => {
                    debug!("{} measurement failed: {}", corner.name(), e);
                    weights.faulted[corner.index()] = true;
                    self.weight_channel_publisher
                        .publish_immediate(WeightEvents::RequestFailed(
                            WeighingError::MeasurementFailed(corner),
                        ));
                }
            }
        }

        weights.total_grams = weights.grams.iter().sum();
        self.weight_channel_publisher
            .publish_immediate(WeightEvents::WeightUpdate(weights));
    }
}
