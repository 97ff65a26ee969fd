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

use crate::weight::messaging::{WeightChannelSubscriber, WeightEvents};
use crate::weight::Corner;
use defmt::{info, warn};
use embassy_sync::pubsub::WaitResult;

/// Logs each poll as one CSV line: front left, front right, back left, back right, total.
pub async fn weight_reporter(mut weight_channel_subscriber: WeightChannelSubscriber<'static>) -> ! {
    loop {
        match weight_channel_subscriber.next_message().await {
            WaitResult::Message(WeightEvents::WeightUpdate(weights)) => {
                let g = weights.grams;
                info!(
                    "{=f32},{=f32},{=f32},{=f32},{=f32}",
                    g[Corner::FrontLeft.index()],
                    g[Corner::FrontRight.index()],
                    g[Corner::BackLeft.index()],
                    g[Corner::BackRight.index()],
                    weights.total_grams
                );
                if weights.faulted.iter().any(|f| *f) {
                    warn!("Zero substituted for faulted corners {}", weights.faulted);
                }
            }
            WaitResult::Message(WeightEvents::RequestFailed(e)) => {
                warn!("Weighing request failed: {}", e);
            }
            WaitResult::Message(WeightEvents::RequestCompleted(request)) => {
                info!("Weighing request completed: {}", request);
            }
            WaitResult::Lagged(missed) => {
                warn!("Reporter missed {} weight events", missed);
            }
        }
    }
}
