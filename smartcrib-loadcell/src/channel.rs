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

use crate::interface::hx711::{self, Hx711Gain, POWER_MODE_CHANGE_DELAY_US};
use crate::interface::ShiftLock;
use crate::Error;
use core::cmp::max;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal_async::delay::DelayNs as AsyncDelayNs;

pub const TARE_SAMPLES: usize = 10;
/// HX711 output rate is 10 or 80Hz, faster sampling only returns repeated values.
pub const SAMPLE_PACING_MS: u32 = 10;

/// What [`LoadCellChannel::get_weight`] reports when the sensor does not answer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FailurePolicy {
    /// Report zero weight and keep the failure in [`LoadCellChannel::last_error`].
    #[default]
    SubstituteZero,
    /// Return the read error to the caller.
    Propagate,
}

/// One HX711 sensor: its two pins plus tare and scale calibration.
///
/// Every read takes `&mut self`, so a channel can only ever have one protocol exchange in
/// flight. Channels share nothing and can be polled from separate tasks.
pub struct LoadCellChannel<CLK, DATA, D, L>
where
    CLK: ErrorType,
    DATA: ErrorType,
{
    clock_pin: CLK,
    data_pin: DATA,
    delay: D,
    lock: L,
    initialized: bool,
    offset: i32,
    scale: f32,
    gain: Hx711Gain,
    failure_policy: FailurePolicy,
    last_error: Option<Error<CLK::Error, DATA::Error>>,
}

impl<CLK, DATA, D, L, ClkE, DataE> LoadCellChannel<CLK, DATA, D, L>
where
    CLK: OutputPin<Error = ClkE>,
    DATA: InputPin<Error = DataE>,
    D: DelayNs + AsyncDelayNs,
    L: ShiftLock,
{
    /// Binds the pins and drives the clock low straight away, a clock left high for 60us puts
    /// the sensor into power down. The data pin is expected to already be an input with pull-up.
    pub fn init(
        mut clock_pin: CLK,
        data_pin: DATA,
        delay: D,
        lock: L,
    ) -> Result<Self, Error<ClkE, DataE>> {
        clock_pin.set_low().map_err(Error::Config)?;

        Ok(Self {
            clock_pin,
            data_pin,
            delay,
            lock,
            initialized: true,
            offset: 0,
            scale: 1.0,
            gain: Hx711Gain::default(),
            failure_policy: FailurePolicy::default(),
            last_error: None,
        })
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    /// Reads one 24-bit conversion. Waits up to 1ms for the sensor to signal data ready, then
    /// clocks the result out with the shift lock held.
    pub fn read_raw(&mut self) -> Result<i32, Error<ClkE, DataE>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let Self {
            clock_pin,
            data_pin,
            delay,
            lock,
            gain,
            ..
        } = self;

        let ready: Result<(), Error<ClkE, DataE>> = hx711::wait_for_data_ready(data_pin, delay);
        ready?;

        let gain_pulses = gain.gain_pulses();
        let shifted: Result<u32, Error<ClkE, DataE>> =
            lock.lock(|| hx711::shift_in(clock_pin, data_pin, delay, gain_pulses));

        let raw = hx711::sign_extend(shifted?);
        trace!("Raw reading = {}", raw);
        Ok(raw)
    }

    /// Mean of `sample_count` reads, at least one, paced at the sensor output rate. Failed
    /// samples are left out of the mean. Fails only if no sample succeeds.
    pub async fn read_average(&mut self, sample_count: usize) -> Result<i32, Error<ClkE, DataE>> {
        if !self.initialized {
            return Err(Error::NotInitialized);
        }

        let sample_count = max(sample_count, 1);
        let mut sum: i64 = 0;
        let mut valid_samples: i64 = 0;
        let mut last_failure = Error::Timeout;

        for sample in 0..sample_count {
            if sample > 0 {
                AsyncDelayNs::delay_ms(&mut self.delay, SAMPLE_PACING_MS).await;
            }
            match self.read_raw() {
                Ok(raw) => {
                    sum += raw as i64;
                    valid_samples += 1;
                }
                Err(e) => {
                    trace!("Sample {} failed", sample);
                    last_failure = e;
                }
            }
        }

        if valid_samples == 0 {
            warn!("No valid samples out of {}", sample_count);
            return Err(last_failure);
        }

        Ok((sum / valid_samples) as i32)
    }

    /// Records the current load as zero. The offset is left untouched if the average fails.
    pub async fn tare(&mut self) -> Result<(), Error<ClkE, DataE>> {
        let offset = self.read_average(TARE_SAMPLES).await?;
        self.offset = offset;
        debug!("Tare offset = {}", offset);
        Ok(())
    }

    /// Derives the scale from the current reading under a known reference weight. Tare first.
    pub async fn calibrate(
        &mut self,
        known_weight: f32,
        sample_count: usize,
    ) -> Result<(), Error<ClkE, DataE>> {
        if known_weight == 0.0 || !known_weight.is_finite() {
            return Err(Error::InvalidScale);
        }
        let reading = self.read_average(sample_count).await?;
        let tared_reading = (reading as i64 - self.offset as i64) as f32;
        self.set_scale(tared_reading / known_weight)?;
        debug!("Calibration scale = {} counts per unit", self.scale);
        Ok(())
    }

    /// Replaces the scale divisor. Zero and non-finite values are rejected and leave the scale
    /// as it was. Negative values are allowed for inverted cells.
    pub fn set_scale(&mut self, scale: f32) -> Result<(), Error<ClkE, DataE>> {
        if scale == 0.0 || !scale.is_finite() {
            warn!("Rejected load cell scale {}", scale);
            return Err(Error::InvalidScale);
        }
        self.scale = scale;
        Ok(())
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.offset = offset;
    }

    /// Takes effect from the conversion after the next read.
    pub fn set_gain(&mut self, gain: Hx711Gain) {
        self.gain = gain;
    }

    pub fn set_failure_policy(&mut self, failure_policy: FailurePolicy) {
        self.failure_policy = failure_policy;
    }

    /// One read converted to weight units. On failure the result depends on the
    /// [`FailurePolicy`].
    pub fn get_weight(&mut self) -> Result<f32, Error<ClkE, DataE>> {
        match self.read_raw() {
            Ok(raw) => {
                self.last_error = None;
                Ok(self.weight_from_raw(raw))
            }
            Err(e) => match self.failure_policy {
                FailurePolicy::SubstituteZero => {
                    warn!("Load cell read failed, reporting zero weight");
                    self.last_error = Some(e);
                    Ok(0.0)
                }
                FailurePolicy::Propagate => Err(e),
            },
        }
    }

    pub fn weight_from_raw(&self, raw: i32) -> f32 {
        (raw as i64 - self.offset as i64) as f32 / self.scale
    }

    /// Holds the clock high long enough for the sensor to power down. Reads fail with
    /// [`Error::NotInitialized`] until [`Self::power_up`].
    pub fn power_down(&mut self) -> Result<(), Error<ClkE, DataE>> {
        self.clock_pin.set_high().map_err(Error::ClockPin)?;
        DelayNs::delay_us(&mut self.delay, POWER_MODE_CHANGE_DELAY_US);
        self.initialized = false;
        Ok(())
    }

    /// Wakes the sensor. It comes back on channel A gain 128.
    pub fn power_up(&mut self) -> Result<(), Error<ClkE, DataE>> {
        self.clock_pin.set_low().map_err(Error::ClockPin)?;
        DelayNs::delay_us(&mut self.delay, POWER_MODE_CHANGE_DELAY_US);
        self.gain = Hx711Gain::default();
        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn gain(&self) -> Hx711Gain {
        self.gain
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Failure behind the most recent zero substituted by [`Self::get_weight`]. Cleared by the
    /// next successful weight read.
    pub fn last_error(&self) -> Option<&Error<ClkE, DataE>> {
        self.last_error.as_ref()
    }

    pub fn release(self) -> (CLK, DATA, D, L) {
        (self.clock_pin, self.data_pin, self.delay, self.lock)
    }
}
