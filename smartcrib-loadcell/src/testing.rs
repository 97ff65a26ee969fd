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

//! Simulated HX711 for host tests. Pins, delay and lock share one sensor model and append to a
//! common event log so tests can check ordering across all of them.

use crate::interface::hx711::{DATA_READY_TIMEOUT_US, POWER_MODE_CHANGE_DELAY_US, VALID_DATA_BITS};
use crate::interface::ShiftLock;
use crate::LoadCellChannel;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ClockHigh,
    ClockLow,
    DataRead(bool),
    DelayUs(u32),
    DelayMs(u32),
    LockTaken,
    LockReleased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    /// DOUT stays high for this many polls, then the entry is dropped.
    Busy(u32),
    /// 24-bit result waiting to be clocked out.
    Ready(u32),
}

impl Conversion {
    pub fn raw(value: i32) -> Self {
        Conversion::Ready(value as u32 & 0xFF_FFFF)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Default)]
struct SensorState {
    conversions: VecDeque<Conversion>,
    clock_rises: usize,
    clock_high: bool,
    fail_clock: bool,
    data_reads_before_failure: Option<usize>,
    powered_down: bool,
    gain_pulses_seen: Vec<usize>,
    events: Vec<Event>,
}

impl SensorState {
    fn finish_conversion(&mut self) {
        if self.clock_rises > VALID_DATA_BITS {
            self.gain_pulses_seen
                .push(self.clock_rises - VALID_DATA_BITS);
            self.conversions.pop_front();
            self.clock_rises = 0;
        }
    }

    fn sample(&mut self) -> bool {
        self.finish_conversion();
        if self.powered_down {
            return true;
        }
        match self.clock_rises {
            0 => {
                let mut busy_finished = false;
                let level = match self.conversions.front_mut() {
                    Some(Conversion::Ready(_)) => false,
                    Some(Conversion::Busy(remaining)) => {
                        *remaining = remaining.saturating_sub(1);
                        busy_finished = *remaining == 0;
                        true
                    }
                    None => true,
                };
                if busy_finished {
                    self.conversions.pop_front();
                }
                level
            }
            rises => match self.conversions.front() {
                Some(Conversion::Ready(value)) if rises <= VALID_DATA_BITS => {
                    (value >> (VALID_DATA_BITS - rises)) & 0x1 == 0x1
                }
                _ => true,
            },
        }
    }
}

#[derive(Clone, Default)]
pub struct MockSensor {
    state: Rc<RefCell<SensorState>>,
}

impl MockSensor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, conversion: Conversion) {
        self.state.borrow_mut().conversions.push_back(conversion);
    }

    pub fn queue_raw(&self, values: &[i32]) {
        for value in values {
            self.queue(Conversion::raw(*value));
        }
    }

    /// Queues conversions that never become ready within the driver's poll budget.
    pub fn queue_timeouts(&self, count: usize) {
        for _ in 0..count {
            self.queue(Conversion::Busy(DATA_READY_TIMEOUT_US));
        }
    }

    pub fn fail_clock(&self) {
        self.state.borrow_mut().fail_clock = true;
    }

    /// Lets `reads` more data pin reads succeed, then fails every read after that.
    pub fn fail_data_after(&self, reads: usize) {
        self.state.borrow_mut().data_reads_before_failure = Some(reads);
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.borrow().events.clone()
    }

    pub fn clear_events(&self) {
        self.state.borrow_mut().events.clear();
    }

    pub fn count(&self, event: Event) -> usize {
        self.state
            .borrow()
            .events
            .iter()
            .filter(|e| **e == event)
            .count()
    }

    pub fn gain_pulses_seen(&self) -> Vec<usize> {
        let mut state = self.state.borrow_mut();
        state.finish_conversion();
        state.gain_pulses_seen.clone()
    }

    pub fn clock_is_high(&self) -> bool {
        self.state.borrow().clock_high
    }

    pub fn is_powered_down(&self) -> bool {
        self.state.borrow().powered_down
    }

    pub fn pins(&self) -> (MockClockPin, MockDataPin) {
        (
            MockClockPin {
                sensor: self.clone(),
            },
            MockDataPin {
                sensor: self.clone(),
            },
        )
    }

    pub fn delay(&self) -> MockDelay {
        MockDelay {
            sensor: self.clone(),
        }
    }

    pub fn lock(&self) -> MockLock {
        MockLock {
            sensor: self.clone(),
        }
    }

    fn log(&self, event: Event) {
        self.state.borrow_mut().events.push(event);
    }
}

pub type TestChannel = LoadCellChannel<MockClockPin, MockDataPin, MockDelay, MockLock>;

pub fn channel(sensor: &MockSensor) -> TestChannel {
    let (clock_pin, data_pin) = sensor.pins();
    LoadCellChannel::init(clock_pin, data_pin, sensor.delay(), sensor.lock()).unwrap()
}

pub struct MockClockPin {
    sensor: MockSensor,
}

impl ErrorType for MockClockPin {
    type Error = MockPinError;
}

impl OutputPin for MockClockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.sensor.state.borrow_mut();
        if state.fail_clock {
            return Err(MockPinError);
        }
        state.clock_high = false;
        state.events.push(Event::ClockLow);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.sensor.state.borrow_mut();
        if state.fail_clock {
            return Err(MockPinError);
        }
        state.clock_high = true;
        state.clock_rises += 1;
        state.events.push(Event::ClockHigh);
        Ok(())
    }
}

pub struct MockDataPin {
    sensor: MockSensor,
}

impl ErrorType for MockDataPin {
    type Error = MockPinError;
}

impl InputPin for MockDataPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if let Some(remaining) = &mut self.sensor.state.borrow_mut().data_reads_before_failure {
            if *remaining == 0 {
                return Err(MockPinError);
            }
            *remaining -= 1;
        }
        let level = self.sensor.state.borrow_mut().sample();
        self.sensor.log(Event::DataRead(level));
        Ok(level)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

pub struct MockDelay {
    sensor: MockSensor,
}

impl embedded_hal::delay::DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_us(&mut self, us: u32) {
        let mut state = self.sensor.state.borrow_mut();
        state.events.push(Event::DelayUs(us));
        if us >= POWER_MODE_CHANGE_DELAY_US {
            // The sensor resets on any power state change.
            state.powered_down = state.clock_high;
            state.clock_rises = 0;
        }
    }
}

impl embedded_hal_async::delay::DelayNs for MockDelay {
    async fn delay_ns(&mut self, _ns: u32) {}

    async fn delay_ms(&mut self, ms: u32) {
        self.sensor.log(Event::DelayMs(ms));
    }
}

pub struct MockLock {
    sensor: MockSensor,
}

impl ShiftLock for MockLock {
    fn lock<R>(&mut self, f: impl FnOnce() -> R) -> R {
        self.sensor.log(Event::LockTaken);
        let result = f();
        self.sensor.log(Event::LockReleased);
        result
    }
}
