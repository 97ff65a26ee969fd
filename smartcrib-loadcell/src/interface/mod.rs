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

pub mod hx711;

/// Mutual exclusion held around the HX711 shift-in. Implementations must mask every interrupt
/// and task switch on the executing core for the duration of `f` and must never block on
/// anything that could itself be preempted.
pub trait ShiftLock {
    fn lock<R>(&mut self, f: impl FnOnce() -> R) -> R;
}

/// [`ShiftLock`] backed by the `critical-section` crate. On RP2040 with embassy-rp this is
/// interrupt masking plus the inter-core hardware spinlock.
#[derive(Debug, Default, Clone, Copy)]
pub struct CriticalSectionLock;

impl CriticalSectionLock {
    pub const fn new() -> Self {
        Self
    }
}

impl ShiftLock for CriticalSectionLock {
    fn lock<R>(&mut self, f: impl FnOnce() -> R) -> R {
        critical_section::with(|_cs| f())
    }
}
