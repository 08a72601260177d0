// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Bus status output lines.

use stm32f7xx_hal::gpio::{self, Output, PinState, PushPull};

/// Active-high push-pull output reflecting one bus's self-test status. Starts low.
pub struct StatusLine<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
    is_on: bool,
}

impl<const P: char, const N: u8> StatusLine<P, N> {
    pub fn active_high<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        let mut pin = pin.into_push_pull_output();
        pin.set_state(PinState::Low);
        Self { pin, is_on: false }
    }

    /// Drive the line ON (high) or OFF (low). The pin is only written on change.
    pub fn set(&mut self, on: bool) {
        if on != self.is_on {
            self.pin
                .set_state(if on { PinState::High } else { PinState::Low });
            self.is_on = on;
        }
    }
}
