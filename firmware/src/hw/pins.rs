// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F777 surround-view bridge board.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, Alternate, Output, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOB);
/// ```
pub struct BoardPins {
    pub status: StatusPins,
    pub usart1: Usart1Pins,
    pub can1: Can1Pins,
    pub can2: Can2Pins,
}

/// Bus status outputs, high while the bus self-test status is on.
pub struct StatusPins {
    pub bus1: gpiob::PB1<Output<PushPull>>,
    pub bus2: gpiob::PB2<Output<PushPull>>,
}

pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// CAN1 bus pins
pub struct Can1Pins {
    pub tx: gpioa::PA12<Alternate<9>>,
    pub rx: gpioa::PA11<Alternate<9>>,
}

/// CAN2 bus pins
pub struct Can2Pins {
    pub tx: gpiob::PB13<Alternate<9>>,
    pub rx: gpiob::PB12<Alternate<9>>,
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();

        Self {
            status: StatusPins {
                bus1: gpiob.pb1.into_push_pull_output(),
                bus2: gpiob.pb2.into_push_pull_output(),
            },

            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            can1: Can1Pins {
                tx: gpioa.pa12.into_alternate::<9>(),
                rx: gpioa.pa11.into_alternate::<9>().internal_pull_up(true),
            },

            can2: Can2Pins {
                tx: gpiob.pb13.into_alternate::<9>(),
                rx: gpiob.pb12.into_alternate::<9>().internal_pull_up(true),
            },
        }
    }
}
