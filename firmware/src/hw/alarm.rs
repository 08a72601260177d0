// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Periodic tick interrupts from the general-purpose timers.
//!
//! TIM3 and TIM4 are configured register by register as up-counters clocked at
//! [`COUNTER_HZ`], raising an update interrupt every `period` counts. The interrupt handler calls
//! [`Alarm::on_update`] to acknowledge the event.

use stm32f7xx_hal::{pac, rcc::Clocks};

/// Counter clock after the prescaler. One count is 100 µs.
pub const COUNTER_HZ: u32 = 10_000;

pub struct Alarm<TIM> {
    tim: TIM,
}

/// Prescaler bringing the APB1 timer clock down to [`COUNTER_HZ`].
fn prescaler(clocks: &Clocks) -> u16 {
    let psc = (clocks.timclk1().raw() / COUNTER_HZ).saturating_sub(1);
    psc.min(u16::MAX as u32) as u16
}

macro_rules! alarm {
    ($($TIM:ident: ($ctor:ident, $timen:ident),)+) => {
        $(
            impl Alarm<pac::$TIM> {
                /// Start the timer with an update interrupt every `period` counts.
                pub fn $ctor(tim: pac::$TIM, clocks: &Clocks, period: u16) -> Self {
                    let rcc = unsafe { &*pac::RCC::ptr() };
                    rcc.apb1enr.modify(|_, w| w.$timen().set_bit());

                    // Disable counter while configuring
                    tim.cr1.modify(|_, w| w.cen().clear_bit());

                    tim.psc.write(|w| unsafe { w.bits(prescaler(clocks) as u32) });
                    tim.arr
                        .write(|w| unsafe { w.bits(period.saturating_sub(1) as u32) });

                    // Load PSC/ARR without raising an interrupt
                    tim.cr1.modify(|_, w| w.urs().set_bit());
                    tim.egr.write(|w| w.ug().set_bit());
                    tim.sr.modify(|_, w| w.uif().clear_bit());

                    tim.dier.modify(|_, w| w.uie().set_bit());
                    tim.cr1.modify(|_, w| w.cen().set_bit());

                    Self { tim }
                }

                /// Acknowledge a pending update event. Returns `false` on a spurious call.
                #[inline]
                pub fn on_update(&mut self) -> bool {
                    if self.tim.sr.read().uif().bit_is_set() {
                        self.tim.sr.modify(|_, w| w.uif().clear_bit());
                        true
                    } else {
                        false
                    }
                }
            }
        )+
    };
}

alarm! {
    TIM3: (tim3, tim3en),
    TIM4: (tim4, tim4en),
}
