// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Surround-view CAN bridge firmware for the STM32F777.
//!
//! Interrupt priorities, highest first: CAN1 RX0, CAN2 RX0, TIM4 (100 ms), TIM3 (1 ms). The
//! receive handlers and the tick handlers only touch atomics in [`SHARED`]; CAN2 is also used by
//! the main loop to retransmit, so it lives behind a critical-section mutex.

#![no_main]
#![no_std]

use core::cell::RefCell;
use core::fmt::Write as _;

use bxcan::Frame;
use cortex_m::interrupt::Mutex;
use cortex_m_rt::entry;
use panic_halt as _;

use hal::{
    can::Can,
    pac::{self, interrupt, Interrupt, NVIC},
    prelude::*,
    rcc::{Clocks, HSEClock, HSEClockMode},
    serial::{self, Config, Serial},
};
use stm32f7xx_hal as hal;

use surround_bridge::link::config::CAN2_FILTER_START;
use surround_bridge::link::{LinkConfig, BUS1, BUS2, CAN_CLOCK_HZ};
use surround_bridge::{Bridge, BridgeConfig, BusId, FrameSink, Link, SharedState};

mod hw;
use hw::{alarm::COUNTER_HZ, Alarm, BoardPins, CanBus, Console, StatusLine};

type Can1 = CanBus<pac::CAN1>;
type Can2 = CanBus<pac::CAN2>;
type FineAlarm = Alarm<pac::TIM3>;
type CoarseAlarm = Alarm<pac::TIM4>;

/// Both controllers in loopback + silent mode for bench testing.
const LOOPBACK: bool = cfg!(feature = "loopback");

/// Alarm periods in counter cycles: 1 ms and 100 ms.
const FINE_PERIOD: u16 = (COUNTER_HZ / 1_000) as u16;
const COARSE_PERIOD: u16 = (COUNTER_HZ / 10) as u16;

static SHARED: SharedState = SharedState::new();

static BUS1_LINK: Link = Link::new(&BUS1);
static BUS2_LINK: Link = Link::new(&BUS2);

// Moved into the interrupt handlers on first use.
static G_CAN1: Mutex<RefCell<Option<Can1>>> = Mutex::new(RefCell::new(None));
static G_FINE: Mutex<RefCell<Option<FineAlarm>>> = Mutex::new(RefCell::new(None));
static G_COARSE: Mutex<RefCell<Option<CoarseAlarm>>> = Mutex::new(RefCell::new(None));

// Shared by the CAN2 receive handler and the main loop.
static G_CAN2: Mutex<RefCell<Option<Can2>>> = Mutex::new(RefCell::new(None));

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let mut cp = cortex_m::Peripherals::take().unwrap();

    // Clocks: APB1 at 36 MHz for the CAN bit timing, timers at 72 MHz
    let mut rcc = dp.RCC.constrain();
    let clocks = rcc
        .cfgr
        .hse(HSEClock::new(25_000_000.Hz(), HSEClockMode::Bypass))
        .sysclk(144_000_000.Hz())
        .hclk(144_000_000.Hz())
        .pclk1(36_000_000.Hz())
        .pclk2(72_000_000.Hz())
        .freeze();

    // GPIO
    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB);

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: 115_200.bps(),
        ..Default::default()
    };
    let serial = Serial::new(
        dp.USART1,
        (pins.usart1.tx, pins.usart1.rx),
        &clocks,
        usart_cfg,
    );
    let mut console = Console::new(serial);
    print_banner(&mut console, &clocks);

    // Status outputs
    let mut status1 = StatusLine::active_high(pins.status.bus1);
    let mut status2 = StatusLine::active_high(pins.status.bus2);

    // CAN1 must be clocked before CAN2 can be used.
    let can1 = Can::new(dp.CAN1, &mut rcc.apb1, (pins.can1.tx, pins.can1.rx));
    let mut can1 = CanBus::new(can1, &BUS1.timing, LOOPBACK, LOOPBACK);
    let can2 = Can::new(dp.CAN2, &mut rcc.apb1, (pins.can2.tx, pins.can2.rx));
    let mut can2 = CanBus::new(can2, &BUS2.timing, LOOPBACK, LOOPBACK);

    can1.configure_filters(&BUS1, &BUS2, CAN2_FILTER_START);
    can1.listen();
    can2.listen();

    // Tick alarms
    let fine = Alarm::tim3(dp.TIM3, &clocks, FINE_PERIOD);
    let coarse = Alarm::tim4(dp.TIM4, &clocks, COARSE_PERIOD);

    let mut bridge = Bridge::new(BridgeConfig::DEFAULT, &SHARED);

    cortex_m::interrupt::free(|cs| {
        G_CAN1.borrow(cs).replace(Some(can1));
        G_CAN2.borrow(cs).replace(Some(can2));
        G_FINE.borrow(cs).replace(Some(fine));
        G_COARSE.borrow(cs).replace(Some(coarse));
    });

    // The upper four bits of the priority byte are implemented.
    unsafe {
        cp.NVIC.set_priority(Interrupt::CAN1_RX0, 0x00);
        cp.NVIC.set_priority(Interrupt::CAN2_RX0, 0x10);
        cp.NVIC.set_priority(Interrupt::TIM4, 0x20);
        cp.NVIC.set_priority(Interrupt::TIM3, 0x30);

        NVIC::unmask(Interrupt::CAN1_RX0);
        NVIC::unmask(Interrupt::CAN2_RX0);
        NVIC::unmask(Interrupt::TIM4);
        NVIC::unmask(Interrupt::TIM3);
    }

    console.println("bridge running");

    let mut bus2 = SharedCan2;
    loop {
        let outputs = bridge.poll(&SHARED, &mut bus2, |event| {
            console.log(SHARED.fine_ticks.count(), &event)
        });
        status1.set(outputs.line(BusId::Bus1));
        status2.set(outputs.line(BusId::Bus2));
    }
}

fn print_banner<U: serial::Instance>(console: &mut Console<U>, clocks: &Clocks) {
    console.println("");
    console.println("surround-view CAN bridge");

    let pclk1 = clocks.pclk1().raw();
    if pclk1 != CAN_CLOCK_HZ {
        let _ = write!(
            console,
            "warning: APB1 at {} Hz, bit timing assumes {} Hz\r\n",
            pclk1, CAN_CLOCK_HZ
        );
    }
    if LOOPBACK {
        console.println("loopback + silent mode");
    }

    for link in [&BUS1, &BUS2] {
        print_link(console, link, pclk1);
    }
}

fn print_link<U: serial::Instance>(console: &mut Console<U>, link: &LinkConfig, pclk1: u32) {
    let _ = write!(
        console,
        "{}: {} bit/s, BTR 0x{:08X}\r\n",
        link.bus,
        link.timing.bitrate(pclk1),
        link.timing.btr()
    );
    for (bank, id) in link.filters() {
        let _ = write!(console, "  bank {:>2}: id 0x{:03X}\r\n", bank, id);
    }
    if let Some((id, echo)) = link.echo() {
        let _ = write!(console, "  echo 0x{:03X} {:02X?}\r\n", id, echo);
    }
}

/// Transmit side of CAN2 as seen from the main loop.
struct SharedCan2;

impl FrameSink for SharedCan2 {
    fn send(&mut self, frame: &Frame) {
        cortex_m::interrupt::free(|cs| {
            if let Some(can) = G_CAN2.borrow(cs).borrow_mut().as_mut() {
                can.send(frame);
            }
        });
    }
}

/// Take a peripheral out of its global slot on the first call from a handler.
fn claim<'a, T>(local: &'a mut Option<T>, global: &Mutex<RefCell<Option<T>>>) -> Option<&'a mut T> {
    if local.is_none() {
        *local = cortex_m::interrupt::free(|cs| global.borrow(cs).take());
    }
    local.as_mut()
}

#[interrupt]
fn CAN1_RX0() {
    static mut CAN: Option<Can1> = None;

    if let Some(can) = claim(CAN, &G_CAN1) {
        if let Some(frame) = can.try_receive() {
            BUS1_LINK.on_frame(&frame, &SHARED, can);
        }
    }
}

#[interrupt]
fn CAN2_RX0() {
    cortex_m::interrupt::free(|cs| {
        if let Some(can) = G_CAN2.borrow(cs).borrow_mut().as_mut() {
            if let Some(frame) = can.try_receive() {
                BUS2_LINK.on_frame(&frame, &SHARED, can);
            }
        }
    });
}

#[interrupt]
fn TIM3() {
    static mut ALARM: Option<FineAlarm> = None;

    if let Some(alarm) = claim(ALARM, &G_FINE) {
        if alarm.on_update() {
            SHARED.fine_ticks.record();
        }
    }
}

#[interrupt]
fn TIM4() {
    static mut ALARM: Option<CoarseAlarm> = None;

    if let Some(alarm) = claim(ALARM, &G_COARSE) {
        if alarm.on_update() {
            SHARED.coarse_ticks.record();
        }
    }
}
