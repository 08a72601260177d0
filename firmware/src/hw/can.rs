// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Controller Area Network (CAN) abstraction layer.
//!
//! - `CanBus` wraps a HAL `can::Can` instance in `bxcan::Can`.
//! - Reception is interrupt driven: [`CanBus::listen`] enables the FIFO0 message-pending
//!   interrupt and the handler pulls one frame per call with [`CanBus::try_receive`].
//! - Transmission never blocks. A frame is dropped when no mailbox is free.

use bxcan::{self, filter::Mask32, Fifo, Frame, Interrupts, StandardId};
use stm32f7xx_hal::can as hal_can;

use surround_bridge::link::{BitTiming, FrameSink, LinkConfig};

/// Wrapper around a bxcan CAN instance built from a HAL CAN peripheral.
pub struct CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    can: bxcan::Can<hal_can::Can<I>>,
}

impl<I> CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    /// Create and enable a bxcan instance from a HAL CAN peripheral.
    ///
    /// * `hal_can` – the HAL CAN wrapper
    /// * `timing` – bit timing, written to CAN_BTR
    /// * `loopback` – enable internal loopback
    /// * `silent` – enable silent mode
    ///
    /// Automatic retransmission is disabled: a frame that loses arbitration or is not
    /// acknowledged is not retried by the controller.
    pub fn new(hal_can: hal_can::Can<I>, timing: &BitTiming, loopback: bool, silent: bool) -> Self {
        let can = bxcan::Can::builder(hal_can)
            .set_bit_timing(timing.btr())
            .set_loopback(loopback)
            .set_silent(silent)
            .set_automatic_retransmit(false)
            .enable();

        Self { can }
    }

    /// Raise the RX0 interrupt whenever FIFO0 holds a frame.
    pub fn listen(&mut self) {
        self.can.enable_interrupts(Interrupts::FIFO0_MESSAGE_PENDING);
    }

    /// Pop one frame from the receive FIFO, if any.
    ///
    /// A FIFO overrun is reported by bxcan as an error; the frames that did fit are still
    /// delivered on later calls, so the overrun itself is ignored here.
    #[inline]
    pub fn try_receive(&mut self) -> Option<Frame> {
        self.can.receive().ok()
    }
}

impl<I> FrameSink for CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance,
{
    fn send(&mut self, frame: &Frame) {
        // WouldBlock means all three mailboxes hold higher-priority frames.
        let _ = self.can.transmit(frame);
    }
}

/// Extra helpers for CAN instances that own filters (CAN1 on STM32F7).
impl<I> CanBus<I>
where
    hal_can::Can<I>: bxcan::Instance + bxcan::FilterOwner + bxcan::MasterInstance,
{
    /// Program one 32-bit mask filter per rule of each link, all into FIFO0.
    ///
    /// This must be called on CAN1 (the filter owner). Banks below the split belong to CAN1,
    /// the rest to CAN2. The mask equals the identifier, so only its set bits are compared and
    /// some unrelated identifiers still pass; [`surround_bridge::Link`] drops those.
    pub fn configure_filters(&mut self, master: &LinkConfig, slave: &LinkConfig, split: u8) {
        let mut filters = self.can.modify_filters();
        filters.set_split(split).clear();
        for (bank, id) in master.filters() {
            if let Some(id) = StandardId::new(id) {
                filters.enable_bank(bank, Fifo::Fifo0, loose(id));
            }
        }

        let mut slave_filters = filters.slave_filters();
        slave_filters.clear();
        for (bank, id) in slave.filters() {
            if let Some(id) = StandardId::new(id) {
                slave_filters.enable_bank(bank, Fifo::Fifo0, loose(id));
            }
        }
    }
}

/// Filter comparing only the bits set in `id`.
fn loose(id: StandardId) -> Mask32 {
    Mask32::frames_with_std_id(id, id)
}
