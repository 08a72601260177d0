// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

pub mod alarm;
pub mod can;
pub mod pins;
pub mod status;
pub mod usart;

pub use alarm::Alarm;
pub use can::CanBus;
pub use pins::BoardPins;
pub use status::StatusLine;
pub use usart::Console;
