#![macro_use]
#![cfg_attr(not(feature = "std"), no_std)]
#![allow(async_fn_in_trait)]
//! Drogue Pairing is a small BLE service for classroom devices that all run the same firmware.
//!
//! It lets a student find their own device among many identical ones, pair a
//! BLE client with it, hand the client a per-device flash code that gates
//! firmware updates, and always offers a way into the update bootloader even
//! when the application misbehaves.
//!
//! # Flow
//!
//! * At boot with the pairing gesture held, [`PairingService::pair`] scrolls a
//!   hint and leaves the device's flash code on the LED matrix as a histogram.
//! * The client bonds, which the stack reports as [`PairingEvent::Bonded`]. The
//!   device shows a check mark and is now authenticated.
//! * The client writes the flash code characteristic. Once authenticated the
//!   code is published and notified; a request made earlier is latched.
//! * Writing `1` to the control characteristic resets into the bootloader
//!   regardless of pairing state. Writing `2` restarts pairing.
//!
//! # Example
//!
//! ```ignore
//! static INBOX: PairingInbox<NoopRawMutex, 4> = PairingInbox::new();
//!
//! let mut service = PairingService::new(
//!     PairingConfig::default(),
//!     &|| device_id_from_ficr(),
//!     display,
//!     gatt,
//!     ResetBootloader::new(|| set_gpregret(0xB1)),
//! )?;
//! if buttons_held {
//!     service.pair().await?;
//! }
//! service.run(&INBOX).await;
//! ```

pub(crate) mod fmt;

pub mod actors;
pub mod domain;
pub mod drivers;
pub mod traits;

pub use actors::ble::gatt::pairing::PairingInbox;
pub use domain::identity::{DeviceId, FlashCode, FriendlyName};
pub use drivers::ble::gatt::pairing::{
    Error, Opcode, PairingConfig, PairingEvent, PairingService, PairingState, ServiceHandles,
    WriteEvent,
};

#[cfg(feature = "std")]
pub mod testutil;
