//! Pairing and firmware update gate service.
//!
//! Lets a classroom of identical devices be told apart and paired with a BLE
//! client, releases a per-device flash code to a paired client, and offers an
//! unconditional way into the firmware update bootloader for devices whose
//! application has stopped responding.
//!
//! This is not a secure authentication scheme. Anyone able to observe the
//! radio link can learn the flash code.

use crate::domain::identity::{DeviceId, FlashCode, FriendlyName};
use crate::traits::{
    bootloader::Bootloader,
    display::PairingDisplay,
    gatt::{CharacteristicDescriptor, GattServer, Handle, Properties, ServiceDescriptor, Uuid},
    identity::DeviceIdentity,
};
use embassy_time::Duration;
use heapless::Vec;

pub const SERVICE_UUID: Uuid = Uuid([
    0xe9, 0x5d, 0x93, 0xb0, 0x25, 0x1d, 0x47, 0x0a, 0xa0, 0x62, 0xfa, 0x19, 0x22, 0xdf, 0xa9, 0xa8,
]);
pub const CONTROL_UUID: Uuid = Uuid([
    0xe9, 0x5d, 0x93, 0xb1, 0x25, 0x1d, 0x47, 0x0a, 0xa0, 0x62, 0xfa, 0x19, 0x22, 0xdf, 0xa9, 0xa8,
]);
pub const FLASH_CODE_UUID: Uuid = Uuid([
    0xe9, 0x5d, 0x93, 0xb2, 0x25, 0x1d, 0x47, 0x0a, 0xa0, 0x62, 0xfa, 0x19, 0x22, 0xdf, 0xa9, 0xa8,
]);

pub const SERVICE: ServiceDescriptor = ServiceDescriptor {
    uuid: SERVICE_UUID,
    characteristics: &[
        // Opcode
        CharacteristicDescriptor {
            uuid: CONTROL_UUID,
            properties: Properties {
                read: false,
                write: true,
                notify: false,
            },
            len: 1,
        },
        // Flash code, u32 little endian
        CharacteristicDescriptor {
            uuid: FLASH_CODE_UUID,
            properties: Properties {
                read: true,
                write: true,
                notify: true,
            },
            len: 4,
        },
    ],
};

/// Largest write payload accepted with the default ATT MTU.
pub const ATT_PAYLOAD_MAX: usize = 20;

/// Value of the flash code characteristic while no client is authenticated.
pub const NON_INFORMATIVE: [u8; 4] = [0; 4];

const CCCD_NOTIFY: u8 = 0x01;

/// Control characteristic opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Opcode {
    /// Reset into the firmware update bootloader. Never gated on pairing.
    StartDfu = 1,
    /// (Re)start the pairing flow.
    StartPair = 2,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Opcode::StartDfu),
            2 => Ok(Opcode::StartPair),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingState {
    Idle,
    ShowingIdentity,
    AwaitingAcknowledgement,
    Authenticated,
    CodeReleased,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    Display,
    Radio,
    Registration,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Display => write!(f, "display update failed"),
            Error::Radio => write!(f, "characteristic update failed"),
            Error::Registration => write!(f, "service registration failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// A client write to one of the attributes of this service.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WriteEvent {
    pub handle: Handle,
    pub data: Vec<u8, ATT_PAYLOAD_MAX>,
}

impl WriteEvent {
    /// Payloads longer than [`ATT_PAYLOAD_MAX`] are truncated.
    pub fn new(handle: Handle, data: &[u8]) -> Self {
        let len = data.len().min(ATT_PAYLOAD_MAX);
        let mut v = Vec::new();
        // Fits by construction
        let _ = v.extend_from_slice(&data[..len]);
        Self { handle, data: v }
    }
}

/// Events delivered by the BLE stack.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PairingEvent {
    Write(WriteEvent),
    /// The client finished bonding with the device.
    Bonded,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceHandles {
    pub control: Handle,
    pub flash_code: Handle,
    pub flash_code_cccd: Handle,
}

#[derive(Debug, Clone, Copy)]
pub struct PairingConfig {
    /// Scrolled before the histogram is shown.
    pub hint: &'static str,
    pub scroll_delay: Duration,
    /// Scrolled right before resetting into the bootloader.
    pub boot_message: Option<&'static str>,
    /// Drop an existing authentication when pairing starts again.
    pub reset_on_repair: bool,
}

impl PairingConfig {
    pub const DEFAULT: PairingConfig = PairingConfig {
        hint: "PAIRING MODE",
        scroll_delay: Duration::from_millis(120),
        boot_message: None,
        reset_on_repair: true,
    };

    pub const fn with_hint(mut self, hint: &'static str) -> Self {
        self.hint = hint;
        self
    }

    pub const fn with_scroll_delay(mut self, scroll_delay: Duration) -> Self {
        self.scroll_delay = scroll_delay;
        self
    }

    pub const fn with_boot_message(mut self, boot_message: &'static str) -> Self {
        self.boot_message = Some(boot_message);
        self
    }

    pub const fn with_reset_on_repair(mut self, reset_on_repair: bool) -> Self {
        self.reset_on_repair = reset_on_repair;
        self
    }
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Pairing state machine together with the control point protocol.
///
/// One instance lives for the powered-on session of the device. Nothing is
/// persisted: every boot starts out unauthenticated.
pub struct PairingService<D, G, B>
where
    D: PairingDisplay,
    G: GattServer,
    B: Bootloader,
{
    config: PairingConfig,
    display: D,
    gatt: G,
    bootloader: B,
    handles: ServiceHandles,
    id: DeviceId,
    flash_code: FlashCode,
    phase: PairingState,
    authenticated: bool,
    released: bool,
    flash_code_requested: bool,
    notifications_enabled: bool,
    control: u8,
}

impl<D, G, B> PairingService<D, G, B>
where
    D: PairingDisplay,
    G: GattServer,
    B: Bootloader,
{
    /// Register the service with `gatt` and publish the initial values.
    ///
    /// The bootloader is required up front: without it the update escape
    /// hatch would not exist.
    pub fn new<I: DeviceIdentity>(
        config: PairingConfig,
        identity: &I,
        display: D,
        mut gatt: G,
        bootloader: B,
    ) -> Result<Self, Error> {
        let [control, flash_code] = gatt.register::<2>(&SERVICE).map_err(|_| Error::Registration)?;
        let handles = ServiceHandles {
            control: control.value,
            flash_code: flash_code.value,
            flash_code_cccd: flash_code.cccd.ok_or(Error::Registration)?,
        };

        gatt.set_value(handles.control, &[0])
            .map_err(|_| Error::Radio)?;
        gatt.set_value(handles.flash_code, &NON_INFORMATIVE)
            .map_err(|_| Error::Radio)?;

        let id = identity.device_id();
        info!(
            "Pairing service registered for '{}' (control {:?}, flash code {:?})",
            id.name().as_str(),
            handles.control,
            handles.flash_code
        );

        Ok(Self {
            config,
            display,
            gatt,
            bootloader,
            handles,
            id,
            flash_code: id.flash_code(),
            phase: PairingState::Idle,
            authenticated: false,
            released: false,
            flash_code_requested: false,
            notifications_enabled: false,
            control: 0,
        })
    }

    pub fn state(&self) -> PairingState {
        match (self.authenticated, self.released) {
            (true, true) => PairingState::CodeReleased,
            (true, false) => PairingState::Authenticated,
            _ => self.phase,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn flash_code_requested(&self) -> bool {
        self.flash_code_requested
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Last byte written to the control characteristic.
    pub fn control_byte(&self) -> u8 {
        self.control
    }

    pub fn flash_code(&self) -> FlashCode {
        self.flash_code
    }

    pub fn device_id(&self) -> DeviceId {
        self.id
    }

    pub fn handles(&self) -> ServiceHandles {
        self.handles
    }

    pub fn name(&self) -> FriendlyName {
        self.id.name()
    }

    /// Write the friendly name into `buf` and return its length.
    ///
    /// `buf` must hold at least [`HISTOGRAM_WIDTH`](crate::domain::identity::HISTOGRAM_WIDTH) bytes.
    pub fn get_name(&self, buf: &mut [u8]) -> usize {
        self.name().write_to(buf)
    }

    /// Run the visual pairing flow: scroll the hint, then leave the flash code
    /// histogram on the display until a client acknowledges.
    ///
    /// Blocks for as long as the scroll takes.
    pub async fn pair(&mut self) -> Result<(), Error> {
        if self.authenticated && self.config.reset_on_repair {
            self.reset_authentication()?;
        }

        info!("Entering pairing mode as '{}'", self.name().as_str());
        self.phase = PairingState::ShowingIdentity;
        self.display
            .scroll(self.config.hint, self.config.scroll_delay)
            .await
            .map_err(|_| Error::Display)?;
        self.display
            .show_histogram(self.flash_code)
            .map_err(|_| Error::Display)?;
        self.phase = PairingState::AwaitingAcknowledgement;
        debug!("Awaiting pairing acknowledgement");
        Ok(())
    }

    /// A client completed bonding while the histogram was showing.
    pub fn acknowledge(&mut self) -> Result<(), Error> {
        if self.authenticated {
            trace!("Already authenticated");
            return Ok(());
        }
        if self.phase == PairingState::Idle {
            debug!("Ignoring acknowledgement outside of pairing mode");
            return Ok(());
        }

        self.authenticated = true;
        info!("Pairing acknowledged");
        let shown = self
            .display
            .show_acknowledgement()
            .map_err(|_| Error::Display);

        if self.flash_code_requested {
            debug!("Honoring flash code request made before pairing completed");
            self.release_flash_code()?;
        }
        shown
    }

    /// Publish the flash code to the client.
    ///
    /// Only has an effect while authenticated; callers are expected to check.
    pub fn release_flash_code(&mut self) -> Result<(), Error> {
        if !self.authenticated {
            trace!("Not releasing flash code, not authenticated");
            return Ok(());
        }

        let value = self.flash_code.to_bytes();
        self.gatt
            .set_value(self.handles.flash_code, &value)
            .map_err(|_| Error::Radio)?;
        self.released = true;
        self.flash_code_requested = false;

        if self.notifications_enabled {
            self.gatt
                .notify(self.handles.flash_code, &value)
                .map_err(|_| Error::Radio)?;
        }
        info!("Flash code released");
        Ok(())
    }

    /// Interpret a client write to one of our attributes.
    pub async fn on_data_written(&mut self, event: &WriteEvent) -> Result<(), Error> {
        if event.handle == self.handles.control {
            let Some(&byte) = event.data.first() else {
                trace!("Ignoring empty control write");
                return Ok(());
            };
            self.control = byte;
            match Opcode::try_from(byte) {
                Ok(Opcode::StartDfu) => {
                    self.prepare_bootloader().await;
                    self.bootloader.enter()
                }
                Ok(Opcode::StartPair) => {
                    debug!("Pairing requested by client");
                    self.pair().await
                }
                Err(other) => {
                    debug!("Ignoring unknown control opcode {}", other);
                    Ok(())
                }
            }
        } else if event.handle == self.handles.flash_code {
            self.flash_code_requested = true;
            if self.authenticated {
                self.release_flash_code()
            } else {
                debug!("Flash code requested before pairing, deferring");
                // Do not leave whatever the client wrote readable.
                self.gatt
                    .set_value(self.handles.flash_code, &NON_INFORMATIVE)
                    .map_err(|_| Error::Radio)
            }
        } else if event.handle == self.handles.flash_code_cccd {
            self.notifications_enabled = event.data.first().map_or(false, |b| b & CCCD_NOTIFY != 0);
            debug!("Flash code notifications enabled: {}", self.notifications_enabled);
            Ok(())
        } else {
            trace!("Ignoring write to foreign handle {:?}", event.handle);
            Ok(())
        }
    }

    /// Dispatch a single stack event.
    pub async fn handle(&mut self, event: &PairingEvent) -> Result<(), Error> {
        match event {
            PairingEvent::Write(write) => self.on_data_written(write).await,
            PairingEvent::Bonded => self.acknowledge(),
            PairingEvent::Disconnected => {
                debug!("Client disconnected");
                self.notifications_enabled = false;
                Ok(())
            }
        }
    }

    fn reset_authentication(&mut self) -> Result<(), Error> {
        debug!("Dropping existing pairing");
        // Hide the code first; stay authenticated if that fails.
        self.gatt
            .set_value(self.handles.flash_code, &NON_INFORMATIVE)
            .map_err(|_| Error::Radio)?;
        self.authenticated = false;
        self.released = false;
        self.flash_code_requested = false;
        Ok(())
    }

    async fn prepare_bootloader(&mut self) {
        warn!("Entering bootloader");
        // Display trouble must never block the way into the bootloader.
        let _ = self.display.clear();
        if let Some(message) = self.config.boot_message {
            let _ = self.display.scroll(message, self.config.scroll_delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcodes() {
        assert_eq!(Ok(Opcode::StartDfu), Opcode::try_from(1));
        assert_eq!(Ok(Opcode::StartPair), Opcode::try_from(2));
        for other in [0u8, 3, 0x80, 0xff] {
            assert_eq!(Err(other), Opcode::try_from(other));
        }
    }

    #[test]
    fn write_event_truncates() {
        let long = [0xaa; 32];
        let event = WriteEvent::new(Handle(3), &long);
        assert_eq!(ATT_PAYLOAD_MAX, event.data.len());

        let event = WriteEvent::new(Handle(3), &[1]);
        assert_eq!(&[1], &event.data[..]);
    }

    #[test]
    fn service_layout() {
        assert_eq!(2, SERVICE.characteristics.len());
        let control = &SERVICE.characteristics[0];
        assert_eq!(CONTROL_UUID, control.uuid);
        assert!(control.properties.write && !control.properties.notify);

        let code = &SERVICE.characteristics[1];
        assert_eq!(FLASH_CODE_UUID, code.uuid);
        assert!(code.properties.read && code.properties.notify);
        assert_eq!(NON_INFORMATIVE.len(), code.len);

        assert_eq!(0xa8, SERVICE_UUID.to_le_bytes()[0]);
    }

    #[test]
    fn config_builder() {
        let config = PairingConfig::default()
            .with_hint("HELLO")
            .with_boot_message("BOOT")
            .with_scroll_delay(Duration::from_millis(60))
            .with_reset_on_repair(false);
        assert_eq!("HELLO", config.hint);
        assert_eq!(Some("BOOT"), config.boot_message);
        assert_eq!(Duration::from_millis(60), config.scroll_delay);
        assert!(!config.reset_on_repair);

        let default = PairingConfig::DEFAULT;
        assert_eq!(None, default.boot_message);
        assert!(default.reset_on_repair);
    }
}
