//! Minimal view of a GATT server, enough to host one service.

/// Attribute handle assigned by the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handle(pub u16);

/// 128 bit UUID, stored big endian as written in text form.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Uuid(pub [u8; 16]);

impl Uuid {
    /// Wire order used by the attribute protocol.
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = self.0;
        out.reverse();
        out
    }
}

impl core::fmt::Debug for Uuid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                write!(f, "-")?;
            }
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Uuid {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{=[u8]:x}", &self.0[..]);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Properties {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicDescriptor {
    pub uuid: Uuid,
    pub properties: Properties,
    /// Fixed value length in bytes.
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServiceDescriptor {
    pub uuid: Uuid,
    pub characteristics: &'static [CharacteristicDescriptor],
}

/// Handles for a registered characteristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CharacteristicHandles {
    pub value: Handle,
    /// Client characteristic configuration descriptor, present for notifiable characteristics.
    pub cccd: Option<Handle>,
}

pub trait GattServer {
    type Error;

    /// Register `service`, returning the handles of its characteristics in
    /// declaration order.
    fn register<const N: usize>(
        &mut self,
        service: &ServiceDescriptor,
    ) -> Result<[CharacteristicHandles; N], Self::Error>;

    /// Update the locally stored value of an attribute.
    fn set_value(&mut self, handle: Handle, value: &[u8]) -> Result<(), Self::Error>;

    /// Send a notification carrying `value` to the connected client.
    fn notify(&mut self, handle: Handle, value: &[u8]) -> Result<(), Self::Error>;
}
