//! Device identity derived values.
//!
//! Every device in a classroom runs identical firmware, so the only thing that
//! tells them apart is the hardware unique id. Both the friendly name and the
//! flash code are pure functions of that id and therefore survive reboots
//! without any persistent storage.

use core::fmt::{Debug, Display, Formatter};
use heapless::String;

/// Number of columns in the histogram, and the number of digits in a flash code.
pub const HISTOGRAM_WIDTH: usize = 5;
/// Number of rows in the histogram, and the radix of each flash code digit.
pub const HISTOGRAM_HEIGHT: usize = 5;

/// Number of distinct flash codes a histogram can show (5^5).
pub const FLASH_CODE_SPACE: u32 = pow(HISTOGRAM_HEIGHT as u32, HISTOGRAM_WIDTH as u32);

const fn pow(base: u32, exp: u32) -> u32 {
    let mut v = 1;
    let mut i = 0;
    while i < exp {
        v *= base;
        i += 1;
    }
    v
}

/// Hardware unique identifier, read once at startup.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceId(pub u64);

impl DeviceId {
    /// Build an id from the two 32 bit words most nRF parts expose in FICR.
    pub const fn from_words(low: u32, high: u32) -> Self {
        Self(((high as u64) << 32) | low as u64)
    }

    pub fn flash_code(&self) -> FlashCode {
        FlashCode::derive(*self)
    }

    pub fn name(&self) -> FriendlyName {
        FriendlyName::derive(*self)
    }
}

impl Debug for DeviceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "DeviceId({:016x})", self.0)
    }
}

impl From<u64> for DeviceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Per-device passcode released to an authenticated client.
///
/// The value is always below [`FLASH_CODE_SPACE`] so that it can be shown on
/// the LED matrix as five base-5 digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashCode(u32);

impl FlashCode {
    pub const fn derive(id: DeviceId) -> Self {
        Self((id.0 % FLASH_CODE_SPACE as u64) as u32)
    }

    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Base-5 digits, least significant first.
    ///
    /// Digit `i` is drawn in column `HISTOGRAM_WIDTH - 1 - i`.
    pub const fn digits(&self) -> [u8; HISTOGRAM_WIDTH] {
        let mut digits = [0; HISTOGRAM_WIDTH];
        let mut n = self.0;
        let mut i = 0;
        while i < HISTOGRAM_WIDTH {
            digits[i] = (n % HISTOGRAM_HEIGHT as u32) as u8;
            n /= HISTOGRAM_HEIGHT as u32;
            i += 1;
        }
        digits
    }

    /// Little endian characteristic representation.
    pub const fn to_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl From<FlashCode> for u32 {
    fn from(code: FlashCode) -> u32 {
        code.0
    }
}

// Alternating consonant/vowel rows keep names pronounceable.
const CODEBOOK: [[u8; HISTOGRAM_HEIGHT]; HISTOGRAM_WIDTH] = [
    *b"zvgpt",
    *b"uoiea",
    *b"zvgpt",
    *b"uoiea",
    *b"zvgpt",
];

/// Short pronounceable name, spelling out the same digits as the histogram.
#[derive(Clone, PartialEq, Eq)]
pub struct FriendlyName(String<HISTOGRAM_WIDTH>);

impl FriendlyName {
    pub fn derive(id: DeviceId) -> Self {
        let digits = FlashCode::derive(id).digits();
        let mut name: String<HISTOGRAM_WIDTH> = String::new();
        // Written left to right, so walk the digits from the most significant one.
        for i in (0..HISTOGRAM_WIDTH).rev() {
            // Every codebook entry is ASCII and the buffer holds exactly WIDTH chars.
            let _ = name.push(CODEBOOK[i][digits[i] as usize] as char);
        }
        Self(name)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Copy the name into `buf`, returning the number of bytes written.
    ///
    /// # Panics
    ///
    /// If `buf` is shorter than [`HISTOGRAM_WIDTH`] bytes.
    pub fn write_to(&self, buf: &mut [u8]) -> usize {
        let bytes = self.as_bytes();
        buf[..bytes.len()].copy_from_slice(bytes);
        bytes.len()
    }
}

impl Debug for FriendlyName {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl Display for FriendlyName {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for FriendlyName {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "{}", self.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_code_is_bounded() {
        for id in [0, 1, 3124, 3125, 0xdead_beef, u32::MAX as u64, u64::MAX] {
            let code = FlashCode::derive(DeviceId(id));
            assert!(code.value() < FLASH_CODE_SPACE);
            assert!(code.digits().iter().all(|d| (*d as usize) < HISTOGRAM_HEIGHT));
        }
        assert_eq!(3125, FLASH_CODE_SPACE);
    }

    #[test]
    fn flash_code_is_deterministic() {
        let id = DeviceId::from_words(0x1234_5678, 0x9abc_def0);
        assert_eq!(id.flash_code(), id.flash_code());
        assert_eq!(id.flash_code(), DeviceId(0x9abc_def0_1234_5678).flash_code());
    }

    #[test]
    fn digits_are_base5() {
        // 4*625 + 3*125 + 2*25 + 1*5 + 0
        let code = FlashCode::derive(DeviceId(2930));
        assert_eq!([0, 1, 2, 3, 4], code.digits());
        assert_eq!([0x72, 0x0b, 0, 0], code.to_bytes());
    }

    #[test]
    fn name_spells_digits() {
        assert_eq!("zuzuz", DeviceId(0).name().as_str());
        assert_eq!("tegoz", DeviceId(2930).name().as_str());
        assert_eq!("tatat", DeviceId(3124).name().as_str());
    }

    #[test]
    fn name_is_deterministic() {
        let id = DeviceId(0xcafe_f00d);
        assert_eq!(id.name(), id.name());

        let mut buf = [0; 8];
        let n = id.name().write_to(&mut buf);
        assert_eq!(HISTOGRAM_WIDTH, n);
        assert_eq!(id.name().as_bytes(), &buf[..n]);
    }
}
