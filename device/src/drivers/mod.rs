pub mod ble;
#[cfg(feature = "cortex-m")]
pub mod bootloader;
pub mod led;
