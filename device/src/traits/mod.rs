pub mod bootloader;
pub mod display;
pub mod gatt;
pub mod identity;
