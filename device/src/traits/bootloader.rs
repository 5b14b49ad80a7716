/// Transfer of control into the resident firmware update bootloader.
pub trait Bootloader {
    /// Never returns: the device resets into the bootloader.
    fn enter(&mut self) -> !;
}
