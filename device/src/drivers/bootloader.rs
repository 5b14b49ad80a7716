use crate::traits::bootloader::Bootloader;

/// Enter the bootloader through a system reset.
///
/// `prepare` runs first and should leave whatever marker the bootloader looks
/// for on reset, such as a retention register value.
pub struct ResetBootloader<F>
where
    F: FnMut(),
{
    prepare: F,
}

impl<F> ResetBootloader<F>
where
    F: FnMut(),
{
    pub fn new(prepare: F) -> Self {
        Self { prepare }
    }
}

impl<F> Bootloader for ResetBootloader<F>
where
    F: FnMut(),
{
    fn enter(&mut self) -> ! {
        (self.prepare)();
        trace!("Resetting device");
        cortex_m::peripheral::SCB::sys_reset()
    }
}
