use crate::drivers::ble::gatt::pairing::{PairingEvent, PairingService};
use crate::traits::{bootloader::Bootloader, display::PairingDisplay, gatt::GattServer};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::channel::Channel;

/// Inbox the BLE stack pushes events into.
pub type PairingInbox<M, const N: usize> = Channel<M, PairingEvent, N>;

impl<D, G, B> PairingService<D, G, B>
where
    D: PairingDisplay,
    G: GattServer,
    B: Bootloader,
{
    /// Serve events from `inbox`, one at a time, forever.
    pub async fn run<M: RawMutex, const N: usize>(&mut self, inbox: &PairingInbox<M, N>) {
        loop {
            let event = inbox.receive().await;
            if let Err(e) = self.handle(&event).await {
                warn!("Error handling pairing event: {:?}", e);
            }
        }
    }
}
