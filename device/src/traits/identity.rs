use crate::domain::identity::DeviceId;

/// Accessor for the hardware unique id.
pub trait DeviceIdentity {
    fn device_id(&self) -> DeviceId;
}

impl DeviceIdentity for DeviceId {
    fn device_id(&self) -> DeviceId {
        *self
    }
}

impl<F> DeviceIdentity for F
where
    F: Fn() -> u64,
{
    fn device_id(&self) -> DeviceId {
        DeviceId(self())
    }
}
