//! Recording doubles for the collaborators of the pairing service.
//!
//! Each double hands out a cheap clone of its shared state so that tests can
//! keep inspecting what happened after the double has been moved into the
//! service.

use crate::drivers::led::matrix::PairingFrame;
use crate::traits::{
    bootloader::Bootloader,
    display::PairingDisplay,
    gatt::{CharacteristicHandles, GattServer, Handle, ServiceDescriptor},
};
use core::cell::{Cell, RefCell};
use embassy_time::Duration;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayOp {
    Scroll(String),
    Frame(PairingFrame),
    Clear,
}

#[derive(Default)]
struct DisplayState {
    ops: RefCell<Vec<DisplayOp>>,
    fail: Cell<bool>,
}

/// Display that records every operation and the frame it would show.
#[derive(Clone, Default)]
pub struct TestDisplay {
    state: Rc<DisplayState>,
}

impl TestDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> Vec<DisplayOp> {
        self.state.ops.borrow().clone()
    }

    pub fn take_ops(&self) -> Vec<DisplayOp> {
        self.state.ops.borrow_mut().drain(..).collect()
    }

    /// The frame currently left on the display, if any.
    pub fn current(&self) -> Option<PairingFrame> {
        match self.state.ops.borrow().last() {
            Some(DisplayOp::Frame(frame)) => Some(*frame),
            _ => None,
        }
    }

    /// Make every following operation fail.
    pub fn set_failing(&self, fail: bool) {
        self.state.fail.set(fail);
    }

    fn record(&self, op: DisplayOp) -> Result<(), TestError> {
        if self.state.fail.get() {
            return Err(TestError);
        }
        self.state.ops.borrow_mut().push(op);
        Ok(())
    }
}

impl PairingDisplay for TestDisplay {
    type Error = TestError;

    async fn scroll(&mut self, text: &str, _: Duration) -> Result<(), Self::Error> {
        self.record(DisplayOp::Scroll(text.to_string()))
    }

    fn show_frame(&mut self, frame: PairingFrame) -> Result<(), Self::Error> {
        self.record(DisplayOp::Frame(frame))
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        self.record(DisplayOp::Clear)
    }
}

#[derive(Default)]
struct RadioState {
    values: RefCell<HashMap<Handle, Vec<u8>>>,
    notifications: RefCell<Vec<(Handle, Vec<u8>)>>,
    next_handle: Cell<u16>,
    fail: Cell<bool>,
}

/// GATT server keeping attribute values in memory.
///
/// Handles are allocated the way a stack lays out its attribute table: a
/// declaration, the value, and a CCCD for notifiable characteristics.
#[derive(Clone, Default)]
pub struct TestRadio {
    state: Rc<RadioState>,
}

impl TestRadio {
    pub fn new() -> Self {
        let radio = Self::default();
        radio.state.next_handle.set(0x0010);
        radio
    }

    pub fn value(&self, handle: Handle) -> Option<Vec<u8>> {
        self.state.values.borrow().get(&handle).cloned()
    }

    pub fn notifications(&self) -> Vec<(Handle, Vec<u8>)> {
        self.state.notifications.borrow().clone()
    }

    /// Store a value as if a client had written it.
    pub fn client_write(&self, handle: Handle, value: &[u8]) {
        self.state.values.borrow_mut().insert(handle, value.to_vec());
    }

    pub fn set_failing(&self, fail: bool) {
        self.state.fail.set(fail);
    }

    fn allocate(&self) -> Handle {
        let h = self.state.next_handle.get();
        self.state.next_handle.set(h + 1);
        Handle(h)
    }

    fn check(&self) -> Result<(), TestError> {
        if self.state.fail.get() {
            Err(TestError)
        } else {
            Ok(())
        }
    }
}

impl GattServer for TestRadio {
    type Error = TestError;

    fn register<const N: usize>(
        &mut self,
        service: &ServiceDescriptor,
    ) -> Result<[CharacteristicHandles; N], Self::Error> {
        self.check()?;
        if service.characteristics.len() != N {
            return Err(TestError);
        }
        // service declaration
        self.allocate();
        Ok(core::array::from_fn(|i| {
            let c = &service.characteristics[i];
            // characteristic declaration
            self.allocate();
            let value = self.allocate();
            let cccd = if c.properties.notify {
                Some(self.allocate())
            } else {
                None
            };
            self.client_write(value, &vec![0; c.len]);
            CharacteristicHandles { value, cccd }
        }))
    }

    fn set_value(&mut self, handle: Handle, value: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        self.state
            .values
            .borrow_mut()
            .insert(handle, value.to_vec());
        Ok(())
    }

    fn notify(&mut self, handle: Handle, value: &[u8]) -> Result<(), Self::Error> {
        self.check()?;
        self.state
            .notifications
            .borrow_mut()
            .push((handle, value.to_vec()));
        Ok(())
    }
}

/// Bootloader that panics instead of resetting.
///
/// Catch the unwind with [`std::panic::catch_unwind`] and check [`entered`](Self::entered).
#[derive(Clone, Default)]
pub struct TestBootloader {
    entered: Rc<Cell<bool>>,
}

impl TestBootloader {
    pub const PANIC_MESSAGE: &'static str = "entered bootloader";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn entered(&self) -> bool {
        self.entered.get()
    }
}

impl Bootloader for TestBootloader {
    fn enter(&mut self) -> ! {
        self.entered.set(true);
        panic!("{}", Self::PANIC_MESSAGE)
    }
}
