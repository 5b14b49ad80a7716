pub mod gatt;
