pub mod catalog;
pub mod fiscal;
pub mod saft;
