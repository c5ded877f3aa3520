//! Remittance module: bank layouts and batch file generation

pub mod bradesco;
pub mod itau;
pub mod layout;
pub mod writer;

pub use bradesco::Bradesco;
pub use itau::Itau;
pub use layout::{layout_for, BankLayout};
pub use writer::{RemittanceFile, RemittanceFileWriter};
