//! Async services shared by Addrbook front ends

mod address_book;

pub use address_book::{AddressBookService, CreateOutcome, RegistrationOutcome};
