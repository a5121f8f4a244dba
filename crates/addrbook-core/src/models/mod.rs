//! Data models for Addrbook

mod entry;
mod form;
mod user;
mod validation;
mod version;

pub use entry::{Entry, EntryFields, EntryId};
pub use form::{EntryForm, EntryPatch, DATE_FORMAT};
pub use user::{RegistrationForm, UserId, UserProfile};
pub use validation::{ValidationErrors, NON_FIELD_ERRORS};
pub use version::EntryVersion;
