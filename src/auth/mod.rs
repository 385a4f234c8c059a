//! Authentication: session storage, account flows, form validation.

pub mod service;
pub mod session;
pub mod store;
pub mod validation;

pub use service::{AccessDecision, AuthError, AuthService};
pub use session::{AuthEvent, AuthSession};
pub use store::{CookieStore, FileCookieStore, MemoryCookieStore, StoreError, StoredCookie};
pub use validation::{PasswordRequirements, RegistrationForm, ValidationError};
