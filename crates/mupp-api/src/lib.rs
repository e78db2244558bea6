#![allow(missing_docs)]

pub mod client;
pub mod error;
pub mod session;
pub mod signup;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::{ApiError, GENERIC_ERROR_MESSAGE, SignUpError};
pub use session::{
    SESSION_COOKIE, SESSION_HEADER, SessionKey, parse_cookie_header, session_from_cookies,
};
pub use signup::{
    CONFIRM_PASSWORD_FIELD, EMAIL_FIELD, PASSWORD_FIELD, PASSWORD_MISMATCH_MESSAGE, SignupForm,
    USERNAME_FIELD,
};
