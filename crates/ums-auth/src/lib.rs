//! User Management Authentication and Authorization
//!
//! This crate provides the security layer of the user management service:
//! bcrypt password encoding, user-detail lookup, the authentication
//! manager, server-side login sessions and the URL access rules enforced
//! by the security filter middleware.

pub mod access;
pub mod error;
pub mod manager;
pub mod middleware;
pub mod password;
pub mod session;
pub mod user_details;

pub use access::{Access, AccessRules, DEFAULT_PUBLIC_PATHS};
pub use error::AuthError;
pub use manager::AuthenticationManager;
pub use middleware::{security_filter, CurrentUser, WebSecurity};
pub use password::{MAX_PASSWORD_BYTES, MIN_PASSWORD_LENGTH, PasswordEncoder};
pub use session::{MAX_TIMEOUT_MINUTES, SessionConfig, SessionManager, spawn_purge_task};
pub use user_details::{DatabaseUserDetailsService, UserDetails, UserDetailsService};
