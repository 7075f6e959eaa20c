//! Authentication state trait and macro.

use super::session::SessionManager;

/// Trait for state types that can authenticate requests.
pub trait HasAuthBackend {
    fn sessions(&self) -> &SessionManager;
    fn secure_cookies(&self) -> bool;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `sessions: SessionManager`
/// - `secure_cookies: bool`
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct CatalogState {
///     pub sessions: SessionManager,
///     pub secure_cookies: bool,
/// }
///
/// impl_has_auth_backend!(CatalogState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn sessions(&self) -> &$crate::auth::SessionManager {
                &self.sessions
            }
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
