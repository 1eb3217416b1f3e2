//! Route guards
//!
//! Every access decision in the service goes through [`authorize`]; nothing
//! else inspects roles or the block flag.

use crate::{error::ShopError, models::UserProfile};

/// Which audience a route is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteGuard {
    /// Login and registration: only for visitors without a session
    Public,
    /// Shopper routes: cart, wishlist, checkout, order history
    Protected,
    /// Back-office routes
    Admin,
}

/// Outcome of a guard check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    RedirectHome,
    RedirectLogin,
    BlockNotice,
    NotAuthorized,
}

impl Access {
    /// `Ok` for [`Access::Allow`], the matching error otherwise
    pub fn into_result(self) -> Result<(), ShopError> {
        match self {
            Access::Allow => Ok(()),
            Access::RedirectHome => Err(ShopError::AlreadyAuthenticated),
            Access::RedirectLogin => Err(ShopError::Unauthorized),
            Access::BlockNotice => Err(ShopError::AccountBlocked),
            Access::NotAuthorized => Err(ShopError::NotAuthorized),
        }
    }
}

/// Decide whether `user` may enter a route protected by `guard`
pub fn authorize(guard: RouteGuard, user: Option<&UserProfile>) -> Access {
    match (guard, user) {
        (RouteGuard::Public, Some(_)) => Access::RedirectHome,
        (RouteGuard::Public, None) => Access::Allow,

        (RouteGuard::Protected, None) => Access::RedirectLogin,
        (RouteGuard::Protected, Some(user)) if user.is_blocked => Access::BlockNotice,
        (RouteGuard::Protected, Some(user)) if user.role.is_admin() => Access::NotAuthorized,
        (RouteGuard::Protected, Some(_)) => Access::Allow,

        (RouteGuard::Admin, Some(user)) if user.role.is_admin() => {
            if user.is_blocked {
                Access::BlockNotice
            } else {
                Access::Allow
            }
        }
        (RouteGuard::Admin, _) => Access::NotAuthorized,
    }
}
