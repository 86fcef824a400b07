//! Pre-navigation policy
//!
//! Checks run in a fixed order and the first match wins, so an authenticated
//! user hitting the login page is bounced before any permission check runs.

use serde::Serialize;

use crate::config::RouteConfig;
use crate::router::ResolvedRoute;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectReason {
    LoginRequired,
    AlreadyAuthenticated,
    RootToHome,
    PermissionDenied,
    NotFound,
    Unavailable,
}

impl RedirectReason {
    /// Redirects that also close the tab of the rejected path
    pub fn closes_tab(&self) -> bool {
        matches!(self, RedirectReason::PermissionDenied | RedirectReason::Unavailable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect { to: String, reason: RedirectReason },
}

impl GuardDecision {
    fn redirect(to: &str, reason: RedirectReason) -> Self {
        GuardDecision::Redirect {
            to: to.to_string(),
            reason,
        }
    }
}

pub fn evaluate(target: &ResolvedRoute, logged_in: bool, routes: &RouteConfig) -> GuardDecision {
    let requires_auth = target.meta.requires_auth != Some(false);

    if requires_auth && !logged_in {
        return GuardDecision::redirect(&routes.login_path, RedirectReason::LoginRequired);
    }
    if !logged_in {
        return GuardDecision::Allow;
    }

    if target.path == routes.login_path {
        GuardDecision::redirect(&routes.home_path, RedirectReason::AlreadyAuthenticated)
    } else if target.path == routes.root_path {
        GuardDecision::redirect(&routes.home_path, RedirectReason::RootToHome)
    } else if target.meta.has_permission == Some(false) {
        GuardDecision::redirect(&routes.forbidden_path, RedirectReason::PermissionDenied)
    } else if !target.is_match() {
        GuardDecision::redirect(&routes.not_found_path, RedirectReason::NotFound)
    } else if target.meta.is_valid == Some(false) {
        GuardDecision::redirect(&routes.unavailable_path, RedirectReason::Unavailable)
    } else {
        GuardDecision::Allow
    }
}
