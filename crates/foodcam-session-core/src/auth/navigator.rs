//! Hook into the application's router for unrecoverable sessions.

use tracing::{debug, info};

/// The routing collaborator the API client reports to when a session ends.
pub trait SessionNavigator: Send + Sync {
    /// Name of the route currently shown, if known
    fn current_route(&self) -> Option<String>;

    fn navigate_to(&self, route: &str);
}

/// Navigate to `route` unless the router is already there.
///
/// Returns whether a navigation was issued.
pub fn redirect_to(navigator: &dyn SessionNavigator, route: &str) -> bool {
    if navigator.current_route().as_deref() == Some(route) {
        debug!(route, "Already at redirect target");
        return false;
    }
    info!(route, "Session unrecoverable, redirecting");
    navigator.navigate_to(route);
    true
}

/// Navigator for contexts without a router
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl SessionNavigator for NoopNavigator {
    fn current_route(&self) -> Option<String> {
        None
    }

    fn navigate_to(&self, _route: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Router {
        route: Mutex<String>,
        visits: Mutex<Vec<String>>,
    }

    impl SessionNavigator for Router {
        fn current_route(&self) -> Option<String> {
            Some(self.route.lock().unwrap().clone())
        }

        fn navigate_to(&self, route: &str) {
            *self.route.lock().unwrap() = route.to_string();
            self.visits.lock().unwrap().push(route.to_string());
        }
    }

    #[test]
    fn test_redirect_is_idempotent() {
        let router = Router {
            route: Mutex::new("dashboard".to_string()),
            visits: Mutex::new(Vec::new()),
        };

        assert!(redirect_to(&router, "login"));
        assert!(!redirect_to(&router, "login"));
        assert_eq!(*router.visits.lock().unwrap(), vec!["login".to_string()]);
    }
}
