//! Site routes and the navigation-event source.

use std::sync::Arc;
use tracing::debug;

/// Pages of the site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `/`
    Home,
    /// `/om-oss`
    About,
    /// `/meny`
    Menu,
    /// `/kontakt`
    Contact,
    /// `/admin`
    Admin,
    /// Any other path.
    NotFound,
}

impl Route {
    const MATCHABLE: [Route; 5] = [
        Route::Home,
        Route::About,
        Route::Menu,
        Route::Contact,
        Route::Admin,
    ];

    /// Resolve a pathname against the route table, ignoring ASCII case and
    /// trailing slashes. Unknown paths are `NotFound`.
    pub fn resolve(path: &str) -> Route {
        let trimmed = path.trim_end_matches('/');
        Self::MATCHABLE
            .into_iter()
            .find(|route| {
                route
                    .path()
                    .is_some_and(|p| p.trim_end_matches('/').eq_ignore_ascii_case(trimmed))
            })
            .unwrap_or(Route::NotFound)
    }

    /// Canonical path, `None` for the catch-all
    pub fn path(&self) -> Option<&'static str> {
        match self {
            Route::Home => Some("/"),
            Route::About => Some("/om-oss"),
            Route::Menu => Some("/meny"),
            Route::Contact => Some("/kontakt"),
            Route::Admin => Some("/admin"),
            Route::NotFound => None,
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Home => write!(f, "home"),
            Route::About => write!(f, "about"),
            Route::Menu => write!(f, "menu"),
            Route::Contact => write!(f, "contact"),
            Route::Admin => write!(f, "admin"),
            Route::NotFound => write!(f, "not_found"),
        }
    }
}

/// Strip query string and fragment from a location, leaving the pathname.
pub fn pathname(location: &str) -> &str {
    let end = location.find(['?', '#']).unwrap_or(location.len());
    match &location[..end] {
        "" => "/",
        path => path,
    }
}

/// Observer notified synchronously on every navigation.
pub trait NavigationListener: Send + Sync {
    /// Called with the pathname just navigated to.
    fn on_navigate(&self, path: &str);
}

/// Navigation-event source.
#[derive(Default)]
pub struct Navigator {
    listeners: Vec<Arc<dyn NavigationListener>>,
    current: Option<String>,
}

impl Navigator {
    /// Create a navigator with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener
    pub fn subscribe(&mut self, listener: Arc<dyn NavigationListener>) {
        self.listeners.push(listener);
    }

    /// Navigate to `location` and notify every listener.
    pub fn navigate(&mut self, location: &str) -> Route {
        let path = pathname(location).to_string();
        let route = Route::resolve(&path);
        debug!(path = %path, route = %route, "Navigated");

        for listener in &self.listeners {
            listener.on_navigate(&path);
        }
        self.current = Some(path);
        route
    }

    /// Pathname of the last navigation
    pub fn current_path(&self) -> Option<&str> {
        self.current.as_deref()
    }
}
