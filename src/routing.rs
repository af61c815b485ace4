//! Client-side routes and the image guard

use crate::session::DesignState;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    #[default]
    Home,
    Studio,
    Presentation,
}

impl Route {
    /// Resolve a path such as `/studio`, `#/presentation/` or `studio`
    ///
    /// Unknown paths resolve to [`Route::Home`].
    pub fn from_path(path: &str) -> Self {
        let path = path.trim().trim_start_matches('#');
        let path = path.split(['?', '#']).next().unwrap_or_default();
        match path.trim_matches('/').to_ascii_lowercase().as_str() {
            "studio" => Route::Studio,
            "presentation" => Route::Presentation,
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Home => "/",
            Route::Studio => "/studio",
            Route::Presentation => "/presentation",
        }
    }

    /// Whether the page needs an uploaded photo
    pub fn requires_image(&self) -> bool {
        !matches!(self, Route::Home)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

impl Navigation {
    /// Route that ends up on screen
    pub fn route(&self) -> Route {
        match self {
            Navigation::Render(route) | Navigation::Redirect(route) => *route,
        }
    }
}

/// Decide what happens when `route` is entered with `state`
pub fn guard(route: Route, state: &DesignState) -> Navigation {
    if route.requires_image() && state.original_image.is_none() {
        tracing::debug!("No image uploaded, redirecting {} to /", route);
        Navigation::Redirect(Route::Home)
    } else {
        Navigation::Render(route)
    }
}
