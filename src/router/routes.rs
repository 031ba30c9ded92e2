//! Application Route Table

use super::{Page, RouteDescriptor, Router, RouterError};

/// Title used when a route declares none
pub const DEFAULT_APP_TITLE: &str = "OpenIKT";

/// Public path the frontend is served under
pub const DEFAULT_BASE: &str = "/openikt/";

/// All application routes. Pages share the `BasicLayout` shell.
pub fn app_routes() -> Vec<RouteDescriptor> {
    vec![
        RouteDescriptor::new("/welcome", Page::AccountManagement)
            .name("welcome")
            .title("Welcome"),
        RouteDescriptor::new("", Page::BasicLayout).children(vec![
            RouteDescriptor::new("", Page::Home).name("home"),
            RouteDescriptor::new("quiltdiff", Page::QuiltDiff)
                .name("quiltDiff")
                .title("Quilt Diff"),
            RouteDescriptor::new("quiltdiff/details/:id", Page::QuiltDiffDetails)
                .name("quiltDiffDetails")
                .menu_index("/quiltdiff"),
            RouteDescriptor::new("image-comparison", Page::ImageComparison)
                .name("imageComparison")
                .title("Image Comparison"),
            RouteDescriptor::new("image-comparison/create", Page::ImageComparisonCreate)
                .name("imageComparisonCreate")
                .title("Create Image Comparison")
                .menu_index("/image-comparison"),
            RouteDescriptor::new("image-comparison/details/:id", Page::ImageComparisonDetails)
                .name("imageComparisonDetails")
                .menu_index("/image-comparison"),
            RouteDescriptor::new("help", Page::Help)
                .name("help")
                .title("Help"),
        ]),
        RouteDescriptor::new("/not-found", Page::NotFound)
            .name("notFound")
            .title("Not Found"),
    ]
}

/// Router over [`app_routes`]
pub fn app_router(base: &str, app_title: &str) -> Result<Router, RouterError> {
    Router::new(app_routes(), base, app_title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_every_route_is_named() {
        let router = app_router(DEFAULT_BASE, DEFAULT_APP_TITLE).unwrap();
        let names: HashSet<_> = router.routes().filter_map(|(_, name, _, _)| name).collect();
        assert_eq!(names.len(), router.routes().count());
        assert!(names.contains("notFound"));
    }

    #[test]
    fn test_layout_children_render_inside_layout() {
        let router = app_router(DEFAULT_BASE, DEFAULT_APP_TITLE).unwrap();
        for (template, _, _, matched) in router.routes() {
            let in_layout = matched.first() == Some(&Page::BasicLayout);
            let standalone = template == "/welcome" || template == "/not-found";
            assert_eq!(in_layout, !standalone, "{}", template);
        }
    }
}
