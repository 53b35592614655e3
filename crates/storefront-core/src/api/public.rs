//! Allow-list of endpoints that are called without credentials.

use reqwest::Method;

/// Auth routes called before a session exists, relative to the auth root
pub const PUBLIC_AUTH_ROUTES: &[&str] = &["login", "register", "refresh-token"];

/// Catalogue listings open to anonymous users, relative to the products root
pub const PUBLIC_PRODUCT_ROUTES: &[&str] =
    &["categories", "search", "featured", "recent", "paginated"];

/// Default root of the auth endpoints
pub const DEFAULT_AUTH_ROOT: &str = "/api/User";

/// Resource whose item, per-user and per-category listings are public
/// even though the resource root is not
pub const DEFAULT_PRODUCTS_ROOT: &str = "/api/Products";

/// Sub-segments under the products root that are readable anonymously
const PUBLIC_PRODUCT_SEGMENTS: &[&str] = &["user", "category"];

#[derive(Debug, Clone)]
pub struct PublicEndpoints {
    exact: Vec<String>,
    products_root: Option<String>,
}

impl PublicEndpoints {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            exact: paths
                .into_iter()
                .map(|p| normalize(p.as_ref()).to_string())
                .collect(),
            products_root: None,
        }
    }

    /// Add login, register and refresh-token under `root`
    pub fn with_auth_root(mut self, root: &str) -> Self {
        self.extend_under(root, PUBLIC_AUTH_ROUTES);
        self
    }

    /// Add the public listings under `root` and enable the item rule
    pub fn with_products_root(mut self, root: &str) -> Self {
        self.extend_under(root, PUBLIC_PRODUCT_ROUTES);
        self.products_root = Some(normalize(root).to_string());
        self
    }

    fn extend_under(&mut self, root: &str, routes: &[&str]) {
        let root = root.trim_end_matches('/');
        self.exact
            .extend(routes.iter().map(|route| format!("{}/{}", root, route)));
    }

    /// Whether `method` on `target` (a path or absolute URL) is called
    /// without credentials.
    ///
    /// Listed paths match exactly for any method, ignoring query string and
    /// trailing slash. Under the products root, a GET whose first sub-segment
    /// is a numeric id, `user` or `category` is also public; writes to the
    /// same paths need a credential.
    pub fn matches(&self, method: &Method, target: &str) -> bool {
        let path = normalize(path_of(target));
        if self.exact.iter().any(|endpoint| endpoint == path) {
            return true;
        }
        *method == Method::GET
            && self
                .products_root
                .as_deref()
                .is_some_and(|root| is_public_product_path(root, path))
    }
}

impl Default for PublicEndpoints {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
            .with_auth_root(DEFAULT_AUTH_ROOT)
            .with_products_root(DEFAULT_PRODUCTS_ROOT)
    }
}

fn is_public_product_path(root: &str, path: &str) -> bool {
    let Some(rest) = path.strip_prefix(root).and_then(|r| r.strip_prefix('/')) else {
        return false;
    };
    let next = rest.split('/').next().unwrap_or_default();
    is_numeric_id(next) || PUBLIC_PRODUCT_SEGMENTS.contains(&next)
}

fn is_numeric_id(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// Strip scheme and authority from an absolute URL, then query and fragment
fn path_of(target: &str) -> &str {
    let without_origin = match target.find("://") {
        Some(idx) => {
            let after = &target[idx + 3..];
            after.find('/').map(|slash| &after[slash..]).unwrap_or("/")
        }
        None => target,
    };
    let end = without_origin
        .find(['?', '#'])
        .unwrap_or(without_origin.len());
    &without_origin[..end]
}

fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/"
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn public_get(public: &PublicEndpoints, target: &str) -> bool {
        public.matches(&Method::GET, target)
    }

    #[test]
    fn test_exact_matches() {
        let public = PublicEndpoints::default();
        assert!(public_get(&public, "/api/User/login"));
        assert!(public_get(&public, "/api/User/login/"));
        assert!(public.matches(&Method::POST, "/api/User/refresh-token"));
        assert!(public_get(&public, "/api/Products/search?query=lamp"));
        assert!(public_get(&public, "https://localhost:7200/api/Products/featured?limit=10"));
        assert!(!public_get(&public, "/api/User/logout"));
        assert!(!public.matches(&Method::POST, "/api/User/revoke-token"));
    }

    #[test]
    fn test_exact_match_does_not_cover_sub_paths() {
        let public = PublicEndpoints::default();
        assert!(!public_get(&public, "/api/User/login/extra"));
        assert!(!public_get(&public, "/api/User/loginx"));
    }

    #[test]
    fn test_product_pattern_rule() {
        let public = PublicEndpoints::default();
        assert!(public_get(&public, "/api/Products/42"));
        assert!(public_get(&public, "/api/Products/42/"));
        assert!(public_get(&public, "/api/Products/user/abc-123"));
        assert!(public_get(&public, "/api/Products/category/Home%20Goods"));
        assert!(public_get(&public, "https://localhost:7200/api/Products/7?x=1"));
    }

    #[test]
    fn test_product_writes_are_protected() {
        let public = PublicEndpoints::default();
        assert!(!public.matches(&Method::PUT, "/api/Products/42"));
        assert!(!public.matches(&Method::DELETE, "/api/Products/42"));
        assert!(!public.matches(&Method::PATCH, "/api/Products/42"));
        assert!(!public.matches(&Method::POST, "/api/Products/category/Home"));
    }

    #[test]
    fn test_product_root_and_private_paths_are_protected() {
        let public = PublicEndpoints::default();
        assert!(!public_get(&public, "/api/Products"));
        assert!(!public_get(&public, "/api/Products/"));
        assert!(!public_get(&public, "/api/Products/my-products"));
        assert!(!public_get(&public, "/api/Products/bulk-delete"));
        assert!(!public_get(&public, "/api/Products/42abc"));
        assert!(!public_get(&public, "/api/ProductsX/42"));
    }

    #[test]
    fn test_without_products_root() {
        let public = PublicEndpoints::new(["/health"]);
        assert!(public_get(&public, "/health/"));
        assert!(!public_get(&public, "/api/Products/42"));
        assert!(!public_get(&public, "/api/User/login"));
    }

    #[test]
    fn test_roots_follow_configured_paths() {
        let public = PublicEndpoints::new(std::iter::empty::<&str>())
            .with_auth_root("/api/Account/")
            .with_products_root("/v2/items");
        assert!(public.matches(&Method::POST, "/api/Account/login"));
        assert!(public.matches(&Method::POST, "/api/Account/refresh-token"));
        assert!(!public.matches(&Method::POST, "/api/User/login"));
        assert!(public_get(&public, "/v2/items/featured"));
        assert!(public_get(&public, "/v2/items/9"));
        assert!(!public_get(&public, "/api/Products/featured"));
    }

    #[test]
    fn test_path_of() {
        assert_eq!(path_of("https://host:1/a/b?c#d"), "/a/b");
        assert_eq!(path_of("https://host"), "/");
        assert_eq!(path_of("/a#frag"), "/a");
    }
}
