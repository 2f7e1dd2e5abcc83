use serde::Serialize;

/// Row counts for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub users: i64,
    pub products: i64,
    pub categories: i64,
    pub wishlists: i64,
}
