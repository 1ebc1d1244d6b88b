use serde::{Deserialize, Serialize};

/// Pagination envelope carried by every paginated list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PageMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
        }
    }
}

/// Query-string parameters shared by paginated endpoints. Out-of-range
/// values are normalized by the services, not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Clamp raw pagination input: page < 1 becomes 1, per_page outside
/// [1, 100] becomes 20. Returns (page, per_page, offset).
pub fn normalize_page(page: Option<i64>, per_page: Option<i64>) -> (i64, i64, i64) {
    let mut page = page.unwrap_or(1);
    let mut per_page = per_page.unwrap_or(20);
    if page < 1 {
        page = 1;
    }
    if per_page < 1 || per_page > 100 {
        per_page = 20;
    }
    (page, per_page, (page - 1) * per_page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_page_defaults_and_clamps() {
        assert_eq!(normalize_page(None, None), (1, 20, 0));
        assert_eq!(normalize_page(Some(0), Some(0)), (1, 20, 0));
        assert_eq!(normalize_page(Some(-3), Some(101)), (1, 20, 0));
        assert_eq!(normalize_page(Some(3), Some(25)), (3, 25, 50));
        assert_eq!(normalize_page(Some(2), Some(100)), (2, 100, 100));
    }

    #[test]
    fn page_meta_rounds_up() {
        let meta = PageMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
        assert_eq!(PageMeta::new(1, 20, 40).total_pages, 2);
        assert_eq!(PageMeta::new(1, 20, 0).total_pages, 0);
    }
}
