use crate::query::{OrderBy, Page, SortDirection};
use serde::{Deserialize, Serialize};

/// `{page?, take?, sortBy?, orderBy?}`; `page` is 1-indexed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationFilters {
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub take: Option<u64>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub order_by: Option<SortDirection>,
}

impl PaginationFilters {
    /// Only when both `page` and `take` are set and non-zero.
    pub fn page(&self) -> Option<Page> {
        match (self.page, self.take) {
            (Some(page), Some(take)) if page > 0 && take > 0 => Some(Page {
                limit: take,
                offset: page.saturating_sub(1).saturating_mul(take),
            }),
            _ => None,
        }
    }

    /// Only when both `sortBy` and `orderBy` are set.
    pub fn order(&self) -> Option<OrderBy> {
        match (&self.sort_by, self.order_by) {
            (Some(column), Some(direction)) if !column.is_empty() => Some(OrderBy {
                column: column.clone(),
                direction,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filters(page: Option<u64>, take: Option<u64>) -> PaginationFilters {
        PaginationFilters {
            page,
            take,
            ..Default::default()
        }
    }

    #[test]
    fn page_math() {
        assert_eq!(filters(Some(1), Some(10)).page(), Some(Page { limit: 10, offset: 0 }));
        assert_eq!(filters(Some(3), Some(10)).page(), Some(Page { limit: 10, offset: 20 }));
        assert_eq!(filters(None, Some(10)).page(), None);
        assert_eq!(filters(Some(2), None).page(), None);
    }

    #[test]
    fn zero_page_or_take_means_unpaged() {
        assert_eq!(filters(Some(1), Some(0)).page(), None);
        assert_eq!(filters(Some(0), Some(10)).page(), None);
        assert_eq!(filters(Some(0), Some(0)).page(), None);
    }

    #[test]
    fn order_needs_both_fields() {
        let mut f = PaginationFilters {
            sort_by: Some("name".into()),
            ..Default::default()
        };
        assert!(f.order().is_none());
        f.order_by = Some(SortDirection::Asc);
        assert_eq!(f.order().unwrap().column, "name");
    }

    #[test]
    fn reads_camel_case() {
        let f: PaginationFilters =
            serde_json::from_str(r#"{"page":2,"take":5,"sortBy":"id","orderBy":"desc"}"#).unwrap();
        assert_eq!(f.order_by, Some(SortDirection::Desc));
        assert_eq!(f.page().unwrap().offset, 5);
    }
}
