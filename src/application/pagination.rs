//! Page-number pagination with clamping.
//!
//! Feed pages are addressed by a `?page=` query parameter. Requests outside
//! the valid range are clamped to the nearest valid page (first or last)
//! instead of failing; a page always exists even for an empty result set.

use serde::Serialize;

/// Offset/limit window handed to a repository query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub limit: u32,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

impl PageMeta {
    pub fn previous(&self) -> u64 {
        self.number.saturating_sub(1).max(1)
    }

    pub fn next(&self) -> u64 {
        (self.number + 1).min(self.num_pages)
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    total: u64,
    page_size: u32,
}

impl Paginator {
    pub fn new(total: u64, page_size: u32) -> Self {
        Self {
            total,
            page_size: page_size.max(1),
        }
    }

    pub fn num_pages(&self) -> u64 {
        let size = u64::from(self.page_size);
        (self.total.div_ceil(size)).max(1)
    }

    /// Clamp a requested page number into `1..=num_pages`. `None` (absent or
    /// unparseable query value) resolves to the first page.
    pub fn clamp_page(&self, requested: Option<u64>) -> u64 {
        match requested {
            None | Some(0) => 1,
            Some(n) => n.min(self.num_pages()),
        }
    }

    pub fn slice(&self, page: u64) -> PageSlice {
        let page = page.clamp(1, self.num_pages());
        PageSlice {
            limit: self.page_size,
            offset: (page - 1) * u64::from(self.page_size),
        }
    }

    pub fn meta(&self, page: u64) -> PageMeta {
        let page = page.clamp(1, self.num_pages());
        PageMeta {
            number: page,
            num_pages: self.num_pages(),
            total: self.total,
            has_previous: page > 1,
            has_next: page < self.num_pages(),
        }
    }
}

/// Paginate an already-materialized list, clamping like the query path.
pub fn paginate_vec<T>(items: Vec<T>, page_size: u32, requested: Option<u64>) -> Page<T> {
    let paginator = Paginator::new(items.len() as u64, page_size);
    let page = paginator.clamp_page(requested);
    let slice = paginator.slice(page);
    let meta = paginator.meta(page);

    let start = usize::try_from(slice.offset).unwrap_or(usize::MAX);
    let items = items
        .into_iter()
        .skip(start)
        .take(slice.limit as usize)
        .collect();

    Page { items, meta }
}

/// Parse a raw `?page=` value; anything non-numeric counts as absent.
pub fn parse_page_param(raw: Option<&str>) -> Option<u64> {
    raw.and_then(|value| value.trim().parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_total_still_has_one_page() {
        let paginator = Paginator::new(0, 10);
        assert_eq!(paginator.num_pages(), 1);
        assert_eq!(paginator.clamp_page(Some(7)), 1);
        let meta = paginator.meta(1);
        assert!(!meta.has_next);
        assert!(!meta.has_previous);
    }

    #[test]
    fn page_count_rounds_up() {
        assert_eq!(Paginator::new(21, 10).num_pages(), 3);
        assert_eq!(Paginator::new(20, 10).num_pages(), 2);
        assert_eq!(Paginator::new(1, 10).num_pages(), 1);
    }

    #[test]
    fn out_of_range_requests_clamp_to_last_page() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.clamp_page(Some(99)), 3);
        assert_eq!(paginator.slice(99).offset, 20);
    }

    #[test]
    fn absent_or_zero_requests_clamp_to_first_page() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.clamp_page(None), 1);
        assert_eq!(paginator.clamp_page(Some(0)), 1);
    }

    #[test]
    fn slice_offsets_follow_page_numbers() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.slice(1), PageSlice { limit: 10, offset: 0 });
        assert_eq!(
            paginator.slice(2),
            PageSlice {
                limit: 10,
                offset: 10
            }
        );
    }

    #[test]
    fn vec_pagination_clamps_and_slices() {
        let items: Vec<u32> = (0..25).collect();
        let page = paginate_vec(items.clone(), 10, Some(3));
        assert_eq!(page.items, (20..25).collect::<Vec<_>>());
        assert_eq!(page.meta.number, 3);
        assert!(!page.meta.has_next);

        let page = paginate_vec(items, 10, Some(40));
        assert_eq!(page.meta.number, 3);
        assert_eq!(page.items.len(), 5);
    }

    #[test]
    fn garbage_page_params_parse_to_none() {
        assert_eq!(parse_page_param(Some("abc")), None);
        assert_eq!(parse_page_param(Some("")), None);
        assert_eq!(parse_page_param(Some(" 2 ")), Some(2));
        assert_eq!(parse_page_param(None), None);
    }
}
