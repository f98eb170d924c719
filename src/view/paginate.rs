//! Fixed-size pagination with clamped bounds. Pages are 1-based.

/// Number of pages for `len` items; an empty list still has one page
pub fn total_pages(len: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    if len == 0 {
        1
    } else {
        (len + page_size - 1) / page_size
    }
}

pub fn clamp_page(page: usize, len: usize, page_size: usize) -> usize {
    page.max(1).min(total_pages(len, page_size))
}

/// Half-open index range of `page`; both ends are clamped to `len`
pub fn page_bounds(page: usize, len: usize, page_size: usize) -> (usize, usize) {
    let page_size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(page_size).min(len);
    let end = start.saturating_add(page_size).min(len);
    (start, end)
}

pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let (start, end) = page_bounds(page, items.len(), page_size);
    &items[start..end]
}
