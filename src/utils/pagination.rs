use serde::Serialize;

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct Paginator {
    pub page: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub message: String,
    pub paginator: Paginator,
}

/// Slices an already-filtered list into a 1-based page. An out-of-range page
/// yields empty items rather than an error.
pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page = page.max(1);
    let page_size = page_size.max(1);

    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size);

    let start = (page - 1).saturating_mul(page_size);
    let items: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();

    let message = format!("{} item(s) found", total_items);

    Page {
        items,
        message,
        paginator: Paginator {
            page,
            total_items,
            total_pages,
            has_previous: page > 1 && total_pages > 0,
            has_next: page < total_pages,
        },
    }
}
