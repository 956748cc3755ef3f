use serde::{Deserialize, Serialize};

/// Page links shown on each side of the current page.
const LINK_WINDOW: u64 = 4;

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<u64>,
}

impl PageQuery {
    /// 1-based page number; missing or zero means the first page.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }
}

/// Clamps `page` to the last page holding `total` rows (at least 1), so the
/// row offset never exceeds `total`.
pub fn clamp_page(page: u64, total: u64, per_page: u64) -> u64 {
    if per_page == 0 {
        return 1;
    }
    let last = total.div_ceil(per_page).max(1);
    page.clamp(1, last)
}

/// One page of rows plus what is needed to render page links.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageDto<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub total_page: u64,
    pub prev: Option<String>,
    pub next: Option<String>,
    pub links: Vec<PageLink>,
}

/// `href` is `None` for the current page.
#[derive(Serialize, Debug, PartialEq)]
pub struct PageLink {
    pub page: u64,
    pub href: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        Self {
            items,
            total,
            page,
            per_page,
        }
    }

    pub fn total_page(&self) -> u64 {
        if self.per_page == 0 {
            return 0;
        }
        self.total.div_ceil(self.per_page)
    }

    pub fn into_dto<U, F>(self, base_path: &str, f: F) -> PageDto<U>
    where
        U: Serialize,
        F: FnMut(T) -> U,
    {
        let total_page = self.total_page();
        let page = self.page;
        let href = |n: u64| format!("{}?page={}", base_path, n);

        let prev = (page > 1 && page <= total_page.max(1)).then(|| href(page - 1));
        let next = (page < total_page).then(|| href(page + 1));
        let first = page.saturating_sub(LINK_WINDOW).max(1);
        let last = page.saturating_add(LINK_WINDOW).min(total_page);
        let links = (first..=last)
            .map(|n| PageLink {
                page: n,
                href: (n != page).then(|| href(n)),
            })
            .collect();

        PageDto {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page,
            total_page,
            prev,
            next,
            links,
        }
    }
}
