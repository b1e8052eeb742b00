use serde::Serialize;
use url::form_urlencoded;

use super::tasks::shaper::Page;

/// Single-resource envelope: `{data}`.
#[derive(Debug, Clone, Serialize)]
pub struct Item<T> {
    pub data: T,
}

impl<T> Item<T> {
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: i64,
    /// 1-based position of the first item on this page, `None` when empty.
    pub from: Option<i64>,
    pub last_page: i64,
    pub path: String,
    pub per_page: i64,
    pub to: Option<i64>,
    pub total: i64,
}

/// Page envelope: `{data, links, meta}`.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub links: PageLinks,
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    /// `query` holds the pairs every link repeats besides `page`.
    pub fn new(
        data: Vec<T>,
        page: Page,
        total: i64,
        path: &str,
        query: &[(&str, String)],
    ) -> Self {
        let last_page = ((total + page.size - 1) / page.size).max(1);
        let count = data.len() as i64;
        let (from, to) = if count == 0 {
            (None, None)
        } else {
            let from = page.offset() + 1;
            (Some(from), Some(from + count - 1))
        };
        let link = |n: i64| {
            let mut qs = form_urlencoded::Serializer::new(String::new());
            for (key, value) in query {
                qs.append_pair(key, value);
            }
            qs.append_pair("page", &n.to_string());
            format!("{path}?{}", qs.finish())
        };

        Self {
            links: PageLinks {
                first: link(1),
                last: link(last_page),
                prev: (page.number > 1).then(|| link(page.number - 1)),
                next: (page.number < last_page).then(|| link(page.number + 1)),
            },
            meta: PageMeta {
                current_page: page.number,
                from,
                last_page,
                path: path.to_string(),
                per_page: page.size,
                to,
                total,
            },
            data,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            links: self.links,
            meta: self.meta,
        }
    }
}
