use std::num::NonZeroU32;

pub const DEFAULT_PAGE_SIZE: NonZeroU32 = NonZeroU32::new(20).unwrap();
pub const FEED_SORT: &str = "createdAt,desc";

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct PageRequest {
    pub page: u32,
    pub size: NonZeroU32,
    pub sort: Option<String>,
}

impl PageRequest {
    #[must_use]
    pub fn first(size: NonZeroU32) -> Self {
        Self {
            page: 0,
            size,
            sort: None,
        }
    }

    /// First page of the feed, newest posts first.
    #[must_use]
    pub fn feed(size: NonZeroU32) -> Self {
        Self {
            sort: Some(FEED_SORT.to_owned()),
            ..Self::first(size)
        }
    }

    #[must_use]
    pub fn next(&self) -> Self {
        Self {
            page: self.page.saturating_add(1),
            ..self.clone()
        }
    }

    /// Query pairs in the order the backend documents them.
    #[must_use]
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
        ];
        if let Some(sort) = &self.sort {
            query.push(("sort", sort.clone()));
        }
        query
    }
}

/// One page of a listing. `last` is only known when the server said so.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub last: Option<bool>,
}

impl<T> Page<T> {
    /// Whether no further page should be requested after this one. Without an
    /// explicit marker, a page shorter than requested is the last one.
    #[must_use]
    pub fn is_last(&self, request: &PageRequest) -> bool {
        self.last.unwrap_or_else(|| {
            self.items.len() < usize::try_from(request.size.get()).unwrap_or(usize::MAX)
        })
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(DEFAULT_PAGE_SIZE)
    }
}
