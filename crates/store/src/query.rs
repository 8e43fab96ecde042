use common::{CategoryId, UserId};

/// Builder for catalog listings.
///
/// Filters are passed straight through to the backend: a category match, an
/// owner match, and a case-insensitive substring match on title or author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookQuery {
    /// Filter by category.
    pub category_id: Option<CategoryId>,

    /// Filter by the user who listed the book.
    pub owner_id: Option<UserId>,

    /// Substring matched against title or author.
    pub search: Option<String>,

    /// Maximum number of books to return.
    pub limit: Option<usize>,

    /// Number of books to skip.
    pub offset: Option<usize>,
}

impl BookQuery {
    /// Creates a query matching every book.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category_id: CategoryId) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn owner(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Filters by a search term. Blank terms are ignored.
    pub fn search(mut self, term: impl Into<String>) -> Self {
        let term = term.into();
        let term = term.trim();
        self.search = (!term.is_empty()).then(|| term.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns true if `title` or `author` contains the search term, ignoring case.
    pub(crate) fn matches_text(&self, title: &str, author: &str) -> bool {
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                title.to_lowercase().contains(&term) || author.to_lowercase().contains(&term)
            }
            None => true,
        }
    }
}

/// Escapes a search term for use inside an `ILIKE '%...%'` pattern.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
