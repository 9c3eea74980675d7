/// **Cursor** is a unique identifier for a page of results by which the next page can be fetched.
///
/// **Limit** is the maximum number of results to return per page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaginatedOptions {
    pub cursor: Option<String>,
    pub limit: Option<u16>,
}

impl PaginatedOptions {
    pub fn new(cursor: Option<String>, limit: Option<u16>) -> Self {
        Self { cursor, limit }
    }
}
