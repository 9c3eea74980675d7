#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Context {
    pub slot: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Response<T> {
    pub context: Context,
    pub value: T,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemsWithCursor<T> {
    pub items: Vec<T>,
    pub cursor: Option<String>,
}
