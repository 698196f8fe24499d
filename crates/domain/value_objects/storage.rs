/// One object returned by a storage listing page. Supabase reports the size
/// either on the object itself or inside its metadata blob, depending on the
/// storage API version that wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub size: Option<i64>,
    pub metadata_size: Option<i64>,
}

impl StoredObject {
    /// Object-level size wins; metadata size is the fallback; an object with
    /// neither (a folder placeholder) counts as zero.
    pub fn effective_size(&self) -> i64 {
        self.size.or(self.metadata_size).unwrap_or(0)
    }
}
