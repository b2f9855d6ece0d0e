/// A document as persisted in a collection.
///
/// `document` holds the text exactly as it was handed to the store, which
/// for the pipeline operations is the normalized form.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub document: String,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            document: document.into(),
        }
    }
}

/// One neighbor returned for a query.
///
/// Lower distances are better matches. The scale depends on the collection's
/// metric: squared L2 for `l2`, `1 - similarity` for `cosine` and `ip`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub distance: f32,
}

/// Nearest neighbors for a batch of queries.
///
/// Holds one match list per query text, in the order the queries were given.
/// Each list is sorted by ascending distance and holds at most the requested
/// number of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResults {
    pub matches: Vec<Vec<QueryMatch>>,
}

impl QueryResults {
    pub fn new(matches: Vec<Vec<QueryMatch>>) -> Self {
        Self { matches }
    }

    /// Matches for the `index`-th query, if that query exists.
    pub fn for_query(&self, index: usize) -> Option<&[QueryMatch]> {
        self.matches.get(index).map(Vec::as_slice)
    }

    /// Number of queries answered.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[QueryMatch]> {
        self.matches.iter().map(Vec::as_slice)
    }
}
