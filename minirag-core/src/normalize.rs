//! Text normalization shared by the ingestion and query paths.
//!
//! Stored documents and incoming queries must go through the exact same
//! canonicalization, otherwise their embeddings are computed from differently
//! shaped inputs and distances stop being comparable.

/// Lowercases `text` and strips every ASCII punctuation character.
///
/// Whitespace is left untouched and no tokenization or stemming is done.
/// The function is total and idempotent.
///
/// # Example
///
/// ```
/// use minirag_core::normalize;
///
/// assert_eq!(normalize("The Eiffel Tower is located in Paris."), "the eiffel tower is located in paris");
/// ```
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect()
}
