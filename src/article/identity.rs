//! Article identity.
//!
//! An article's id is a version-5 UUID of its URL under the URL namespace,
//! so the same link always maps to the same id across processes and
//! releases. Articles without a URL get a random version-4 UUID and can
//! never be matched against a later fetch.

use uuid::Uuid;

/// Generate an article id from its canonical URL.
///
/// Blank or missing URLs yield a fresh random id.
pub fn generate_id(url: Option<&str>) -> String {
    match url {
        Some(url) if !url.trim().is_empty() => {
            Uuid::new_v5(&Uuid::NAMESPACE_URL, url.as_bytes()).to_string()
        }
        _ => Uuid::new_v4().to_string(),
    }
}
