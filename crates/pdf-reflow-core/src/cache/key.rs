/// Cache key for one translated unit.
///
/// An MD5 hash of the model identifier and the unit text, so the same
/// paragraph translated by two different models never collides.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    hash: String,
}

impl CacheKey {
    pub fn new(model_id: &str, text: &str) -> Self {
        // Null separator keeps ("a", "bc") and ("ab", "c") apart
        let combined = format!("{model_id}\0{text}");

        Self {
            hash: format!("{:x}", md5::compute(combined.as_bytes())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.hash
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}
