use crate::types::ChunkId;

/// Deterministic chunk identity: BLAKE3 over source, page, position and content.
///
/// Fields are length-prefixed so that shifting bytes between them changes the id.
pub fn chunk_id(source: &str, page: Option<u32>, index: usize, start: usize, text: &str) -> ChunkId {
    let mut hasher = blake3::Hasher::new();
    for field in [source.as_bytes(), text.as_bytes()] {
        hasher.update(&(field.len() as u64).to_le_bytes());
        hasher.update(field);
    }
    hasher.update(&page.map_or(0u64, u64::from).to_le_bytes());
    hasher.update(&(index as u64).to_le_bytes());
    hasher.update(&(start as u64).to_le_bytes());
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_id() {
        assert_eq!(chunk_id("a.txt", None, 0, 0, "hello"), chunk_id("a.txt", None, 0, 0, "hello"));
        assert_eq!(chunk_id("a.txt", None, 0, 0, "hello").len(), 64);
    }

    #[test]
    fn every_field_participates() {
        let base = chunk_id("a.txt", None, 0, 0, "hello");
        assert_ne!(base, chunk_id("b.txt", None, 0, 0, "hello"));
        assert_ne!(base, chunk_id("a.txt", Some(1), 0, 0, "hello"));
        assert_ne!(base, chunk_id("a.txt", None, 1, 0, "hello"));
        assert_ne!(base, chunk_id("a.txt", None, 0, 5, "hello"));
        assert_ne!(base, chunk_id("a.txt", None, 0, 0, "hello!"));
        assert_ne!(chunk_id("ab", None, 0, 0, "c"), chunk_id("a", None, 0, 0, "bc"));
    }
}
