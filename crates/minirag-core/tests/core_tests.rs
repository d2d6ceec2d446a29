use std::fs;
use tempfile::TempDir;

use minirag_core::chunker::Chunker;
use minirag_core::config::{ChunkingSettings, LengthUnit};
use minirag_core::loader;
use minirag_core::types::{Chunk, Document};

fn sample_text() -> String {
    let mut text = String::from("Paris is the capital of France.\n\n");
    for i in 0..120 {
        text.push_str(&format!(
            "Paragraph {i} talks about rivers, bridges and the long history of the city. \
             It has several sentences so that the splitter has to work.\nA second line follows here.\n\n"
        ));
    }
    text
}

fn reconstruct(text: &str, chunks: &[Chunk]) -> String {
    let mut out = String::new();
    let mut covered = 0usize;
    for c in chunks {
        if c.start > covered {
            assert!(text[covered..c.start].trim().is_empty(), "gap before chunk {}", c.index);
            out.push_str(&text[covered..c.start]);
            covered = c.start;
        }
        assert!(!c.text.trim().is_empty(), "chunk {} is blank", c.index);
        if c.end > covered {
            out.push_str(&text[covered..c.end]);
            covered = c.end;
        }
    }
    assert!(text[covered..].trim().is_empty(), "text after the last chunk");
    out.push_str(&text[covered..]);
    out
}

#[test]
fn token_chunks_cover_the_document_exactly() {
    let chunker = Chunker::new(&ChunkingSettings::default()).expect("chunker");
    let doc = Document::new("sample.txt", sample_text());
    let chunks = chunker.chunk_document(&doc).expect("chunk");

    assert!(chunks.len() >= 2, "long text splits into several chunks");
    assert_eq!(reconstruct(&doc.text, &chunks), doc.text);
    for c in &chunks {
        assert_eq!(c.text, &doc.text[c.start..c.end]);
        assert!(chunker.measure(&c.text) <= 1000 + 5, "chunk {} is {} tokens", c.index, chunker.measure(&c.text));
    }
}

#[test]
fn consecutive_chunks_overlap() {
    let chunker = Chunker::new(&ChunkingSettings::default()).expect("chunker");
    let doc = Document::new("sample.txt", sample_text());
    let chunks = chunker.chunk_document(&doc).expect("chunk");
    let overlapping = chunks.windows(2).filter(|w| w[1].start < w[0].end).count();
    assert!(overlapping > 0, "neighbouring chunks share an overlap window");
    for w in chunks.windows(2) {
        assert!(w[1].start >= w[0].start && w[1].end > w[0].end, "chunks advance through the document");
    }
}

#[test]
fn rechunking_is_deterministic() {
    let settings = ChunkingSettings::default();
    let doc = Document::new("sample.txt", sample_text());
    let first = Chunker::new(&settings).expect("chunker").chunk_document(&doc).expect("chunk");
    let second = Chunker::new(&settings).expect("chunker").chunk_document(&doc).expect("chunk");
    assert_eq!(first, second);
    let ids: std::collections::HashSet<_> = first.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids.len(), first.len(), "ids are unique within a document");
}

#[test]
fn character_chunks_respect_size_limit() {
    let settings = ChunkingSettings { chunk_size: 120, chunk_overlap: 30, length_unit: LengthUnit::Characters, ..Default::default() };
    let chunker = Chunker::new(&settings).expect("chunker");
    let doc = Document::new("sample.txt", sample_text());
    let chunks = chunker.chunk_document(&doc).expect("chunk");
    for c in &chunks {
        assert!(c.text.chars().count() <= 120, "chunk {} has {} chars", c.index, c.text.chars().count());
    }
    assert_eq!(reconstruct(&doc.text, &chunks), doc.text);
}

#[test]
fn pages_are_recorded_for_paged_documents() {
    let settings = ChunkingSettings { chunk_size: 40, chunk_overlap: 0, length_unit: LengthUnit::Characters, ..Default::default() };
    let chunker = Chunker::new(&settings).expect("chunker");
    let doc = Document::from_paged_text("r.pdf", "Page one has some words.\u{c}Page two has other words.\u{c}");
    let chunks = chunker.chunk_document(&doc).expect("chunk");
    let pages: Vec<Option<u32>> = chunks.iter().map(|c| c.page).collect();
    assert_eq!(pages.first(), Some(&Some(1)));
    assert!(pages.contains(&Some(2)));
}

#[test]
fn discover_lists_supported_files_in_order() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("nested")).unwrap();
    fs::write(dir.join("b.txt"), "bravo").unwrap();
    fs::write(dir.join("a.md"), "# alpha").unwrap();
    fs::write(dir.join("nested/c.txt"), "charlie").unwrap();
    fs::write(dir.join("ignored.bin"), [0u8, 1, 2]).unwrap();

    let files = loader::discover(dir);
    let names: Vec<String> = files.iter().map(|p| p.strip_prefix(dir).unwrap().to_string_lossy().to_string()).collect();
    assert_eq!(names, vec!["a.md", "b.txt", "nested/c.txt"]);

    let doc = loader::load_path(&files[1]).expect("load");
    assert_eq!(doc.source, "b.txt");
    assert_eq!(doc.text, "bravo");
}
