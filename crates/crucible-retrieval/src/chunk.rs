//! Document chunking for index seeding
//!
//! Splits a document into overlapping chunks on paragraph boundaries so
//! the batch ingestion job can seed the index with passage-sized pieces.

/// Split `text` into chunks of roughly `chunk_size` characters
///
/// Chunks break on blank-line paragraph boundaries where possible; the
/// last paragraph of a chunk is carried into the next one as overlap so a
/// match near a boundary is not lost. A single paragraph longer than
/// `chunk_size` becomes its own chunk rather than being split mid-line.
#[must_use]
pub fn chunk_document(text: &str, chunk_size: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    if paragraphs.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_len = 0usize;

    for paragraph in paragraphs {
        if current_len + paragraph.len() > chunk_size && !current.is_empty() {
            chunks.push(current.join("\n\n"));
            // Overlap: carry the last paragraph into the next chunk
            let carried = *current.last().unwrap_or(&"");
            current.clear();
            if carried.len() < chunk_size {
                current.push(carried);
                current_len = carried.len();
            } else {
                current_len = 0;
            }
        }
        current.push(paragraph);
        current_len += paragraph.len();
    }

    if !current.is_empty() {
        chunks.push(current.join("\n\n"));
    }

    chunks
}
