use std::fmt::Write;

use minirag_core::types::Chunk;

/// What the model is told to say when the context has no answer.
pub const REFUSAL_PHRASE: &str = "I don't know the answer based on the provided documents.";

/// Build the grounded-answer prompt. Context blocks are numbered `1..=N` in order.
pub fn build_prompt(question: &str, context: &[Chunk]) -> String {
    let mut blocks = String::new();
    for (i, chunk) in context.iter().enumerate() {
        if i > 0 {
            blocks.push_str("\n\n");
        }
        let _ = write!(blocks, "[Source ID: {}] {}\nContent: {}", i + 1, chunk.descriptor(), chunk.text.trim());
    }
    format!(
        "You are a helpful assistant for question-answering tasks.\n\
         Use only the following pieces of retrieved context to answer the question.\n\
         If the context does not contain the answer, reply with exactly: {REFUSAL_PHRASE}\n\
         Generate a concise answer and cite the context you used inline as [Source ID: N], \
         where N is the number of the context block. Cite several blocks as [Source ID: 1, 2].\n\
         \n\
         Context:\n\
         {blocks}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer:"
    )
}
