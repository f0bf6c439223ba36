//! Prompt assembly for the query stage.

/// Instruction placed ahead of the retrieved context in the system prompt.
pub const SYSTEM_INSTRUCTION: &str = "Use the following pieces of context to answer the question at the end. Don't use your own knowledge base.
If you don't know the answer, just say that you don't know, don't try to make up an answer. Also, dont give information about the context if it does not match with the question and replace 'context' with 'document' in your answer.
----------------
";

/// Separator between retrieved chunks inside the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Build the system prompt: the fixed instruction followed by the chunk texts.
///
/// With no chunks the context block is empty but the instruction is kept.
pub fn build_system_prompt<S: AsRef<str>>(context: &[S]) -> String {
    let joined = context
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(CONTEXT_SEPARATOR);
    format!("{}{}", SYSTEM_INSTRUCTION, joined)
}
