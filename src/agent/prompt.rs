//! Prompt text for the agent loop.

/// Opening of the reply when a tool call fails; the error text follows.
pub const TOOL_FAILURE_PREFIX: &str =
    "I encountered an error while searching the documentation: ";

/// Reply when a turn runs out of iterations.
pub const ITERATION_LIMIT_MESSAGE: &str = "I apologize, but I couldn't complete the task within \
     the iteration limit. The question might be too complex or require more steps.";

/// System instructions: role, available tools, and how to call them.
pub fn system_prompt(domain: &str, tool_schemas: &str) -> String {
    format!(
        "You are a helpful assistant that answers questions about {domain}.\n\
         \n\
         You have access to the following tools:\n\
         {tool_schemas}\n\
         \n\
         To use a tool, respond with ONLY a JSON code block in this exact format:\n\
         ```json\n\
         {{\"tool\": \"tool_name\", \"parameters\": {{\"param\": \"value\"}}}}\n\
         ```\n\
         \n\
         Guidelines:\n\
         - Search the documentation before answering questions about {domain}.\n\
         - Only include ONE tool call per response.\n\
         - When you have enough information, answer directly in plain text without a code block.\n\
         - Base your answers on the retrieved documentation and say so when it does not cover the question.\n"
    )
}

/// Prompt for deciding the next step: the dialogue so far plus anything
/// already retrieved during this turn.
pub fn thinking_prompt(history: &str, context: &[String]) -> String {
    let mut prompt = String::new();
    if !context.is_empty() {
        push_section(&mut prompt, "RELEVANT DOCUMENTATION", &context.join("\n"));
    }
    prompt.push_str(history.trim_end());
    prompt.push_str("\n\nassistant:");
    prompt
}

/// Prompt for answering once documentation has been retrieved.
pub fn answer_prompt(history: &str, context: &[String], question: &str) -> String {
    let mut prompt = String::new();
    push_section(&mut prompt, "CONVERSATION HISTORY", history.trim_end());
    push_section(&mut prompt, "RELEVANT DOCUMENTATION", &context.join("\n"));
    push_section(&mut prompt, "CURRENT QUESTION", question.trim());
    prompt.push_str(
        "Answer the current question using the documentation above. \
         Cite the sources you rely on.",
    );
    prompt
}

fn push_section(prompt: &mut String, title: &str, body: &str) {
    prompt.push_str("=== ");
    prompt.push_str(title);
    prompt.push_str(" ===\n");
    prompt.push_str(body.trim_end());
    prompt.push_str("\n\n");
}
