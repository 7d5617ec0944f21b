//! The bounded think-act-observe loop for one conversational turn.
//!
//! Each iteration asks the model what to do next. Output without a tool call
//! is the answer. Otherwise the call is dispatched once, its result joins the
//! turn's retrieved context, and the model is asked to answer from that
//! context. If the answer is itself another tool request the loop goes
//! around again, up to `max_iterations`.
//!
//! Retrieved context lives only for the turn; memory receives the user
//! message and exactly one assistant reply per turn.

pub mod prompt;

use std::sync::Arc;

use serde::Serialize;

use crate::config::DocentConfig;
use crate::conversation::{ConversationMemory, Message};
use crate::error::RagResult;
use crate::generation::{GenerationOptions, GenerationProvider};
use crate::tools::{extract, ToolRegistry};

/// How a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOutcome {
    Answered,
    ToolFailed,
    IterationLimit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub outcome: TurnOutcome,
    pub reply: String,
    pub iterations: usize,
    pub tool_calls: usize,
}

#[derive(Debug, Clone)]
pub struct AgentSettings {
    pub max_iterations: usize,
    pub domain: String,
    pub options: GenerationOptions,
}

impl From<&DocentConfig> for AgentSettings {
    fn from(config: &DocentConfig) -> Self {
        Self {
            max_iterations: config.agent.max_iterations,
            domain: config.agent.domain.clone(),
            options: GenerationOptions::from(&config.generation),
        }
    }
}

pub struct Agent {
    generator: Arc<dyn GenerationProvider>,
    tools: Arc<ToolRegistry>,
    memory: ConversationMemory,
    max_iterations: usize,
    options: GenerationOptions,
    system_prompt: String,
}

impl Agent {
    pub fn new(
        generator: Arc<dyn GenerationProvider>,
        tools: Arc<ToolRegistry>,
        memory: ConversationMemory,
        settings: AgentSettings,
    ) -> Self {
        let system_prompt = prompt::system_prompt(&settings.domain, &tools.render_schemas());
        Self {
            generator,
            tools,
            memory,
            max_iterations: settings.max_iterations.max(1),
            options: settings.options,
            system_prompt,
        }
    }

    pub fn from_config(
        generator: Arc<dyn GenerationProvider>,
        tools: Arc<ToolRegistry>,
        config: &DocentConfig,
    ) -> Self {
        let memory = ConversationMemory::new(config.memory.max_messages, config.memory.max_tokens);
        Self::new(generator, tools, memory, AgentSettings::from(config))
    }

    /// Run one turn. Generation failures are returned as errors and leave no
    /// assistant reply behind; every other ending appends exactly one.
    pub fn chat(&mut self, message: &str) -> RagResult<TurnReport> {
        self.memory.add_user(message);
        let mut context: Vec<String> = Vec::new();
        let mut tool_calls = 0;

        for iteration in 1..=self.max_iterations {
            tracing::debug!(iteration, "thinking");
            let prompt = prompt::thinking_prompt(&self.memory.format_for_prompt(), &context);
            let output = self.generate(&prompt)?;

            let Some(call) = extract::parse(&output) else {
                return Ok(self.finish(TurnOutcome::Answered, output.trim(), iteration, tool_calls));
            };

            tool_calls += 1;
            let result = match self.tools.dispatch(&call) {
                Ok(result) => result,
                Err(err) => {
                    tracing::error!(tool = %call.name, error = %err, "tool call failed");
                    let reply = format!("{}{err}", prompt::TOOL_FAILURE_PREFIX);
                    return Ok(self.finish(TurnOutcome::ToolFailed, &reply, iteration, tool_calls));
                }
            };

            context.push(result);
            let prompt =
                prompt::answer_prompt(&self.memory.format_for_prompt(), &context, message);
            let answer = self.generate(&prompt)?;

            if extract::parse(&answer).is_none() {
                return Ok(self.finish(TurnOutcome::Answered, answer.trim(), iteration, tool_calls));
            }
            tracing::debug!(iteration, "answer requested another tool call");
        }

        tracing::warn!(max_iterations = self.max_iterations, "iteration limit reached");
        Ok(self.finish(
            TurnOutcome::IterationLimit,
            prompt::ITERATION_LIMIT_MESSAGE,
            self.max_iterations,
            tool_calls,
        ))
    }

    fn generate(&self, prompt: &str) -> RagResult<String> {
        self.generator
            .generate(prompt, &self.system_prompt, &self.options)
            .inspect_err(|err| tracing::warn!(error = %err, "generation failed, turn aborted"))
    }

    fn finish(
        &mut self,
        outcome: TurnOutcome,
        reply: &str,
        iterations: usize,
        tool_calls: usize,
    ) -> TurnReport {
        self.memory.add_assistant(reply);
        tracing::info!(?outcome, iterations, tool_calls, "turn complete");
        TurnReport {
            outcome,
            reply: reply.to_string(),
            iterations,
            tool_calls,
        }
    }

    pub fn history(&self) -> Vec<Message> {
        self.memory.history()
    }

    pub fn clear_history(&mut self) {
        self.memory.clear();
    }

    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }
}
