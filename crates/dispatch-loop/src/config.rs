pub const DEFAULT_MAX_TURNS: usize = 8;

const DEFAULT_SYSTEM_GUIDE: &str = "You are a helpful assistant with access to tools. \
Use the available tools when they help answer the user's question. \
When you have enough information, answer directly.";

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Iteration cap for the LLM <-> tool loop.
    pub max_turns: usize,
    /// System message seeded at the head of every conversation.
    pub system_guide: String,
    pub max_output_tokens: Option<u32>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_turns: DEFAULT_MAX_TURNS,
            system_guide: DEFAULT_SYSTEM_GUIDE.to_string(),
            max_output_tokens: None,
        }
    }
}

impl DispatchConfig {
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }
}
