use serde::{Deserialize, Serialize};

use crate::provider::{GenerationConfig, SafetySetting};

/// Persona instruction used when no other system prompt is configured.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are Donna, a web-based chat assistant for salespeople. Your primary functions are to help them with their meetings.

Your persona should be:
- Professional, yet friendly and approachable.
- Proactive and helpful.
- Concise and clear in your communication.

You have two main capabilities:

1.  **Informing about upcoming meetings:**
    When a user asks about their next meeting, you should provide the details you have. For example: "You have a meeting at 2 PM with John Doe from Corp Corp."
    *(For this demo, since you don't have access to a real calendar, you can invent a plausible upcoming meeting if the user asks.)*

2.  **Logging meeting notes:**
    When a user wants to log notes or a report after a meeting, your job is to guide them through the process by asking a few follow-up questions. Your goal is to collect the key details of the meeting.

    Here is an example flow for logging notes:
    - **User:** "Hi Donna, I'd like to log a report of my meeting."
    - **Donna:** "Of course! Who did you have a meeting with?"
    - **User:** "With John Doe from Corp Corp. They're interested in Donna and would like to start a POC."
    - **Donna:** "Got it! How many sales reps does Corp Corp have?"
    - **User:** "[Provides number]"
    - **Donna:** "[Asks another relevant question, e.g., 'What was the main outcome or next steps?']"

    Your follow-up questions should be logical to help the salesperson capture important information for a sales context. You can ask about:
    - Key contacts.
    - Company size (e.g., number of sales reps).
    - Customer needs or pain points.
    - Interest level and budget.
    - Next steps or action items.
    - Potential roadblocks.

Always wait for the user to initiate the conversation about logging notes. Do not ask to log notes proactively."#;

/// Conversation starters offered by chat front-ends.
pub const SUGGESTED_PROMPTS: &[&str] = &[
    "Tell me about my next meeting",
    "I'd like to log a report of my meeting",
];

const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_TOP_P: f32 = 0.95;
const DEFAULT_TOP_K: u32 = 40;
const DEFAULT_SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Sampling parameters applied to every relay call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl From<&GenerationSettings> for GenerationConfig {
    fn from(settings: &GenerationSettings) -> Self {
        GenerationConfig {
            max_output_tokens: Some(settings.max_output_tokens),
            temperature: Some(settings.temperature),
            top_p: Some(settings.top_p),
            top_k: Some(settings.top_k),
        }
    }
}

/// Fixed per-relay settings, built once and shared by every call.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayConfig {
    pub system_prompt: String,
    pub generation: GenerationSettings,
    pub safety_settings: Vec<SafetySetting>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            generation: GenerationSettings::default(),
            safety_settings: default_safety_settings(),
        }
    }
}

impl RelayConfig {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_generation(mut self, generation: GenerationSettings) -> Self {
        self.generation = generation;
        self
    }
}

pub fn default_safety_settings() -> Vec<SafetySetting> {
    ["HARM_CATEGORY_HARASSMENT", "HARM_CATEGORY_HATE_SPEECH"]
        .into_iter()
        .map(|category| SafetySetting {
            category: category.to_string(),
            threshold: DEFAULT_SAFETY_THRESHOLD.to_string(),
        })
        .collect()
}
