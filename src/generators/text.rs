//! Dialogue generation.
//!
//! Turns a persona plus user dialogue turns into a short, voice-ready line
//! of character speech. The generator keeps a rolling in-process history
//! so follow-up turns stay in character, and leans on Moonshot-style
//! partial mode: the trailing empty assistant stub carries the character
//! name, which makes the model answer as that character.

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backends::chat::{ChatCompletion, ChatMessage};
use crate::character::description::{extract_value, Description, NAME_KEY};
use crate::utilities::errors::GenerationError;
use crate::utilities::extraction::extract_speech_payload;
use crate::utilities::prompts::speech_system_prompt;

/// History messages retained between calls.
pub const MAX_HISTORY_MESSAGES: usize = 10;

/// Key under which the generated speech line is returned.
pub const SAMPLE_SPEECH_KEY: &str = "SampleSpeech";

/// One user dialogue turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DialogueTurn {
    #[serde(rename = "Input")]
    pub input: String,
}

impl DialogueTurn {
    pub fn new(input: impl Into<String>) -> Self {
        Self { input: input.into() }
    }
}

/// Chat-backed dialogue generator with per-instance history.
pub struct DialogueGenerator {
    llm: ChatCompletion,
    history: Vec<ChatMessage>,
    character_name: Option<String>,
}

impl DialogueGenerator {
    pub fn new(llm: ChatCompletion) -> Self {
        Self {
            llm,
            history: Vec::new(),
            character_name: None,
        }
    }

    /// Generator backed by the Moonshot role-play configuration.
    pub fn moonshot() -> Self {
        Self::new(ChatCompletion::moonshot())
    }

    /// The character this generator has locked onto, if any.
    pub fn character_name(&self) -> Option<&str> {
        self.character_name.as_deref()
    }

    fn resolve_character_name(
        &mut self,
        description: &Description,
        character_name: Option<&str>,
    ) {
        if self.character_name.is_none() {
            self.character_name = character_name
                .map(str::to_string)
                .or_else(|| extract_value(description, NAME_KEY));
        }
    }

    fn merge_user_input(dialogues: &[DialogueTurn]) -> String {
        dialogues
            .iter()
            .map(|turn| turn.input.trim())
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Assemble the full message list for one request: system prompt with
    /// persona, trimmed history, the merged user input, and the partial
    /// assistant stub.
    fn build_messages(&mut self, dialogues: &[DialogueTurn], description: &Description) -> Vec<ChatMessage> {
        let user_input = Self::merge_user_input(dialogues);

        if self.history.len() > MAX_HISTORY_MESSAGES {
            self.history = self
                .history
                .split_off(self.history.len() - MAX_HISTORY_MESSAGES);
        }

        let mut messages = vec![ChatMessage::system(speech_system_prompt(description))];
        messages.extend(self.history.iter().cloned());
        messages.push(ChatMessage::user(user_input));
        messages.push(ChatMessage::partial_assistant(self.character_name.clone()));
        messages
    }

    /// Generate the structured speech payload for the given turns.
    ///
    /// Returns the parsed JSON object (normally `{"SampleSpeech": ...}`).
    ///
    /// # Errors
    /// Fails when the chat backend errors or when no JSON object can be
    /// recovered from the reply.
    pub async fn generate_text(
        &mut self,
        dialogues: &[DialogueTurn],
        description: &Description,
        character_name: Option<&str>,
    ) -> Result<Value, GenerationError> {
        self.resolve_character_name(description, character_name);
        let messages = self.build_messages(dialogues, description);
        let user_input = Self::merge_user_input(dialogues);

        let response = self.llm.chat(&messages, None).await?;

        self.history.push(ChatMessage::user(user_input));
        self.history.push(ChatMessage::assistant(response.clone()));

        extract_speech_payload(&response).ok_or(GenerationError::MalformedResponse {
            backend: self.llm.provider(),
            field: "speech payload",
        })
    }

    /// [`generate_text`](Self::generate_text), reduced to the speech line
    /// itself.
    pub async fn generate_sample_speech(
        &mut self,
        dialogues: &[DialogueTurn],
        description: &Description,
        character_name: Option<&str>,
    ) -> Result<String, GenerationError> {
        let payload = self
            .generate_text(dialogues, description, character_name)
            .await?;
        payload
            .get(SAMPLE_SPEECH_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(GenerationError::MalformedResponse {
                backend: self.llm.provider(),
                field: "SampleSpeech",
            })
    }

    /// Streaming variant: yields reply tokens as they arrive.
    ///
    /// The user turn is committed to history up front; the assistant reply
    /// is not recorded, since the full text never passes through here.
    pub fn generate_text_stream(
        &mut self,
        dialogues: &[DialogueTurn],
        description: &Description,
        character_name: Option<&str>,
    ) -> impl Stream<Item = Result<String, GenerationError>> {
        self.resolve_character_name(description, character_name);
        let messages = self.build_messages(dialogues, description);
        self.history
            .push(ChatMessage::user(Self::merge_user_input(dialogues)));
        let llm = self.llm.clone();

        async_stream::try_stream! {
            let stream = llm.chat_stream(&messages, None);
            futures::pin_mut!(stream);
            while let Some(token) = stream.next().await {
                yield token?;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn airi() -> Description {
        vec![
            json!({"Name": "Airi"}),
            json!({"Gender": "Female"}),
            json!({"Personality": "Gentle"}),
        ]
    }

    fn generator() -> DialogueGenerator {
        DialogueGenerator::new(ChatCompletion::new(
            "test",
            "TEST_KEY",
            "test-model",
            Some("key".to_string()),
            "http://localhost:9",
        ))
    }

    #[test]
    fn messages_start_with_the_persona_system_prompt() {
        let mut gen = generator();
        let messages = gen.build_messages(&[DialogueTurn::new("Hi")], &airi());

        assert_eq!(messages[0].role, "system");
        assert!(messages[0].content.contains("**Persona**:\nName: Airi"));
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "Hi");
    }

    #[test]
    fn trailing_stub_is_partial_and_named() {
        let mut gen = generator();
        gen.resolve_character_name(&airi(), None);
        let messages = gen.build_messages(&[DialogueTurn::new("Hi")], &airi());

        let stub = messages.last().unwrap();
        assert_eq!(stub.partial, Some(true));
        assert_eq!(stub.name.as_deref(), Some("Airi"));
        assert!(stub.content.is_empty());
    }

    #[test]
    fn explicit_character_name_wins_over_the_description() {
        let mut gen = generator();
        gen.resolve_character_name(&airi(), Some("Jessica"));
        assert_eq!(gen.character_name(), Some("Jessica"));

        // Locked once; later descriptions do not change it.
        gen.resolve_character_name(&airi(), None);
        assert_eq!(gen.character_name(), Some("Jessica"));
    }

    #[test]
    fn blank_turns_are_dropped_when_merging_input() {
        let turns = vec![
            DialogueTurn::new("Hello"),
            DialogueTurn::new("   "),
            DialogueTurn::new("How are you?"),
        ];
        assert_eq!(
            DialogueGenerator::merge_user_input(&turns),
            "Hello\nHow are you?"
        );
    }

    #[test]
    fn history_is_capped_before_building_messages() {
        let mut gen = generator();
        for i in 0..20 {
            gen.history.push(ChatMessage::user(format!("turn {i}")));
        }
        let messages = gen.build_messages(&[DialogueTurn::new("Hi")], &airi());

        // system + capped history + user + partial stub
        assert_eq!(messages.len(), 1 + MAX_HISTORY_MESSAGES + 2);
        assert_eq!(messages[1].content, "turn 10");
    }

    #[test]
    fn dialogue_turns_use_the_wire_key() {
        let turn: DialogueTurn = serde_json::from_value(json!({"Input": "Hi"})).unwrap();
        assert_eq!(turn.input, "Hi");
        assert_eq!(serde_json::to_value(&turn).unwrap(), json!({"Input": "Hi"}));
    }
}
