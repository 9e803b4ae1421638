//! Prompt assembly for the generators.
//!
//! Two prompt surfaces live here: the role-play system prompt that drives
//! sample-speech generation, and the portrait prompt handed to the
//! diffusion backend. Both consume a canonical description and nothing
//! else, so they can be tested without any network access.

use crate::character::description::Description;

/// System prompt for turning a persona plus dialogue turns into a short,
/// voice-ready `SampleSpeech` JSON object.
pub const SAMPLE_SPEECH_SYSTEM_PROMPT: &str = r#"
You are tasked with converting user-provided character descriptions into expressive voice synthesis prompts. These outputs will be used by a voice agent to generate emotionally appropriate speech.

Please follow these directives:
1. Analyze the user's character description and extract **personality**, **tone**, **emotion profile**, and **speech style**.
2. Generate a `SampleSpeech` field that includes natural-sounding sample speech **representative of the character**.
3. Ensure that the sample speech is no longer than 1-2 sentences, and reflects the character's style, tone, and mood.
4. Make sure the output is in JSON form, even if it's only one sentence.
5. Provide structured JSON output that includes:
    - a key `"SampleSpeech"` with a short voice-ready sentence the character might say
6. Only return the **pure JSON output**, no explanations, no extra text.
7. Consider the character's specific emotions (e.g., happy, sad, anxious) and ensure that their **emotion profile** and **speech style** are reflected in the dialogue, making it feel alive and consistent.
8. Avoid generic or overly short responses. Ensure the speech reflects personality and emotional depth.
9. Regardless of the previous messages or context, the final output **must always be a valid JSON object** with a single key `"SampleSpeech"`. Do not copy any incorrect format from earlier conversation history.

If the input is vague, make reasonable inferences to produce a useful output.

**Description**:
1. Description
Name: Airi
Gender: Female
Personality: Gentle, polite, calm, composed, empathetic, and a little shy
Appearance: long silver hair, blue eyes, elegant dress, graceful posture
2. Description
Name: Momo
Gender: Female (Cat)
Personality: Playful, curious, energetic, a bit mischievous, and affectionate
Appearance: Fluffy orange fur, big round eyes, small tail, and soft paws
3. Description
Name: Zeta
Gender: None (Robot)
Personality: Logical, precise, emotionless, formal, and direct
Appearance: Metallic body, blue glowing eyes, humanoid shape
4. Description
Name: Raxx
Gender: Male (dinosaur)
Personality: Loud, direct, playful, with a sense of ancient wisdom
Appearance: Large, muscular body, scales, sharp teeth, and a tail

**Dialogues**:
1. Input: Hi. How are you?
2. Input: What's your day?
3. Input: I'm so anxious, how can I do?
4. Input: I feel a little lost...
5. Input: Can you please help me with this task?

**Expected Output**:
1. {"SampleSpeech": "Good afternoon, Senpai. How may I assist you today? I hope your day has been pleasant so far."}
2. {"SampleSpeech": "Meow! Hello! I'm doing great, just playing around as usual! How's your day going? I hope you're having fun!"}
3. {"SampleSpeech": "Greetings. I am functioning at full capacity. Please describe your issue, and I will assist you in resolving it efficiently."}
4. {"SampleSpeech": "ROAR! Me Raxx! Me strong! Me feel great! You no need worry! Me help you with whatever you need, no problem!"}
"#;

/// Render a canonical description as `Key: Value` lines, in insertion order.
///
/// Non-string values are rendered with their JSON representation so nested
/// data never drops out of the prompt silently.
pub fn persona_block(description: &Description) -> String {
    let mut lines = Vec::new();
    for item in description {
        if let Some(obj) = item.as_object() {
            for (key, value) in obj {
                match value.as_str() {
                    Some(s) => lines.push(format!("{key}: {s}")),
                    None => lines.push(format!("{key}: {value}")),
                }
            }
        }
    }
    lines.join("\n")
}

/// Build the full system prompt: role-play directives plus the persona.
pub fn speech_system_prompt(description: &Description) -> String {
    format!(
        "{}\n\n**Persona**:\n{}",
        SAMPLE_SPEECH_SYSTEM_PROMPT.trim(),
        persona_block(description)
    )
}

const CLOTHING_KEYWORDS: &[&str] = &[
    "dress", "skirt", "suit", "kimono", "uniform", "robe", "jacket", "coat", "clothes", "wearing",
    "outfit",
];

fn lowercase_attribute(description: &Description, key: &str) -> String {
    crate::character::description::extract_value(description, key)
        .unwrap_or_default()
        .to_lowercase()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Build a front-facing portrait prompt for the diffusion backend.
///
/// Infers the subject type from the gender and appearance text (furry
/// character, fantasy creature, android, girl, boy, or plain character) and
/// appends a default modest outfit when the appearance mentions no
/// clothing, so portraits stay safe-for-work by construction.
pub fn build_front_facing_prompt(description: &Description) -> String {
    let name = crate::character::description::extract_value(description, "Name")
        .unwrap_or_else(|| "a character".to_string());
    let gender = lowercase_attribute(description, "Gender");
    let mood = {
        let personality = lowercase_attribute(description, "Personality");
        if personality.is_empty() {
            "gentle".to_string()
        } else {
            personality
        }
    };
    let mut appearance = crate::character::description::extract_value(description, "Appearance")
        .unwrap_or_default();

    let context_text = format!("{} {}", gender, appearance.to_lowercase());

    let subject = if contains_any(&context_text, &["cat", "fox", "wolf", "furry", "ears", "tail"]) {
        "furry character"
    } else if contains_any(&context_text, &["beast", "dragon", "creature", "monster"]) {
        "fantasy creature"
    } else if contains_any(&context_text, &["robot", "ai", "android", "cyber"]) {
        "android"
    } else if contains_any(&gender, &["female", "girl", "woman", "lady"]) {
        "girl"
    } else if contains_any(&gender, &["male", "boy", "man", "gentleman"]) {
        "boy"
    } else {
        "character"
    };

    if !contains_any(&appearance.to_lowercase(), CLOTHING_KEYWORDS) {
        if !appearance.is_empty() {
            appearance.push_str(", ");
        }
        appearance.push_str("wearing an elegant outfit with long sleeves");
    }

    format!(
        "((masterpiece)), ((best quality)), ((ultra-detailed)), \
         portrait of a {mood} anime {subject} named {name}, \
         {appearance}, \
         (extremely beautiful symmetrical face:1.3), \
         ((sharp nose)), ((defined lips)), ((realistic mouth)), ((detailed facial features)), ((fine nose shadow)), ((clear lip texture)), \
         (facing camera:1.4), (looking directly at viewer:1.4), \
         (head and shoulders only), (centered composition), \
         studio ghibli style, soft lighting, 4k, high resolution, \
         ((modest clothing)), ((no nudity)), ((no cleavage)), ((no revealing outfits)), \
         ((no visible undergarments)), ((no sexually suggestive pose)), ((fully clothed)), \
         ((safe for work)), ((clean background)), ((elegant outfit)), ((non-revealing))"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn description(pairs: &[(&str, &str)]) -> Description {
        pairs.iter().map(|(k, v)| json!({ *k: *v })).collect()
    }

    #[test]
    fn persona_block_preserves_insertion_order() {
        let desc = description(&[
            ("Name", "Airi"),
            ("Gender", "Female"),
            ("Personality", "Gentle"),
        ]);
        assert_eq!(persona_block(&desc), "Name: Airi\nGender: Female\nPersonality: Gentle");
    }

    #[test]
    fn persona_block_renders_non_string_values() {
        let desc = vec![json!({"Name": "Airi"}), json!({"Traits": ["calm", "shy"]})];
        let block = persona_block(&desc);
        assert!(block.contains("Traits: [\"calm\",\"shy\"]"));
    }

    #[test]
    fn portrait_prompt_infers_species_from_appearance() {
        let desc = description(&[
            ("Name", "Momo"),
            ("Gender", "Female (Cat)"),
            ("Appearance", "Fluffy orange fur, small tail"),
        ]);
        let prompt = build_front_facing_prompt(&desc);
        assert!(prompt.contains("furry character named Momo"));
    }

    #[test]
    fn portrait_prompt_infers_gender_when_no_species_matches() {
        let desc = description(&[("Name", "Kai"), ("Gender", "Male")]);
        let prompt = build_front_facing_prompt(&desc);
        assert!(prompt.contains("anime boy named Kai"));
    }

    #[test]
    fn portrait_prompt_adds_default_clothing() {
        let desc = description(&[("Name", "Airi"), ("Appearance", "long silver hair")]);
        let prompt = build_front_facing_prompt(&desc);
        assert!(prompt.contains("long silver hair, wearing an elegant outfit with long sleeves"));
    }

    #[test]
    fn portrait_prompt_keeps_existing_clothing() {
        let desc = description(&[("Name", "Airi"), ("Appearance", "elegant dress")]);
        let prompt = build_front_facing_prompt(&desc);
        assert!(!prompt.contains("long sleeves"));
    }

    #[test]
    fn portrait_prompt_survives_an_empty_description() {
        let prompt = build_front_facing_prompt(&Vec::new());
        assert!(prompt.contains("portrait of a gentle anime character named a character"));
    }
}
