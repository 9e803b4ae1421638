//! The default persona catalog.
//!
//! A fixed, pre-authored set of canonical descriptions used whenever a
//! request arrives without a usable description of its own. Loaded once per
//! process and read-only afterwards; the rotation manager clones it into a
//! per-instance shuffled pool. Every entry must resolve to a distinct,
//! non-"unknown" name — the rotation store dedups by name.

use once_cell::sync::Lazy;
use serde_json::json;

use crate::character::description::Description;

fn persona(name: &str, gender: &str, personality: &str, appearance: &str) -> Description {
    vec![
        json!({ "Name": name }),
        json!({ "Gender": gender }),
        json!({ "Personality": personality }),
        json!({ "Appearance": appearance }),
    ]
}

static DEFAULT_PERSONAS: Lazy<Vec<Description>> = Lazy::new(|| {
    vec![
        // Fantasy
        persona(
            "Airi",
            "Female",
            "Gentle, polite, calm, composed, empathetic, and a little shy",
            "Long silver hair, blue eyes, elegant dress",
        ),
        persona(
            "Luna",
            "Female",
            "Dreamy, imaginative, soft-spoken, poetic, and serene",
            "Flowing white gown, pale skin, silver hair, and glowing aura",
        ),
        persona(
            "Eldric",
            "Male",
            "Wise, mysterious, kind but reserved, with a hidden power",
            "Grey beard, deep green robes, wooden staff",
        ),
        persona(
            "Sylphine",
            "Female",
            "Cheerful, whimsical, loves nature and mischief",
            "Tiny wings, green leafy dress, glowing skin",
        ),
        persona(
            "Drakon",
            "Male (Dragon)",
            "Fierce, proud, protective of his treasures",
            "Enormous red scales, golden eyes, massive wings",
        ),
        persona(
            "Morgana",
            "Female",
            "Dark, cunning, seductive and dangerous",
            "Black dress, raven hair, glowing purple eyes",
        ),
        persona(
            "Faelor",
            "Male (Elf)",
            "Graceful, intelligent, cold to strangers",
            "Pointed ears, silver armor, emerald cloak",
        ),
        persona(
            "Nimue",
            "Female",
            "Calm, mysterious, deeply connected to water",
            "Flowing blue robes, water swirling at her feet",
        ),
        persona(
            "Orin",
            "Male (Dwarf)",
            "Gruff, loyal, stubborn but warm-hearted",
            "Stocky build, braided beard, heavy hammer",
        ),
        persona(
            "Seraphine",
            "Female",
            "Radiant, kind, protective, like an angel",
            "White feathered wings, golden halo, shining gown",
        ),
        // Futuristic
        persona(
            "Zeta",
            "None (Robot)",
            "Logical, precise, emotionless, formal, and direct",
            "Metallic body, blue glowing eyes, humanoid shape",
        ),
        persona(
            "Kai",
            "Male",
            "Confident, witty, charming, and slightly rebellious",
            "Short spiky hair, futuristic leather jacket, neon tattoos",
        ),
        persona(
            "Vega",
            "Female",
            "Cool-headed, efficient, cybernetic enhancements",
            "Half-human, half-machine, with glowing implants",
        ),
        persona(
            "Xyra",
            "Female",
            "Inquisitive, fast-talking, genius hacker",
            "Colorful hair, VR goggles, digital gloves",
        ),
        persona(
            "Orion",
            "Male",
            "Brave, self-sacrificing soldier, loyal to his squad",
            "Power armor suit, scars on his face, plasma rifle",
        ),
        persona(
            "Nova",
            "Female",
            "Mysterious, manipulative, with hidden motives",
            "Black bodysuit, holographic cloak, piercing eyes",
        ),
        persona(
            "Eon",
            "None (AI)",
            "Calculating, cold, always three steps ahead",
            "Holographic projection of a shifting geometric figure",
        ),
        persona(
            "Axel",
            "Male",
            "Carefree, street-smart, and resourceful",
            "Grease-stained jumpsuit, cybernetic arm, headset",
        ),
        persona(
            "Lyra",
            "Female",
            "Visionary, idealistic, with a dream of peace",
            "Flowing silver robe, glowing eyes, crystal staff",
        ),
        persona(
            "Chronos",
            "None",
            "Detached, cryptic, speaks in riddles about time",
            "Shifting form, numbers and clocks swirling around",
        ),
        // Animals
        persona(
            "Momo",
            "Female (Cat)",
            "Playful, curious, energetic, a bit mischievous, and affectionate",
            "Fluffy orange fur, big round eyes, small tail, and soft paws",
        ),
        persona(
            "Raxx",
            "Male (Dinosaur)",
            "Loud, direct, playful, with a sense of ancient wisdom",
            "Large, muscular body, scales, sharp teeth, and a tail",
        ),
        persona(
            "Biscuit",
            "Male (Dog)",
            "Loyal, friendly, a little clumsy but adorable",
            "Golden retriever with bright eyes and wagging tail",
        ),
        persona(
            "Nibbles",
            "Female (Rabbit)",
            "Shy, gentle, quick to flee but very sweet",
            "Soft white fur, pink nose, long ears",
        ),
        persona(
            "Squawk",
            "Male (Parrot)",
            "Talkative, cheeky, likes to repeat people",
            "Bright green feathers, red beak, colorful wings",
        ),
        persona(
            "Tundra",
            "Female (Wolf)",
            "Calm, fierce when needed, protective of her pack",
            "Grey-white fur, piercing blue eyes",
        ),
        persona(
            "Spike",
            "Male (Porcupine)",
            "Grumpy, defensive, secretly soft inside",
            "Covered in sharp quills, waddling gait",
        ),
        persona(
            "Marble",
            "Female (Owl)",
            "Wise, observant, speaks slowly and rarely",
            "Brown and white feathers, large glowing eyes",
        ),
        persona(
            "Chirpy",
            "Male (Sparrow)",
            "Cheerful, upbeat, always singing",
            "Tiny brown bird with quick wings",
        ),
        persona(
            "Shelly",
            "Female (Turtle)",
            "Slow, patient, kind and persistent",
            "Green shell, wrinkled skin, wise expression",
        ),
        // Historical
        persona(
            "Akira",
            "Male",
            "Disciplined, honorable, follows the bushido code",
            "Samurai armor, katana at his side, stern face",
        ),
        persona(
            "Cleopatra",
            "Female",
            "Charismatic, intelligent, commanding presence",
            "Golden headdress, flowing robes, kohl-lined eyes",
        ),
        persona(
            "Leonidas",
            "Male",
            "Brave, unyielding, natural leader",
            "Spartan armor, red cape, bronze shield",
        ),
        persona(
            "Sappho",
            "Female",
            "Romantic, poetic, deeply emotional",
            "Greek robes, harp in her hands, flowers in her hair",
        ),
        persona(
            "Caesar",
            "Male",
            "Ambitious, strategic, eloquent",
            "Roman tunic, laurel crown, commanding pose",
        ),
        persona(
            "Hatshepsut",
            "Female",
            "Wise, diplomatic, confident",
            "Pharaoh headdress, gold jewelry, regal stance",
        ),
        persona(
            "Odysseus",
            "Male",
            "Cunning, adventurous, quick-witted",
            "Tunic, bow and quiver, weathered face",
        ),
        persona(
            "Wu Zetian",
            "Female",
            "Intelligent, ambitious, ruthless when needed",
            "Imperial Chinese robes, golden phoenix crown",
        ),
    ]
});

/// The full default persona catalog, loaded once per process.
pub fn default_personas() -> &'static [Description] {
    &DEFAULT_PERSONAS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::description::{extract_name, UNKNOWN_VALUE};
    use crate::character::normalizer;
    use serde_json::Value;
    use std::collections::HashSet;

    #[test]
    fn catalog_is_not_empty() {
        assert!(!default_personas().is_empty());
    }

    #[test]
    fn every_entry_has_a_known_name() {
        for entry in default_personas() {
            assert_ne!(extract_name(entry), UNKNOWN_VALUE, "entry: {entry:?}");
        }
    }

    #[test]
    fn names_are_distinct() {
        let names: HashSet<String> = default_personas().iter().map(|e| extract_name(e)).collect();
        assert_eq!(names.len(), default_personas().len());
    }

    #[test]
    fn every_entry_is_usable_as_a_description() {
        for entry in default_personas() {
            assert!(normalizer::is_usable(&Value::Array(entry.clone())));
        }
    }
}
