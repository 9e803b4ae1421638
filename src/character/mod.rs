//! Character identity: canonical descriptions, the default persona
//! catalog, and the per-user rotation pipeline that decides which
//! description a generation request actually uses.

pub mod catalog;
pub mod description;
pub mod normalizer;
pub mod rotation;
pub mod store;

pub use description::{
    extract_name, extract_value, extract_value_from_description, Description, NAME_KEY,
    UNKNOWN_VALUE,
};
pub use rotation::CharacterPromptManager;
pub use store::{RotationStore, StoreError};
