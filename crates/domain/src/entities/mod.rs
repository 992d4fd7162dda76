//! Domain entities - records owned by the character aggregate

mod character_content;

pub use character_content::{
    Alignment, CharacterAbilityScore, CharacterClass, CharacterCondition, CharacterCounter,
    CharacterEquipment, CharacterFeature, CharacterLanguage, CharacterNote, CharacterProficiency,
    CharacterSpell, CharacterSpellSlot, DeathSaves, EquipmentMode, FeatureSelection, HitPoints,
    LevelRecord, PreparationStatus, Provenance, SlotType, SpellUses,
};
