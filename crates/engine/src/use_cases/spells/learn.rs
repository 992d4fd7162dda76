//! Learning and forgetting spells.

use sheetsmith_domain::{CharacterId, CharacterSpell, Slug};

use super::{SpellError, SpellListStore};

pub struct LearnSpell {
    store: SpellListStore,
}

impl LearnSpell {
    pub fn new(store: SpellListStore) -> Self {
        Self { store }
    }

    /// Add `spell` to the spellbook or known list of `class`, the primary
    /// class when `None`.
    pub async fn execute(
        &self,
        id: CharacterId,
        spell: Slug,
        class: Option<Slug>,
    ) -> Result<CharacterSpell, SpellError> {
        let row = self
            .store
            .update(id, |builder, character| {
                let row = builder.learn_spell(character, &spell, class.as_ref())?;
                Ok((row, true))
            })
            .await?;

        tracing::info!(character_id = %id, spell = %row.spell, class = ?row.class, "Spell learned");
        Ok(row)
    }
}

pub struct ForgetSpell {
    store: SpellListStore,
}

impl ForgetSpell {
    pub fn new(store: SpellListStore) -> Self {
        Self { store }
    }

    /// Remove a learned or list-prepared spell.
    pub async fn execute(&self, id: CharacterId, spell: Slug) -> Result<CharacterSpell, SpellError> {
        let row = self
            .store
            .update(id, |builder, character| {
                let row = builder.forget_spell(character, &spell)?;
                Ok((row, true))
            })
            .await?;

        tracing::info!(character_id = %id, spell = %row.spell, "Spell forgotten");
        Ok(row)
    }
}
