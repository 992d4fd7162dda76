//! Per-class progression rows and the shared multiclass slot table.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Highest character or class level.
pub const MAX_LEVEL: u8 = 20;

/// One row of a class progression table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressionRow {
    pub level: u8,
    pub cantrips_known: u8,
    /// Only for `known` casters
    pub spells_known: Option<u8>,
    /// Slots for spell levels 1st..9th. A pact caster's row has a single
    /// non-zero column at its pact slot level.
    pub spell_slots: [u8; 9],
}

impl ProgressionRow {
    pub fn new(level: u8, cantrips_known: u8, spell_slots: &[u8]) -> Result<Self, DomainError> {
        if !(1..=MAX_LEVEL).contains(&level) {
            return Err(DomainError::validation(format!(
                "progression level must be 1..={}, got {}",
                MAX_LEVEL, level
            )));
        }
        if spell_slots.len() > 9 {
            return Err(DomainError::validation(format!(
                "progression row for level {} lists {} slot levels",
                level,
                spell_slots.len()
            )));
        }
        let mut slots = [0u8; 9];
        slots[..spell_slots.len()].copy_from_slice(spell_slots);
        Ok(Self {
            level,
            cantrips_known,
            spells_known: None,
            spell_slots: slots,
        })
    }

    pub fn with_spells_known(mut self, known: u8) -> Self {
        self.spells_known = Some(known);
        self
    }

    pub fn has_slots(&self) -> bool {
        self.spell_slots.iter().any(|&n| n > 0)
    }

    /// Highest spell level with at least one slot, 0 when none.
    pub fn highest_slot_level(&self) -> u8 {
        self.spell_slots
            .iter()
            .rposition(|&n| n > 0)
            .map_or(0, |i| i as u8 + 1)
    }

    /// `(spell_level, count)` for every non-zero column.
    pub fn slots(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.spell_slots
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .map(|(i, &n)| (i as u8 + 1, n))
    }
}

/// Shared multiclass spell-slot table, indexed by total caster level - 1.
pub const MULTICLASS_SPELL_SLOTS: [[u8; 9]; 20] = [
    [2, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 0, 0, 0, 0, 0, 0, 0, 0],
    [4, 2, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 0, 0, 0, 0, 0, 0, 0],
    [4, 3, 2, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 0, 0, 0, 0, 0, 0],
    [4, 3, 3, 1, 0, 0, 0, 0, 0],
    [4, 3, 3, 2, 0, 0, 0, 0, 0],
    [4, 3, 3, 3, 1, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 0, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 0, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 0, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 0],
    [4, 3, 3, 3, 2, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 1, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 1, 1, 1],
    [4, 3, 3, 3, 3, 2, 2, 1, 1],
];

/// Shared-table row for a total caster level; zero below 1, clamped at 20.
pub fn multiclass_slots(total_caster_level: u8) -> [u8; 9] {
    match total_caster_level {
        0 => [0; 9],
        level => MULTICLASS_SPELL_SLOTS[(level.min(MAX_LEVEL) - 1) as usize],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiclass_table_edges() {
        assert_eq!(multiclass_slots(0), [0; 9]);
        assert_eq!(multiclass_slots(1)[0], 2);
        assert_eq!(multiclass_slots(25), multiclass_slots(20));
    }

    #[test]
    fn multiclass_level_seven_row() {
        assert_eq!(multiclass_slots(7), [4, 3, 3, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn row_helpers() {
        let row = ProgressionRow::new(5, 4, &[4, 3, 2]).unwrap();
        assert!(row.has_slots());
        assert_eq!(row.highest_slot_level(), 3);
        assert_eq!(row.slots().collect::<Vec<_>>(), vec![(1, 4), (2, 3), (3, 2)]);

        let pact = ProgressionRow::new(5, 3, &[0, 0, 2]).unwrap();
        assert_eq!(pact.highest_slot_level(), 3);
    }

    #[test]
    fn row_validation() {
        assert!(ProgressionRow::new(0, 0, &[]).is_err());
        assert!(ProgressionRow::new(21, 0, &[]).is_err());
        assert!(ProgressionRow::new(1, 0, &[1; 10]).is_err());
    }
}
