//! Maximum hit points from the level history.

use super::context::BuildContext;
use crate::aggregates::Character;
use crate::rules::CalculationEngine;

/// Maximum hit points.
///
/// The first level takes the full hit die; later levels take the recorded
/// roll or the fixed average. Each level adds the CON modifier with a floor
/// of one hit point per level, then `per_level_bonus` is added once per level.
pub fn max_hit_points(
    rules: &dyn CalculationEngine,
    character: &Character,
    context: &BuildContext,
    con_modifier: i32,
    per_level_bonus: i32,
) -> i32 {
    let mut total = 0;
    for (index, record) in character.level_history().iter().enumerate() {
        let hit_die = context
            .class(&record.class)
            .map_or(0, |c| c.class.hit_die);
        let gain = match (index, record.hp_roll) {
            (0, _) => i32::from(hit_die),
            (_, Some(roll)) => i32::from(roll.min(hit_die.max(1))),
            (_, None) => rules.average_hit_die_gain(hit_die),
        };
        total += (gain + con_modifier).max(1);
    }
    total + per_level_bonus * i32::from(character.total_level())
}
