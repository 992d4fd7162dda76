//! A small SRD-style compendium for tests.
//!
//! Enabled for this crate's own tests and, through the `testing` feature, for
//! downstream crates. [`srd_catalog_with_offset`] rebuilds the same content
//! with shifted internal keys to simulate a reseed.

use crate::compendium::{
    Background, Catalog, CatalogBuilder, Choice, ChoiceFilter, ChoiceType, Class, Condition,
    DataTable, DataTableEntry, EntityCounter, EntityKind, Feat, Item, Language, LanguageGrant,
    Modifier, ModifierCategory, Monster, OptionalFeature, Prerequisite, PrerequisiteTarget,
    ProficiencyCategory, ProficiencyGrant, ProficiencySubject, ProficiencyType, ProgressionRow,
    Race, Skill, Spell, SpellGrant, Trait, MULTICLASS_SPELL_SLOTS,
};
use crate::error::DomainError;
use crate::rules::{CasterType, PreparationMethod};
use crate::value_objects::{Ability, ResetTiming, Slug, UsesLimit};

fn sl(value: &str) -> Result<Slug, DomainError> {
    Slug::new(value)
}

fn skill(value: &str) -> Result<ProficiencySubject, DomainError> {
    Ok(ProficiencySubject::Skill(sl(value)?))
}

fn armor(value: &str) -> Result<ProficiencySubject, DomainError> {
    Ok(ProficiencySubject::Armor(sl(value)?))
}

fn weapon(value: &str) -> Result<ProficiencySubject, DomainError> {
    Ok(ProficiencySubject::Weapon(sl(value)?))
}

fn language(value: &str) -> Result<LanguageGrant, DomainError> {
    Ok(LanguageGrant {
        language: sl(value)?,
    })
}

/// `quantity` picks from a fixed list of skills.
fn skill_options(group: &str, quantity: u8, skills: &[&str]) -> Result<Vec<ProficiencyGrant>, DomainError> {
    let mut rows = Vec::with_capacity(skills.len());
    for (index, name) in skills.iter().enumerate() {
        let row = ProficiencyGrant::option(group, skill(name)?);
        rows.push(if index == 0 { row.with_quantity(quantity) } else { row });
    }
    Ok(rows)
}

/// `quantity` picks of `choice_type` from fixed targets.
fn choice_options(
    group: &str,
    choice_type: ChoiceType,
    quantity: u8,
    targets: &[&str],
) -> Result<Vec<Choice>, DomainError> {
    let mut rows = Vec::with_capacity(targets.len());
    for (index, target) in targets.iter().enumerate() {
        let row = Choice::new(group, choice_type).target(sl(target)?);
        rows.push(if index == 0 { row.quantity(quantity) } else { row });
    }
    Ok(rows)
}

fn spell_filter(class_list: &str, cantrip: Option<bool>, max_level: Option<u8>) -> Result<ChoiceFilter, DomainError> {
    Ok(ChoiceFilter {
        class_list: Some(sl(class_list)?),
        cantrip,
        max_level,
        ..ChoiceFilter::default()
    })
}

fn feature_filter(feature_type: &str) -> ChoiceFilter {
    ChoiceFilter {
        feature_type: Some(feature_type.to_string()),
        ..ChoiceFilter::default()
    }
}

fn spell_choice(group: &str, class_list: &str, quantity: u8) -> Result<SpellGrant, DomainError> {
    Ok(SpellGrant {
        spell: None,
        max_level: Some(0),
        school: None,
        class_list: Some(sl(class_list)?),
        cantrip: true,
        charges_min: None,
        charges_max: None,
        level: None,
        choice_group: Some(group.to_string()),
        quantity: Some(quantity),
        uses: None,
    })
}

fn prerequisite_level(group_id: u8, minimum: u8) -> Prerequisite {
    Prerequisite {
        group_id,
        target: PrerequisiteTarget::Level { minimum },
        description: None,
    }
}

fn full_caster_rows(
    builder: &mut CatalogBuilder,
    class: &str,
    cantrips: fn(u8) -> u8,
    known: Option<fn(u8) -> u8>,
) -> Result<(), DomainError> {
    for level in 1..=20u8 {
        let mut row = ProgressionRow::new(
            level,
            cantrips(level),
            &MULTICLASS_SPELL_SLOTS[usize::from(level - 1)],
        )?;
        if let Some(known) = known {
            row = row.with_spells_known(known(level));
        }
        builder.progression(sl(class)?, row);
    }
    Ok(())
}

fn half_caster_slots(level: u8) -> &'static [u8] {
    match level {
        1 => &[],
        2 => &[2],
        3 | 4 => &[3],
        5 | 6 => &[4, 2],
        7 | 8 => &[4, 3],
        9 | 10 => &[4, 3, 2],
        11 | 12 => &[4, 3, 3],
        13 | 14 => &[4, 3, 3, 1],
        15 | 16 => &[4, 3, 3, 2],
        17 | 18 => &[4, 3, 3, 3, 1],
        _ => &[4, 3, 3, 3, 2],
    }
}

fn third_caster_slots(level: u8) -> &'static [u8] {
    match level {
        1 | 2 => &[],
        3 => &[2],
        4..=6 => &[3],
        7..=9 => &[4, 2],
        10..=12 => &[4, 3],
        13..=15 => &[4, 3, 2],
        16..=18 => &[4, 3, 3],
        _ => &[4, 3, 3, 1],
    }
}

/// A pact caster's row: one column at the pact slot level.
fn pact_slots(level: u8) -> [u8; 9] {
    let count = match level {
        1 => 1,
        2..=10 => 2,
        11..=16 => 3,
        _ => 4,
    };
    let slot_level = usize::from(level.div_ceil(2).min(5));
    let mut slots = [0u8; 9];
    slots[slot_level - 1] = count;
    slots
}

fn sorcerer_spells_known(level: u8) -> u8 {
    match level {
        1..=11 => level + 1,
        12 => 12,
        13 | 14 => 13,
        15 | 16 => 14,
        _ => 15,
    }
}

const SKILLS: [(&str, &str, Ability); 18] = [
    ("acrobatics", "Acrobatics", Ability::Dex),
    ("animal-handling", "Animal Handling", Ability::Wis),
    ("arcana", "Arcana", Ability::Int),
    ("athletics", "Athletics", Ability::Str),
    ("deception", "Deception", Ability::Cha),
    ("history", "History", Ability::Int),
    ("insight", "Insight", Ability::Wis),
    ("intimidation", "Intimidation", Ability::Cha),
    ("investigation", "Investigation", Ability::Int),
    ("medicine", "Medicine", Ability::Wis),
    ("nature", "Nature", Ability::Int),
    ("perception", "Perception", Ability::Wis),
    ("performance", "Performance", Ability::Cha),
    ("persuasion", "Persuasion", Ability::Cha),
    ("religion", "Religion", Ability::Int),
    ("sleight-of-hand", "Sleight of Hand", Ability::Dex),
    ("stealth", "Stealth", Ability::Dex),
    ("survival", "Survival", Ability::Wis),
];

const PROFICIENCY_TYPES: [(&str, &str, ProficiencyCategory); 9] = [
    ("light-armor", "Light Armor", ProficiencyCategory::Armor),
    ("medium-armor", "Medium Armor", ProficiencyCategory::Armor),
    ("heavy-armor", "Heavy Armor", ProficiencyCategory::Armor),
    ("shields", "Shields", ProficiencyCategory::Armor),
    ("simple-weapons", "Simple Weapons", ProficiencyCategory::Weapon),
    ("martial-weapons", "Martial Weapons", ProficiencyCategory::Weapon),
    ("thieves-tools", "Thieves' Tools", ProficiencyCategory::Tool),
    ("vehicles-land", "Vehicles (Land)", ProficiencyCategory::Tool),
    ("dice-set", "Dice Set", ProficiencyCategory::Tool),
];

const LANGUAGES: [(&str, &str, bool); 11] = [
    ("common", "Common", false),
    ("dwarvish", "Dwarvish", false),
    ("elvish", "Elvish", false),
    ("giant", "Giant", false),
    ("gnomish", "Gnomish", false),
    ("goblin", "Goblin", false),
    ("halfling", "Halfling", false),
    ("orc", "Orc", false),
    ("draconic", "Draconic", true),
    ("celestial", "Celestial", true),
    ("infernal", "Infernal", true),
];

/// `(slug, name, level, school, class lists)`
const SPELLS: [(&str, &str, u8, &str, &[&str]); 22] = [
    ("light", "Light", 0, "evocation", &["cleric", "wizard", "sorcerer"]),
    ("sacred-flame", "Sacred Flame", 0, "evocation", &["cleric"]),
    ("guidance", "Guidance", 0, "divination", &["cleric"]),
    ("thaumaturgy", "Thaumaturgy", 0, "transmutation", &["cleric"]),
    ("fire-bolt", "Fire Bolt", 0, "evocation", &["wizard", "sorcerer"]),
    ("mage-hand", "Mage Hand", 0, "conjuration", &["wizard", "sorcerer", "warlock"]),
    ("minor-illusion", "Minor Illusion", 0, "illusion", &["wizard", "sorcerer", "warlock"]),
    ("prestidigitation", "Prestidigitation", 0, "transmutation", &["wizard", "sorcerer", "warlock"]),
    ("eldritch-blast", "Eldritch Blast", 0, "evocation", &["warlock"]),
    ("bless", "Bless", 1, "enchantment", &["cleric", "paladin"]),
    ("cure-wounds", "Cure Wounds", 1, "evocation", &["cleric", "paladin"]),
    ("detect-magic", "Detect Magic", 1, "divination", &["cleric", "wizard", "paladin", "sorcerer"]),
    ("magic-missile", "Magic Missile", 1, "evocation", &["wizard", "sorcerer"]),
    ("shield", "Shield", 1, "abjuration", &["wizard", "sorcerer"]),
    ("sleep", "Sleep", 1, "enchantment", &["wizard", "sorcerer"]),
    ("burning-hands", "Burning Hands", 1, "evocation", &["wizard", "sorcerer"]),
    ("mage-armor", "Mage Armor", 1, "abjuration", &["wizard", "sorcerer"]),
    ("disguise-self", "Disguise Self", 1, "illusion", &["wizard", "sorcerer"]),
    ("charm-person", "Charm Person", 1, "enchantment", &["wizard", "sorcerer", "warlock"]),
    ("hex", "Hex", 1, "enchantment", &["warlock"]),
    ("misty-step", "Misty Step", 2, "conjuration", &["wizard", "sorcerer", "warlock"]),
    ("fireball", "Fireball", 3, "evocation", &["wizard", "sorcerer"]),
];

const ITEMS: [(&str, &str, &str); 8] = [
    ("mace", "Mace", "weapon"),
    ("warhammer", "Warhammer", "weapon"),
    ("longsword", "Longsword", "weapon"),
    ("chain-mail", "Chain Mail", "armor"),
    ("scale-mail", "Scale Mail", "armor"),
    ("holy-symbol", "Holy Symbol", "gear"),
    ("priests-pack", "Priest's Pack", "gear"),
    ("explorers-pack", "Explorer's Pack", "gear"),
];

/// The fixture compendium with keys starting at 1.
pub fn srd_catalog() -> Result<Catalog, DomainError> {
    srd_catalog_with_offset(0)
}

/// The fixture compendium with every internal key shifted by `offset`.
pub fn srd_catalog_with_offset(offset: u64) -> Result<Catalog, DomainError> {
    let mut b = Catalog::builder().with_key_offset(offset);

    for (slug, name, ability) in SKILLS {
        b.add(Skill::new(sl(slug)?, name, ability))?;
    }
    for (slug, name, category) in PROFICIENCY_TYPES {
        b.add(ProficiencyType::new(sl(slug)?, name, category))?;
    }
    for (slug, name, exotic) in LANGUAGES {
        let mut language = Language::new(sl(slug)?, name);
        language.is_exotic = exotic;
        b.add(language)?;
    }
    for (slug, name, item_type) in ITEMS {
        b.add(Item::new(sl(slug)?, name, item_type))?;
    }
    b.add(Monster::new(sl("wolf")?, "Wolf", "1/4"))?;
    b.add(Condition::new(sl("poisoned")?, "Poisoned"))?;
    b.add(Condition::new(sl("exhaustion")?, "Exhaustion"))?;

    add_races(&mut b)?;
    add_backgrounds(&mut b)?;
    add_classes(&mut b)?;
    add_spells(&mut b)?;
    add_feats(&mut b)?;
    add_optional_features(&mut b)?;

    b.build()
}

fn add_races(b: &mut CatalogBuilder) -> Result<(), DomainError> {
    let human = b.add(Race::new(sl("phb:human")?, "Human"))?;
    b.attach(
        human,
        Choice::new("ability-scores", ChoiceType::AbilityScore)
            .quantity(2)
            .different()
            .value(1),
    )?
    .attach(human, language("common")?)?
    .attach(human, Choice::new("languages", ChoiceType::Language).quantity(1))?;

    let dwarf = b.add(
        Race::new(sl("phb:dwarf")?, "Dwarf")
            .requiring_subrace()
            .with_speed(25),
    )?;
    b.attach(dwarf, Modifier::ability_score(Ability::Con, 2))?
        .attach(dwarf, language("common")?)?
        .attach(dwarf, language("dwarvish")?)?
        .attach(dwarf, Trait::new("Darkvision", "You can see in dim light within 60 feet."))?
        .attach(
            dwarf,
            Modifier::new(ModifierCategory::DamageResistance, 0).when("against poison"),
        )?;

    let hill = b.add(
        Race::new(sl("phb:hill-dwarf")?, "Hill Dwarf")
            .subrace_of(sl("phb:dwarf")?)
            .with_speed(25),
    )?;
    b.attach(hill, Modifier::ability_score(Ability::Wis, 1))?
        .attach(hill, Modifier::new(ModifierCategory::HitPointsPerLevel, 1))?
        .attach(hill, Trait::new("Dwarven Toughness", "Your hit point maximum increases by 1 per level."))?;

    let elf = b.add(Race::new(sl("phb:elf")?, "Elf").requiring_subrace())?;
    b.attach(elf, Modifier::ability_score(Ability::Dex, 2))?
        .attach(elf, ProficiencyGrant::fixed(skill("perception")?))?
        .attach(elf, language("common")?)?
        .attach(elf, language("elvish")?)?
        .attach(elf, Trait::new("Fey Ancestry", "Advantage on saves against being charmed."))?;

    let high_elf = b.add(Race::new(sl("phb:high-elf")?, "High Elf").subrace_of(sl("phb:elf")?))?;
    b.attach(high_elf, Modifier::ability_score(Ability::Int, 1))?
        .attach(high_elf, spell_choice("cantrip", "wizard", 1)?)?
        .attach(high_elf, Choice::new("extra-language", ChoiceType::Language).quantity(1))?;

    Ok(())
}

fn add_backgrounds(b: &mut CatalogBuilder) -> Result<(), DomainError> {
    let acolyte = b.add(Background::new(sl("phb:acolyte")?, "Acolyte"))?;
    b.attach(acolyte, ProficiencyGrant::fixed(skill("insight")?))?
        .attach(acolyte, ProficiencyGrant::fixed(skill("religion")?))?
        .attach(acolyte, Choice::new("languages", ChoiceType::Language).quantity(2))?
        .attach(acolyte, Trait::new("Shelter of the Faithful", "Your temple offers you aid."))?;

    let soldier = b.add(Background::new(sl("phb:soldier")?, "Soldier"))?;
    b.attach(soldier, ProficiencyGrant::fixed(skill("athletics")?))?
        .attach(soldier, ProficiencyGrant::fixed(skill("intimidation")?))?
        .attach(
            soldier,
            ProficiencyGrant::fixed(ProficiencySubject::Tool(sl("vehicles-land")?)),
        )?
        .attach(soldier, Trait::new("Military Rank", "Soldiers loyal to your former unit defer to you."))?;

    Ok(())
}

fn add_classes(b: &mut CatalogBuilder) -> Result<(), DomainError> {
    // Cleric
    let cleric = b.add(
        Class::new(sl("phb:cleric")?, "Cleric", 8)
            .with_spellcasting(Ability::Wis, CasterType::Full, PreparationMethod::Prepared)
            .with_subclass_level(1),
    )?;
    b.attach_all(
        cleric,
        [
            ProficiencyGrant::saving_throw(Ability::Wis),
            ProficiencyGrant::saving_throw(Ability::Cha),
            ProficiencyGrant::fixed(armor("light-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(armor("medium-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(armor("shields")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("simple-weapons")?),
        ],
    )?
    .attach_all(
        cleric,
        skill_options("skills", 2, &["history", "insight", "medicine", "persuasion", "religion"])?,
    )?
    .attach(
        cleric,
        Choice::new("cantrips", ChoiceType::Spell)
            .quantity(3)
            .filter(spell_filter("cleric", Some(true), None)?),
    )?
    .attach_all(
        cleric,
        choice_options("weapon", ChoiceType::Equipment, 1, &["mace", "warhammer"])?,
    )?
    .attach_all(
        cleric,
        choice_options("pack", ChoiceType::Equipment, 1, &["priests-pack", "explorers-pack"])?,
    )?
    .attach(cleric, Trait::new("Spellcasting", "You cast cleric spells using Wisdom."))?
    .attach(
        cleric,
        Trait::new("Channel Divinity", "Channel divine energy.")
            .at_level(2)
            .resetting(ResetTiming::ShortRest)
            .scaled_by("channel-divinity-uses"),
    )?
    .attach(
        cleric,
        DataTable::progression(
            "channel-divinity-uses",
            vec![
                DataTableEntry::at_level(2, "1"),
                DataTableEntry::at_level(6, "2"),
                DataTableEntry::at_level(18, "3"),
            ],
        ),
    )?
    .attach(cleric, Prerequisite::ability(1, Ability::Wis, 13))?;
    full_caster_rows(
        b,
        "phb:cleric",
        |level| match level {
            1..=3 => 3,
            4..=9 => 4,
            _ => 5,
        },
        None,
    )?;

    let life = b.add(Class::subclass(
        sl("phb:life-domain")?,
        "Life Domain",
        sl("phb:cleric")?,
        "Divine Domain",
    ))?;
    b.attach(life, ProficiencyGrant::fixed(armor("heavy-armor")?))?
        .attach(life, SpellGrant::fixed(sl("bless")?))?
        .attach(life, SpellGrant::fixed(sl("cure-wounds")?))?
        .attach(life, Trait::new("Disciple of Life", "Healing spells restore extra hit points."))?;

    // Wizard
    let wizard = b.add(
        Class::new(sl("phb:wizard")?, "Wizard", 6)
            .with_spellcasting(Ability::Int, CasterType::Full, PreparationMethod::Spellbook)
            .with_subclass_level(2),
    )?;
    b.attach_all(
        wizard,
        [
            ProficiencyGrant::saving_throw(Ability::Int),
            ProficiencyGrant::saving_throw(Ability::Wis),
            ProficiencyGrant::fixed(weapon("simple-weapons")?),
        ],
    )?
    .attach_all(
        wizard,
        skill_options(
            "skills",
            2,
            &["arcana", "history", "insight", "investigation", "medicine", "religion"],
        )?,
    )?
    .attach(
        wizard,
        Choice::new("cantrips", ChoiceType::Spell)
            .quantity(3)
            .filter(spell_filter("wizard", Some(true), None)?),
    )?
    .attach(
        wizard,
        Choice::new("spellbook", ChoiceType::Spell)
            .quantity(6)
            .filter(spell_filter("wizard", Some(false), Some(1))?),
    )?
    .attach(
        wizard,
        Trait::new("Arcane Recovery", "Recover spell slots on a short rest.")
            .resetting(ResetTiming::LongRest),
    )?
    .attach(wizard, Prerequisite::ability(1, Ability::Int, 13))?;
    full_caster_rows(
        b,
        "phb:wizard",
        |level| match level {
            1..=3 => 3,
            4..=9 => 4,
            _ => 5,
        },
        None,
    )?;

    // Paladin
    let paladin = b.add(
        Class::new(sl("phb:paladin")?, "Paladin", 10)
            .with_spellcasting(Ability::Cha, CasterType::Half, PreparationMethod::Prepared)
            .with_subclass_level(3),
    )?;
    b.attach_all(
        paladin,
        [
            ProficiencyGrant::saving_throw(Ability::Wis),
            ProficiencyGrant::saving_throw(Ability::Cha),
            ProficiencyGrant::fixed(armor("light-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(armor("medium-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(armor("heavy-armor")?),
            ProficiencyGrant::fixed(armor("shields")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("simple-weapons")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("martial-weapons")?).on_multiclass(),
        ],
    )?
    .attach_all(
        paladin,
        skill_options(
            "skills",
            2,
            &["athletics", "insight", "intimidation", "medicine", "persuasion", "religion"],
        )?,
    )?
    .attach(
        paladin,
        Trait::new("Lay on Hands", "A pool of healing power.")
            .resetting(ResetTiming::LongRest)
            .scaled_by("lay-on-hands-pool"),
    )?
    .attach(
        paladin,
        DataTable::progression(
            "lay-on-hands-pool",
            (1..=20u8)
                .map(|level| DataTableEntry::at_level(level, (u32::from(level) * 5).to_string()))
                .collect(),
        ),
    )?
    .attach(paladin, Prerequisite::ability(1, Ability::Str, 13))?
    .attach(paladin, Prerequisite::ability(1, Ability::Cha, 13))?;
    for level in 1..=20u8 {
        b.progression(sl("phb:paladin")?, ProgressionRow::new(level, 0, half_caster_slots(level))?);
    }

    // Sorcerer
    let sorcerer = b.add(
        Class::new(sl("phb:sorcerer")?, "Sorcerer", 6)
            .with_spellcasting(Ability::Cha, CasterType::Full, PreparationMethod::Known)
            .with_subclass_level(1),
    )?;
    b.attach_all(
        sorcerer,
        [
            ProficiencyGrant::saving_throw(Ability::Con),
            ProficiencyGrant::saving_throw(Ability::Cha),
            ProficiencyGrant::fixed(weapon("simple-weapons")?),
        ],
    )?
    .attach_all(
        sorcerer,
        skill_options(
            "skills",
            2,
            &["arcana", "deception", "insight", "intimidation", "persuasion", "religion"],
        )?,
    )?
    .attach_all(
        sorcerer,
        [
            EntityCounter::new("Sorcery Points", 2, UsesLimit::Limited(2), ResetTiming::LongRest),
            EntityCounter::new("Sorcery Points", 3, UsesLimit::Limited(3), ResetTiming::LongRest),
            EntityCounter::new("Sorcery Points", 4, UsesLimit::Limited(4), ResetTiming::LongRest),
            EntityCounter::new("Sorcery Points", 5, UsesLimit::Limited(5), ResetTiming::LongRest),
        ],
    )?
    .attach(sorcerer, Prerequisite::ability(1, Ability::Cha, 13))?;
    full_caster_rows(
        b,
        "phb:sorcerer",
        |level| match level {
            1..=3 => 4,
            4..=9 => 5,
            _ => 6,
        },
        Some(sorcerer_spells_known),
    )?;

    // Warlock
    let warlock = b.add(
        Class::new(sl("phb:warlock")?, "Warlock", 8)
            .with_spellcasting(Ability::Cha, CasterType::Pact, PreparationMethod::Known)
            .with_subclass_level(1),
    )?;
    b.attach_all(
        warlock,
        [
            ProficiencyGrant::saving_throw(Ability::Wis),
            ProficiencyGrant::saving_throw(Ability::Cha),
            ProficiencyGrant::fixed(armor("light-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("simple-weapons")?).on_multiclass(),
        ],
    )?
    .attach(
        warlock,
        Choice::new("invocations", ChoiceType::OptionalFeature)
            .quantity(2)
            .filter(feature_filter("eldritch-invocation"))
            .at_level(2),
    )?
    .attach(warlock, Prerequisite::ability(1, Ability::Cha, 13))?;
    for level in 1..=20u8 {
        let cantrips = match level {
            1..=3 => 2,
            4..=9 => 3,
            _ => 4,
        };
        let known = match level {
            1..=9 => level + 1,
            10 => 10,
            11 | 12 => 11,
            13 | 14 => 12,
            15 | 16 => 13,
            17 | 18 => 14,
            _ => 15,
        };
        b.progression(
            sl("phb:warlock")?,
            ProgressionRow::new(level, cantrips, &pact_slots(level))?.with_spells_known(known),
        );
    }

    // Fighter
    let fighter = b.add(Class::new(sl("phb:fighter")?, "Fighter", 10).with_subclass_level(3))?;
    b.attach_all(
        fighter,
        [
            ProficiencyGrant::saving_throw(Ability::Str),
            ProficiencyGrant::saving_throw(Ability::Con),
            ProficiencyGrant::fixed(armor("light-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(armor("medium-armor")?).on_multiclass(),
            ProficiencyGrant::fixed(armor("heavy-armor")?),
            ProficiencyGrant::fixed(armor("shields")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("simple-weapons")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("martial-weapons")?).on_multiclass(),
        ],
    )?
    .attach_all(
        fighter,
        skill_options(
            "skills",
            2,
            &[
                "acrobatics",
                "animal-handling",
                "athletics",
                "history",
                "insight",
                "intimidation",
                "perception",
                "survival",
            ],
        )?,
    )?
    .attach(
        fighter,
        Choice::new("fighting-style", ChoiceType::OptionalFeature)
            .quantity(1)
            .filter(feature_filter("fighting-style")),
    )?
    .attach_all(
        fighter,
        [
            EntityCounter::new("Second Wind", 1, UsesLimit::Limited(1), ResetTiming::ShortRest),
            EntityCounter::new("Action Surge", 2, UsesLimit::Limited(1), ResetTiming::ShortRest),
            EntityCounter::new("Action Surge", 17, UsesLimit::Limited(2), ResetTiming::ShortRest),
        ],
    )?
    .attach(fighter, Prerequisite::ability(1, Ability::Str, 13))?
    .attach(fighter, Prerequisite::ability(2, Ability::Dex, 13))?;

    let eldritch_knight = b.add(
        Class::subclass(
            sl("phb:eldritch-knight")?,
            "Eldritch Knight",
            sl("phb:fighter")?,
            "Martial Archetype",
        )
        .with_spellcasting(Ability::Int, CasterType::Third, PreparationMethod::Known),
    )?;
    b.attach(
        eldritch_knight,
        Choice::new("cantrips", ChoiceType::Spell)
            .quantity(2)
            .filter(spell_filter("wizard", Some(true), None)?)
            .at_level(3),
    )?
    .attach(
        eldritch_knight,
        Trait::new("Weapon Bond", "You cannot be disarmed of a bonded weapon.").at_level(3),
    )?;
    for level in 1..=20u8 {
        let cantrips = match level {
            1 | 2 => 0,
            3..=9 => 2,
            _ => 3,
        };
        let known = match level {
            1 | 2 => 0,
            3 => 3,
            4..=6 => 4,
            7 => 5,
            8 | 9 => 6,
            10 => 7,
            11 | 12 => 8,
            13 => 9,
            14 | 15 => 10,
            16..=18 => 11,
            19 => 12,
            _ => 13,
        };
        b.progression(
            sl("phb:eldritch-knight")?,
            ProgressionRow::new(level, cantrips, third_caster_slots(level))?.with_spells_known(known),
        );
    }

    // Barbarian
    let barbarian = b.add(Class::new(sl("phb:barbarian")?, "Barbarian", 12).with_subclass_level(3))?;
    b.attach_all(
        barbarian,
        [
            ProficiencyGrant::saving_throw(Ability::Str),
            ProficiencyGrant::saving_throw(Ability::Con),
            ProficiencyGrant::fixed(armor("light-armor")?),
            ProficiencyGrant::fixed(armor("medium-armor")?),
            ProficiencyGrant::fixed(armor("shields")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("simple-weapons")?).on_multiclass(),
            ProficiencyGrant::fixed(weapon("martial-weapons")?).on_multiclass(),
        ],
    )?
    .attach_all(
        barbarian,
        skill_options(
            "skills",
            2,
            &["animal-handling", "athletics", "intimidation", "nature", "perception", "survival"],
        )?,
    )?
    .attach(barbarian, Trait::new("Rage", "Enter a rage as a bonus action."))?
    .attach_all(
        barbarian,
        [
            EntityCounter::new("Rage", 1, UsesLimit::Limited(2), ResetTiming::LongRest),
            EntityCounter::new("Rage", 3, UsesLimit::Limited(3), ResetTiming::LongRest),
            EntityCounter::new("Rage", 6, UsesLimit::Limited(4), ResetTiming::LongRest),
            EntityCounter::new("Rage", 12, UsesLimit::Limited(5), ResetTiming::LongRest),
            EntityCounter::new("Rage", 17, UsesLimit::Limited(6), ResetTiming::LongRest),
            EntityCounter::new("Rage", 20, UsesLimit::Unlimited, ResetTiming::LongRest),
        ],
    )?
    .attach(barbarian, Modifier::new(ModifierCategory::Speed, 10).at_level(5))?
    .attach(barbarian, Prerequisite::ability(1, Ability::Str, 13))?;

    Ok(())
}

fn add_spells(b: &mut CatalogBuilder) -> Result<(), DomainError> {
    for (slug, name, level, school, lists) in SPELLS {
        b.add(Spell::new(sl(slug)?, name, level, school))?;
        for class in lists {
            b.class_spell(sl(class)?, sl(slug)?);
        }
    }
    Ok(())
}

fn add_feats(b: &mut CatalogBuilder) -> Result<(), DomainError> {
    let grappler = b.add(Feat::new(sl("phb:grappler")?, "Grappler"))?;
    b.attach(grappler, Prerequisite::ability(1, Ability::Str, 13))?;

    let war_caster = b.add(Feat::new(sl("phb:war-caster")?, "War Caster"))?;
    b.attach(
        war_caster,
        Prerequisite {
            group_id: 1,
            target: PrerequisiteTarget::Spellcasting,
            description: None,
        },
    )?;

    let alert = b.add(Feat::new(sl("phb:alert")?, "Alert"))?;
    b.attach(alert, Modifier::new(ModifierCategory::Initiative, 5))?;

    let tough = b.add(Feat::new(sl("phb:tough")?, "Tough"))?;
    b.attach(tough, Modifier::new(ModifierCategory::HitPointsPerLevel, 2))?;

    let resilient = b.add(Feat::new(sl("phb:resilient")?, "Resilient"))?;
    b.attach(
        resilient,
        Choice::new("ability", ChoiceType::AbilityScore).quantity(1).value(1),
    )?;

    let skilled = b.add(Feat::new(sl("phb:skilled")?, "Skilled"))?;
    b.attach(
        skilled,
        Choice::new("skills", ChoiceType::Proficiency)
            .quantity(3)
            .filter(ChoiceFilter {
                proficiency_category: Some(ProficiencyCategory::Skill),
                ..ChoiceFilter::default()
            }),
    )?;

    let elven_accuracy = b.add(Feat::new(sl("xge:elven-accuracy")?, "Elven Accuracy"))?;
    b.attach(elven_accuracy, Prerequisite::entity(1, EntityKind::Race, sl("elf")?))?
        .attach_all(
            elven_accuracy,
            choice_options("ability", ChoiceType::AbilityScore, 1, &["dex", "int", "wis", "cha"])?,
        )?;

    let heavy_armor_master = b.add(Feat::new(sl("phb:heavy-armor-master")?, "Heavy Armor Master"))?;
    b.attach(
        heavy_armor_master,
        Prerequisite::entity(1, EntityKind::ProficiencyType, sl("heavy-armor")?),
    )?
    .attach(heavy_armor_master, Modifier::ability_score(Ability::Str, 1))?;

    let ritual_caster = b.add(Feat::new(sl("phb:ritual-caster")?, "Ritual Caster"))?;
    b.attach(ritual_caster, Prerequisite::ability(1, Ability::Int, 13))?
        .attach(ritual_caster, Prerequisite::ability(2, Ability::Wis, 13))?;

    let expert = b.add(Feat::new(sl("tce:skill-expert")?, "Skill Expert"))?;
    b.attach(expert, Choice::new("expertise", ChoiceType::Expertise).quantity(1))?
        .attach(expert, prerequisite_level(1, 4))?;

    let fey_touched = b.add(Feat::new(sl("tce:fey-touched")?, "Fey Touched"))?;
    b.attach(
        fey_touched,
        SpellGrant::fixed(sl("misty-step")?).limited(UsesLimit::Limited(1), ResetTiming::LongRest),
    )?
    .attach(
        fey_touched,
        SpellGrant {
            spell: None,
            max_level: Some(1),
            school: Some("enchantment".to_string()),
            class_list: None,
            cantrip: false,
            charges_min: None,
            charges_max: None,
            level: None,
            choice_group: Some("fey-spell".to_string()),
            quantity: Some(1),
            uses: Some((UsesLimit::Limited(1), ResetTiming::LongRest)),
        },
    )?;

    let chosen = b.add(Feat::new(sl("homebrew:chosen-of-the-gods")?, "Chosen of the Gods"))?;
    b.attach(chosen, Prerequisite::text(1, "Must be favored by a deity"))?;

    Ok(())
}

fn add_optional_features(b: &mut CatalogBuilder) -> Result<(), DomainError> {
    let agonizing = b.add(OptionalFeature::new(
        sl("phb:agonizing-blast")?,
        "Agonizing Blast",
        "eldritch-invocation",
    ))?;
    b.attach(agonizing, Prerequisite::entity(1, EntityKind::Spell, sl("eldritch-blast")?))?;

    b.add(OptionalFeature::new(
        sl("phb:devils-sight")?,
        "Devil's Sight",
        "eldritch-invocation",
    ))?;

    let mask = b.add(OptionalFeature::new(
        sl("phb:mask-of-many-faces")?,
        "Mask of Many Faces",
        "eldritch-invocation",
    ))?;
    b.attach(mask, SpellGrant::fixed(sl("disguise-self")?))?;

    b.add(OptionalFeature::new(sl("phb:archery")?, "Archery", "fighting-style"))?;
    let defense = b.add(OptionalFeature::new(sl("phb:defense")?, "Defense", "fighting-style"))?;
    b.attach(
        defense,
        Modifier::new(ModifierCategory::ArmorClass, 1).when("while wearing armor"),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compendium::CompendiumRepository;

    #[test]
    fn fixture_builds_and_reseeds() {
        let a = srd_catalog().unwrap();
        let b = srd_catalog_with_offset(10_000).unwrap();
        let cleric = Slug::new("cleric").unwrap();
        assert_eq!(a.class(&cleric).unwrap().slug, b.class(&cleric).unwrap().slug);
        assert_ne!(a.class(&cleric).unwrap().key, b.class(&cleric).unwrap().key);
    }

    #[test]
    fn pact_rows_have_one_column() {
        assert_eq!(pact_slots(1), [1, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(pact_slots(5), [0, 0, 2, 0, 0, 0, 0, 0, 0]);
        assert_eq!(pact_slots(11), [0, 0, 0, 0, 3, 0, 0, 0, 0]);
    }
}
