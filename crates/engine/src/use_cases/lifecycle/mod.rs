//! Character lifecycle use cases.
//!
//! Creation, level-ups, subclass picks and deletion. Each one that changes
//! the build re-resolves the character before it is stored.

mod add_level;
mod create;
mod delete;
mod error;
mod subclass;

use std::sync::Arc;

pub use add_level::{AddClassLevel, AddClassLevelInput, HpChoice, LevelUp};
pub use create::{CreateCharacter, CreateCharacterInput};
pub use delete::DeleteCharacter;
pub use error::LifecycleError;
pub use subclass::SetSubclass;

/// Container for lifecycle use cases.
pub struct LifecycleUseCases {
    pub create: Arc<CreateCharacter>,
    pub add_level: Arc<AddClassLevel>,
    pub set_subclass: Arc<SetSubclass>,
    pub delete: Arc<DeleteCharacter>,
}

impl LifecycleUseCases {
    pub fn new(
        create: Arc<CreateCharacter>,
        add_level: Arc<AddClassLevel>,
        set_subclass: Arc<SetSubclass>,
        delete: Arc<DeleteCharacter>,
    ) -> Self {
        Self {
            create,
            add_level,
            set_subclass,
            delete,
        }
    }
}
