//! Resolution use cases.
//!
//! Run the build resolver against a stored character and read derived views
//! of it.

mod eligible_feats;
mod error;
mod resolve;
mod sheet;

use std::sync::Arc;

pub use eligible_feats::{FeatEligibility, ListEligibleFeats};
pub use error::ResolutionError;
pub use resolve::ResolveCharacter;
pub use sheet::GetCharacterSheet;

/// Container for resolution use cases.
pub struct ResolutionUseCases {
    pub resolve: Arc<ResolveCharacter>,
    pub eligible_feats: Arc<ListEligibleFeats>,
    pub sheet: Arc<GetCharacterSheet>,
}

impl ResolutionUseCases {
    pub fn new(
        resolve: Arc<ResolveCharacter>,
        eligible_feats: Arc<ListEligibleFeats>,
        sheet: Arc<GetCharacterSheet>,
    ) -> Self {
        Self {
            resolve,
            eligible_feats,
            sheet,
        }
    }
}
