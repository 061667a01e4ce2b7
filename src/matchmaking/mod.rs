//! Daily group-based matchmaking: partner requests are bucketed into
//! age x requested-duration groups and paired so that both individual
//! preferences and global group proportions are preserved.

pub mod groups;
pub mod links;
pub mod matchmaker;
pub mod partner_choice;
pub mod robustness;

pub use groups::GroupHandler;
pub use links::LinkHandler;
pub use matchmaker::{Matchmaker, RelationRequest};
pub use partner_choice::{HistoricWeighting, PartnerChoiceMatrix, PartnerChoiceParameters};
pub use robustness::RobustnessCheck;
