pub mod cli;
pub mod completion;
pub mod config;
pub mod document;
pub mod domain_utils;
pub mod export;
pub mod fields;
pub mod logger;
pub mod matcher;
pub mod orchestrator;
pub mod rate_limit;
pub mod ref_path;
pub mod relationship;
pub mod resolver;
pub mod wiki_client;

pub use config::AppConfig;
pub use domain_utils::{normalize, NormalizedDomain};
pub use matcher::MatchTier;
pub use orchestrator::{Collaborators, CompanyTarget, ResolutionOrchestrator, ResolutionResult};
pub use relationship::{EntitySource, RelationKind, RelationshipEntity};
