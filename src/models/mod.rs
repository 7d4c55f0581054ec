pub mod session;
pub mod topic;

pub use session::{DocumentResult, DocumentStatus, SelectedTopic, Session, SessionStage};
pub use topic::{ManifestTopic, TopicManifest, TopicRecord};
