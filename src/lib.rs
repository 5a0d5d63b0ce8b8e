pub mod analytics;
pub mod compliance;
pub mod config;
pub mod database;
pub mod emotion;
pub mod errors;
pub mod logging;
pub mod seed;
pub mod server;
pub mod service;

// Re-export the main error types for convenience
pub use compliance::ValidationError;
pub use emotion::ClassifierError;
pub use errors::{VoiceupError, VoiceupResult};

// Re-export compliance evaluation
pub use compliance::{
    evaluate, evaluate_records, percentage_score, validate_transcript, ComplianceRule,
    ComplianceRules, ComplianceSummary, Message, MessageRecord, Sender,
};

// Re-export emotion classification
pub use emotion::{
    build_classifier, ClassifierBackendType, ClassifierConfig, EmotionClassifier, EmotionScore,
    EmotionSummary, HuggingFaceBackend, StaticBackend, TopEmotion,
};

// Re-export analytics modules
pub use analytics::{
    ComplianceAnalytics, EmotionAnalytics, EmotionTrendPoint, COMPLIANCE_THRESHOLD,
};

// Re-export database modules
pub use database::{
    AnalysisResult, AnalyzedConversation, Conversation, ConversationOverview, StoredMessage,
    VoiceupDatabase,
};

pub use config::{AppConfig, ConfigManager};
pub use logging::init_logging;
pub use seed::seed_database;
pub use service::{AnalysisService, ConversationAnalysis, ConversationDetail};
