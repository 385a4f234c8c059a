//! Data model shared by the gateway, the API client and the controllers.
//!
//! Wire records coming from the sales backend are deserialized with every
//! field optional and normalized into the canonical types here, so shape
//! drift on the backend never reaches the controllers.

pub mod audio;
pub mod auth;
pub mod de;
pub mod enums;
pub mod lead;
pub mod message;

pub use audio::{AudioClip, AudioDecodeError};
pub use auth::{
    LoginRequest, LoginResponse, Organization, RegisterRequest, UsageStats, User, UserUpdate,
};
pub use enums::{LeadStatus, MessageRole, ParseEnumError, UserRole};
pub use lead::{CreatedLead, LeadList, LeadRecord, LeadStats, NewLead, SessionSummary};
pub use message::{
    ChatReply, ChatRequest, HistoryMessage, HistoryResponse, Message, MessageMetadata, SpeechData,
    WELCOME_MESSAGE_ID,
};
