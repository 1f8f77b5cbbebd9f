//! Roam Chat - conversational front end for an AI itinerary planner
//!
//! This library provides the session layer between a user and the planning
//! backend:
//! - Turn-taking conversation with a single request in flight
//! - Voice input (microphone + STT) and voice output (TTS + speakers)
//! - Hand-off of the finished itinerary once the assistant has said its piece
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Interfaces                        │
//! │        Terminal REPL   │   Voice (mic / speakers)    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Session Runner                       │
//! │   Session  │  Voice Input  │  Voice Output          │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │               Planner Backend                        │
//! │   POST /api/chat  │  GET /health                     │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod client;
pub mod config;
pub mod conversation;
pub mod error;
pub mod itinerary;
pub mod session;
pub mod voice;

pub use client::{ConversationClient, Credentials, HttpConversationClient, StaticToken};
pub use config::Config;
pub use conversation::{Itinerary, Message, ReplyAction, ReplyEnvelope, Role, Transcript};
pub use error::{Error, Result};
pub use itinerary::ItinerarySummary;
pub use session::{
    Devices, EventSink, PlanHandoff, Session, SessionEvent, SessionHandle, SessionRunner,
    SessionState,
};
