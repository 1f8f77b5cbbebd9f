//! Backend reply envelope

use serde::Deserialize;

use crate::{Error, Result};

/// What the backend wants the front-end to do with a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyAction {
    /// Plain conversational turn
    None,
    /// A complete itinerary is attached
    PlanReady,
}

/// Opaque itinerary payload produced by the backend
///
/// Not `Clone`: the payload is moved into the hand-off exactly once.
#[derive(Debug, PartialEq, Eq)]
pub struct Itinerary(serde_json::Value);

impl Itinerary {
    #[must_use]
    pub const fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    #[must_use]
    pub fn into_value(self) -> serde_json::Value {
        self.0
    }
}

/// A parsed backend reply
#[derive(Debug, PartialEq, Eq)]
pub struct ReplyEnvelope {
    text: String,
    action: ReplyAction,
    plan: Option<Itinerary>,
}

/// Reply as the backend puts it on the wire
#[derive(Deserialize)]
struct WireReply {
    #[serde(alias = "text")]
    response: String,
    action: WireAction,
    #[serde(default)]
    plan: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireAction {
    #[serde(alias = "none")]
    Continue,
    PlanReady,
}

impl ReplyEnvelope {
    /// A conversational reply with no attached plan
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            action: ReplyAction::None,
            plan: None,
        }
    }

    /// A closing reply carrying a finished itinerary
    #[must_use]
    pub fn plan_ready(text: impl Into<String>, plan: Itinerary) -> Self {
        Self {
            text: text.into(),
            action: ReplyAction::PlanReady,
            plan: Some(plan),
        }
    }

    /// Parse a reply body
    ///
    /// # Errors
    ///
    /// Returns `Error::MalformedReply` if the body is not a valid envelope,
    /// the action is unknown, or a `plan_ready` reply has no plan object
    pub fn from_slice(body: &[u8]) -> Result<Self> {
        let wire: WireReply =
            serde_json::from_slice(body).map_err(|e| Error::MalformedReply(e.to_string()))?;

        match wire.action {
            WireAction::Continue => Ok(Self::reply(wire.response)),
            WireAction::PlanReady => match wire.plan {
                Some(plan @ serde_json::Value::Object(_)) => {
                    Ok(Self::plan_ready(wire.response, Itinerary::new(plan)))
                }
                _ => Err(Error::MalformedReply(
                    "plan_ready reply without a plan object".to_string(),
                )),
            },
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub const fn action(&self) -> ReplyAction {
        self.action
    }

    /// Split into the reply text and the plan, if any
    #[must_use]
    pub fn into_parts(self) -> (String, Option<Itinerary>) {
        (self.text, self.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_continue_reply() {
        let body = br#"{"action":"continue","response":"Where to?"}"#;
        let envelope = ReplyEnvelope::from_slice(body).unwrap();
        assert_eq!(envelope.action(), ReplyAction::None);
        assert_eq!(envelope.text(), "Where to?");
    }

    #[test]
    fn accepts_text_and_none_aliases() {
        let body = br#"{"action":"none","text":"Tell me more"}"#;
        let envelope = ReplyEnvelope::from_slice(body).unwrap();
        assert_eq!(envelope, ReplyEnvelope::reply("Tell me more"));
    }

    #[test]
    fn parses_plan_ready_with_plan() {
        let body = br#"{"action":"plan_ready","response":"Done!","plan":{"destination":"Goa","days":3}}"#;
        let envelope = ReplyEnvelope::from_slice(body).unwrap();
        assert_eq!(envelope.action(), ReplyAction::PlanReady);

        let (text, plan) = envelope.into_parts();
        assert_eq!(text, "Done!");
        assert_eq!(plan.unwrap().as_value()["destination"], "Goa");
    }

    #[test]
    fn rejects_plan_ready_without_plan() {
        let body = br#"{"action":"plan_ready","response":"Done!"}"#;
        assert!(matches!(
            ReplyEnvelope::from_slice(body),
            Err(Error::MalformedReply(_))
        ));

        let body = br#"{"action":"plan_ready","response":"Done!","plan":null}"#;
        assert!(ReplyEnvelope::from_slice(body).is_err());
    }

    #[test]
    fn rejects_unknown_action() {
        let body = br#"{"action":"error","response":"AI not configured."}"#;
        assert!(matches!(
            ReplyEnvelope::from_slice(body),
            Err(Error::MalformedReply(_))
        ));
    }

    #[test]
    fn rejects_non_json_body() {
        assert!(ReplyEnvelope::from_slice(b"<html>502</html>").is_err());
    }
}
