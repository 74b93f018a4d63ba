//! Wire protocol for host/embed messages.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use framelink_core::{CallId, HANDSHAKE_ID, SessionContext};

/// Message posted across the channel.
///
/// Internally tagged so these messages coexist with unrelated kinds sharing
/// the same transport; a payload whose `type` is neither variant fails to
/// decode and is ignored by receivers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// Host-to-embed method invocation.
    Call(Call),
    /// Embed-to-host response, or the unsolicited handshake.
    Callback(Callback),
}

/// One outbound invocation of a remote method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Correlation id, generated once per call and never reused while the
    /// call is outstanding.
    pub rpcid: CallId,
    /// Name of the remote operation.
    pub method: String,
    /// Ordered, schema-free arguments.
    #[serde(default)]
    pub args: Vec<Value>,
}

/// The remote peer's response to a [`Call`], or an unsolicited handshake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Callback {
    /// Correlation id of the call being answered, or [`HANDSHAKE_ID`].
    pub rpcid: CallId,
    /// Present when the call failed on the remote side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Full replacement session context, when the peer includes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SessionContext>,
}

impl Call {
    /// Create a call envelope.
    #[must_use]
    pub fn new(rpcid: CallId, method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            rpcid,
            method: method.into(),
            args,
        }
    }
}

impl Callback {
    /// Successful callback for `rpcid`, optionally carrying context.
    #[must_use]
    pub fn success(rpcid: CallId, context: Option<SessionContext>) -> Self {
        Self {
            rpcid,
            error: None,
            context,
        }
    }

    /// Failed callback for `rpcid`.
    #[must_use]
    pub fn failure(
        rpcid: CallId,
        error: impl Into<String>,
        context: Option<SessionContext>,
    ) -> Self {
        Self {
            rpcid,
            error: Some(error.into()),
            context,
        }
    }

    /// Handshake callback carrying the initial context.
    #[must_use]
    pub fn handshake(context: SessionContext) -> Self {
        Self {
            rpcid: HANDSHAKE_ID,
            error: None,
            context: Some(context),
        }
    }

    /// Whether this is the reserved handshake callback.
    #[must_use]
    pub fn is_handshake(&self) -> bool {
        self.rpcid == HANDSHAKE_ID
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn test_call_serialization() {
        let rpcid = Uuid::new_v4();
        let envelope = Envelope::Call(Call::new(rpcid, "roster.refresh", vec![json!(1), json!("a")]));
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""type":"call""#));
        assert!(json.contains(&rpcid.to_string()));

        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        if let Envelope::Call(call) = parsed {
            assert_eq!(call.rpcid, rpcid);
            assert_eq!(call.method, "roster.refresh");
            assert_eq!(call.args, vec![json!(1), json!("a")]);
        } else {
            panic!("Wrong envelope type");
        }
    }

    #[test]
    fn test_callback_omits_absent_fields() {
        let json = serde_json::to_string(&Envelope::Callback(Callback::success(
            Uuid::new_v4(),
            None,
        )))
        .unwrap();
        assert!(json.contains(r#""type":"callback""#));
        assert!(!json.contains("error"));
        assert!(!json.contains("context"));
    }

    #[test]
    fn test_args_default_when_missing() {
        let rpcid = Uuid::new_v4();
        let json = format!(r#"{{"type":"call","rpcid":"{rpcid}","method":"ping"}}"#);
        let parsed: Envelope = serde_json::from_str(&json).unwrap();
        if let Envelope::Call(call) = parsed {
            assert!(call.args.is_empty());
        } else {
            panic!("Wrong envelope type");
        }
    }

    #[test]
    fn test_handshake_recognition() {
        assert!(Callback::handshake(SessionContext::default()).is_handshake());
        assert!(!Callback::success(Uuid::new_v4(), None).is_handshake());
    }

    #[test]
    fn test_foreign_message_fails_to_decode() {
        let parsed: Result<Envelope, _> =
            serde_json::from_str(r#"{"type":"telemetry","payload":42}"#);
        assert!(parsed.is_err());
    }
}
