//! Business-result envelope
//!
//! Every business endpoint answers with `{ "code": .., "data": .., "msg": .. }`.
//! Codes `200` and `0` mean success; anything else is a failure whose `data`
//! must not be used. Some endpoints name the message `message` instead of
//! `msg`; either or both may be present.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope code the server uses for an expired or missing login.
pub const UNAUTHORIZED_CODE: i64 = 401;

/// Wire-level response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: i64,

    #[serde(default)]
    pub data: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Envelope {
    /// Parses `body`, returning `None` when it is not an envelope.
    pub fn parse(body: &[u8]) -> Option<Self> {
        serde_json::from_slice(body).ok()
    }

    pub fn is_success(&self) -> bool {
        self.code == 200 || self.code == 0
    }

    /// The first non-empty of `msg` and `message`, or `""`.
    pub fn message(&self) -> &str {
        [self.msg.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .find(|m| !m.trim().is_empty())
            .unwrap_or_default()
    }

    /// Decodes `data` into the caller's type.
    pub fn into_data<T: DeserializeOwned>(self) -> serde_json::Result<T> {
        serde_json::from_value(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_codes() {
        for code in [0, 200] {
            let env = Envelope {
                code,
                data: Value::Null,
                msg: None,
                message: None,
            };
            assert!(env.is_success(), "code {code} should be success");
        }
        for code in [401, 500, 1] {
            let env = Envelope {
                code,
                data: Value::Null,
                msg: None,
                message: None,
            };
            assert!(!env.is_success(), "code {code} should be failure");
        }
    }

    #[test]
    fn test_parse_full_envelope() {
        let env = Envelope::parse(br#"{"code":200,"data":{"id":5},"msg":"ok","timestamp":1}"#)
            .unwrap();
        assert_eq!(env.code, 200);
        assert_eq!(env.data, json!({"id": 5}));
        assert_eq!(env.message(), "ok");
    }

    #[test]
    fn test_parse_accepts_message_alias_and_missing_data() {
        let env = Envelope::parse(br#"{"code":500,"message":"boom"}"#).unwrap();
        assert_eq!(env.data, Value::Null);
        assert_eq!(env.message(), "boom");
    }

    #[test]
    fn test_parse_accepts_both_message_keys() {
        let env = Envelope::parse(br#"{"code":200,"data":5,"msg":"ok","message":"ok"}"#).unwrap();
        assert!(env.is_success());
        assert_eq!(env.data, json!(5));
        assert_eq!(env.message(), "ok");
    }

    #[test]
    fn test_message_prefers_first_non_empty_key() {
        let env = Envelope::parse(br#"{"code":500,"msg":"","message":"Title too long"}"#).unwrap();
        assert_eq!(env.message(), "Title too long");

        let env = Envelope::parse(br#"{"code":500,"msg":"Bad title","message":"other"}"#).unwrap();
        assert_eq!(env.message(), "Bad title");
    }

    #[test]
    fn test_parse_rejects_non_envelopes() {
        assert!(Envelope::parse(b"").is_none());
        assert!(Envelope::parse(b"<html>Bad Gateway</html>").is_none());
        assert!(Envelope::parse(br#"{"data":1}"#).is_none());
    }

    #[test]
    fn test_null_data_decodes_into_unit_and_option() {
        let env = Envelope::parse(br#"{"code":0,"data":null}"#).unwrap();
        let unit: serde_json::Result<()> = env.clone().into_data();
        assert!(unit.is_ok());
        let none: Option<i64> = env.into_data().unwrap();
        assert_eq!(none, None);
    }
}
