//! Callback XML Records
//!
//! Typed views of the outer callback body, the decrypted message, and the
//! encrypted acknowledgement. Parsing fails closed on missing fields.

use quick_xml::escape::escape;
use serde::Deserialize;
use wecom_crypto::Envelope;

use super::error::CallbackError;

/// Outer body of a message callback.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackBody {
    #[serde(rename = "ToUserName", default)]
    pub to_user_name: Option<String>,
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
    #[serde(rename = "AgentID", default)]
    pub agent_id: Option<String>,
}

/// Decrypted message or event pushed by WeCom.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMessage {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<String>,
    #[serde(rename = "AgentID", default)]
    pub agent_id: Option<i64>,
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
}

/// What the relay does with a message is decided by its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind<'a> {
    Text(&'a str),
    Event(&'a str),
    Other(&'a str),
}

impl InboundMessage {
    pub fn kind(&self) -> MessageKind<'_> {
        match self.msg_type.as_str() {
            "text" => MessageKind::Text(self.content.as_deref().unwrap_or_default()),
            "event" => MessageKind::Event(self.event.as_deref().unwrap_or_default()),
            other => MessageKind::Other(other),
        }
    }
}

/// Parse the outer callback body and extract its `Encrypt` field.
pub fn parse_callback_body(xml: &str) -> Result<CallbackBody, CallbackError> {
    let body: CallbackBody = quick_xml::de::from_str(xml)
        .map_err(|e| CallbackError::MalformedXml(e.to_string()))?;
    if body.encrypt.trim().is_empty() {
        return Err(CallbackError::MalformedXml("empty Encrypt field".into()));
    }
    Ok(body)
}

/// Parse a decrypted message.
pub fn parse_message(xml: &str) -> Result<InboundMessage, CallbackError> {
    quick_xml::de::from_str(xml).map_err(|e| CallbackError::MalformedXml(e.to_string()))
}

/// Render the encrypted acknowledgement returned to WeCom.
pub fn render_reply(reply: &Envelope) -> String {
    format!(
        "<xml>\n\
         <Encrypt>{}</Encrypt>\n\
         <MsgSignature>{}</MsgSignature>\n\
         <TimeStamp>{}</TimeStamp>\n\
         <Nonce>{}</Nonce>\n\
         </xml>",
        cdata(&reply.ciphertext),
        cdata(&reply.signature),
        escape(reply.timestamp.as_str()),
        cdata(&reply.nonce),
    )
}

/// Wrap text in a CDATA section, splitting any embedded terminator.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}
