//! Anchor token codec.
//!
//! Two token formats exist:
//!
//! - **id list**: `intro,setup-steps`. Used whenever every descriptor has a
//!   plain element id. Short, readable and immune to structural drift.
//! - **payload**: base64 of a JSON array of descriptors with minified keys.
//!   Used as soon as one element lacks a usable id.
//!
//! Decoding never fails outright: anything that is not a valid payload is read
//! as an id list, and an unusable token yields an empty list.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{AnchorDescriptor, AnchorTag};

/// Tag value written for id-only descriptors.
const ID_ONLY_TAG: &str = "*";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("token payload is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("token payload is not a descriptor list: {0}")]
    Json(#[from] serde_json::Error),
    #[error("descriptor {0} has an empty tag")]
    EmptyTag(usize),
    #[error("descriptor {0} is id-only but carries no id")]
    MissingElementId(usize),
}

#[derive(Debug, Serialize, Deserialize)]
struct MinifiedDescriptor {
    #[serde(rename = "t")]
    tag: String,
    #[serde(rename = "i")]
    index: usize,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<String>,
    #[serde(rename = "s", default)]
    snippet: String,
    #[serde(rename = "h")]
    hash: u32,
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    element_id: Option<String>,
}

impl From<&AnchorDescriptor> for MinifiedDescriptor {
    fn from(descriptor: &AnchorDescriptor) -> Self {
        Self {
            tag: match &descriptor.tag {
                AnchorTag::Tag(tag) => tag.clone(),
                AnchorTag::IdOnly => ID_ONLY_TAG.to_string(),
            },
            index: descriptor.index,
            parent_id: descriptor.parent_id.clone(),
            snippet: descriptor.text_snippet.clone(),
            hash: descriptor.text_hash,
            element_id: descriptor.element_id.clone(),
        }
    }
}

impl MinifiedDescriptor {
    fn expand(self, position: usize) -> Result<AnchorDescriptor, TokenError> {
        let tag = match self.tag.as_str() {
            "" => return Err(TokenError::EmptyTag(position)),
            ID_ONLY_TAG if self.element_id.is_none() => {
                return Err(TokenError::MissingElementId(position));
            }
            ID_ONLY_TAG => AnchorTag::IdOnly,
            tag => AnchorTag::Tag(tag.to_ascii_lowercase()),
        };
        Ok(AnchorDescriptor {
            tag,
            index: self.index,
            parent_id: self.parent_id,
            text_snippet: self.snippet,
            text_hash: self.hash,
            element_id: self.element_id,
        })
    }
}

fn base64_alphabet() -> &'static Regex {
    static ALPHABET: OnceLock<Regex> = OnceLock::new();
    ALPHABET.get_or_init(|| Regex::new(r"^[A-Za-z0-9+/]+={0,2}$").expect("static regex is valid"))
}

fn is_list_separator(c: char) -> bool {
    c == ',' || c == '+' || c.is_whitespace()
}

/// An id can go into an id-list token only if it survives re-splitting.
fn is_plain_id(id: &str) -> bool {
    !id.is_empty() && !id.chars().any(is_list_separator)
}

/// Encode descriptors into a token.
pub fn serialize(descriptors: &[AnchorDescriptor]) -> String {
    if descriptors.is_empty() {
        return String::new();
    }

    let ids: Option<Vec<&str>> = descriptors
        .iter()
        .map(|d| d.element_id.as_deref().filter(|id| is_plain_id(id)))
        .collect();
    if let Some(ids) = ids {
        return ids.join(",");
    }

    let minified: Vec<MinifiedDescriptor> = descriptors.iter().map(Into::into).collect();
    match serde_json::to_vec(&minified) {
        Ok(json) => STANDARD.encode(json),
        Err(err) => {
            log::warn!("failed to encode anchor payload: {err}");
            String::new()
        }
    }
}

/// Decode a token produced by [`serialize`], or a hand-written id list.
pub fn deserialize(token: &str) -> Vec<AnchorDescriptor> {
    let token = token.trim();
    if token.is_empty() {
        return Vec::new();
    }

    if token.chars().any(char::is_whitespace) || !base64_alphabet().is_match(token) {
        return parse_id_list(token);
    }

    // A plain id can look like base64, so a failed payload decode is not an error.
    match decode_payload(token) {
        Ok(descriptors) => descriptors,
        Err(err) => {
            log::debug!("anchor token is not a payload ({err}); reading it as an id list");
            parse_id_list(token)
        }
    }
}

fn decode_payload(token: &str) -> Result<Vec<AnchorDescriptor>, TokenError> {
    let bytes = STANDARD.decode(token)?;
    let json = String::from_utf8(bytes)?;
    let minified: Vec<MinifiedDescriptor> = serde_json::from_str(&json)?;
    minified
        .into_iter()
        .enumerate()
        .map(|(position, descriptor)| descriptor.expand(position))
        .collect()
}

fn parse_id_list(token: &str) -> Vec<AnchorDescriptor> {
    token
        .split(is_list_separator)
        .filter(|id| !id.is_empty())
        .map(AnchorDescriptor::id_only)
        .collect()
}
