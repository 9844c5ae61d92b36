// Message Domain Model

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Form parameter value: a single scalar or an ordered list of values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// Values in emission order (a scalar yields exactly one)
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            ParamValue::Single(v) => std::slice::from_ref(v),
            ParamValue::Many(vs) => vs.as_slice(),
        };
        slice.iter().map(String::as_str)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Single(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Single(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::Many(values)
    }
}

/// Ordered post params (BTreeMap keeps serialization and encoding stable)
pub type PostParams = BTreeMap<String, ParamValue>;

/// Request headers, each name carrying one or more values
pub type Headers = BTreeMap<String, Vec<String>>;

/// Message Entity
///
/// One queued HTTP call. The serialized element uses the
/// `Name/Url/ReqMethod/PostParam/Headers` field layout of existing queue
/// producers. Only the element layout matches: those producers keep a whole
/// queue as one JSON array under a plain key, while each element here is one
/// entry of a native list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "Name", default)]
    pub name: String,

    #[serde(rename = "Url")]
    pub url: String,

    #[serde(rename = "ReqMethod")]
    pub method: String,

    #[serde(rename = "PostParam", default, deserialize_with = "null_as_default")]
    pub post_params: PostParams,

    #[serde(rename = "Headers", default, deserialize_with = "null_as_default")]
    pub headers: Headers,
}

impl Message {
    /// Create a message with no params and no headers
    pub fn new(name: impl Into<String>, url: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: method.into(),
            post_params: PostParams::new(),
            headers: Headers::new(),
        }
    }

    /// Add a form parameter (builder style)
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.post_params.insert(key.into(), value.into());
        self
    }

    /// Append a header value (builder style)
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }

    /// Upper-cased HTTP method
    pub fn normalized_method(&self) -> String {
        self.method.trim().to_ascii_uppercase()
    }

    /// Only POST and PUT carry the encoded params as a body
    pub fn carries_body(&self) -> bool {
        matches!(self.normalized_method().as_str(), "POST" | "PUT")
    }

    /// `application/x-www-form-urlencoded` encoding of `post_params`
    ///
    /// Keys are emitted in sorted order, list values as repeated keys.
    pub fn encoded_params(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.post_params {
            for v in value.values() {
                serializer.append_pair(key, v);
            }
        }
        serializer.finish()
    }

    /// Key under which the response body is recorded
    pub fn response_key(&self) -> ResponseKey {
        if self.name.is_empty() {
            format!("{}{}", self.url, self.method)
        } else {
            self.name.clone()
        }
    }

    /// Case-insensitive header presence check
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }
}

/// Response record key
pub type ResponseKey = String;

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
