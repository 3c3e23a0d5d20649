//! Wire codec
//!
//! A request is one ASCII message, either the literal `close` or three
//! comma-separated base64 fields: task name, confuse flag (`true`/`false`)
//! and a YAML task payload. A response is `FileName:<name>` or
//! `Compile failed`. There is no length prefix; framing is left to the
//! receiver.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::error::MalformedRequestError;

/// Literal that ends a session
pub const CLOSE_SENTINEL: &str = "close";

const FILE_NAME_PREFIX: &str = "FileName:";
const COMPILE_FAILED: &str = "Compile failed";

/// Field positions, used in decode errors
const FIELDS: [&str; 3] = ["task name", "confuse flag", "payload"];

/// Decoded request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireRequest {
    /// End the session
    Close,
    /// Ingest `yaml`, then build `task_name`
    Build {
        /// Exact task name to build
        task_name: String,
        /// Apply obfuscation
        confuse: bool,
        /// YAML task payload
        yaml: String,
    },
}

impl WireRequest {
    /// Decode one message.
    ///
    /// # Errors
    /// A [`MalformedRequestError`] naming the first problem found.
    pub fn decode(bytes: &[u8]) -> Result<Self, MalformedRequestError> {
        if !bytes.is_ascii() {
            return Err(MalformedRequestError::NonAscii);
        }
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim();
        if text.is_empty() {
            return Err(MalformedRequestError::Empty);
        }

        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields[0] == CLOSE_SENTINEL {
            return Ok(Self::Close);
        }
        let [task_name, confuse, yaml] = fields[..] else {
            return Err(MalformedRequestError::FieldCount { found: fields.len() });
        };

        let task_name = decode_field(0, task_name)?;
        let confuse = match decode_field(1, confuse)?.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => return Err(MalformedRequestError::ConfuseFlag(other.to_string())),
        };
        let yaml = decode_field(2, yaml)?;

        Ok(Self::Build { task_name, confuse, yaml })
    }

    /// Encode as a client would send it
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Close => CLOSE_SENTINEL.as_bytes().to_vec(),
            Self::Build { task_name, confuse, yaml } => format!(
                "{},{},{}",
                STANDARD.encode(task_name),
                STANDARD.encode(if *confuse { "true" } else { "false" }),
                STANDARD.encode(yaml),
            )
            .into_bytes(),
        }
    }
}

fn decode_field(index: usize, field: &str) -> Result<String, MalformedRequestError> {
    let name = FIELDS[index];
    let bytes = STANDARD
        .decode(field)
        .map_err(|source| MalformedRequestError::Base64 { field: name, source })?;
    String::from_utf8(bytes).map_err(|source| MalformedRequestError::Utf8 { field: name, source })
}

/// Reply to one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireResponse {
    /// Built under this (randomized) name
    FileName(String),
    /// Anything went wrong
    CompileFailed,
}

impl WireResponse {
    /// ASCII bytes on the wire
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Parse a reply, as a client would
    #[must_use]
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(bytes).ok()?;
        if text == COMPILE_FAILED {
            return Some(Self::CompileFailed);
        }
        text.strip_prefix(FILE_NAME_PREFIX).map(|name| Self::FileName(name.to_string()))
    }
}

impl fmt::Display for WireResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FileName(name) => write!(f, "{FILE_NAME_PREFIX}{name}"),
            Self::CompileFailed => f.write_str(COMPILE_FAILED),
        }
    }
}
