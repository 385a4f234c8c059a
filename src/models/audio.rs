use base64::Engine;

/// Fallback when the backend does not say what it synthesized.
const DEFAULT_REPLY_MIME: &str = "audio/mpeg";

/// A finished piece of audio: a microphone recording or a spoken reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AudioDecodeError {
    #[error("Reply carried no audio")]
    Empty,
    #[error("Invalid base64 audio: {0}")]
    Base64(#[from] base64::DecodeError),
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>, mime: &str) -> Self {
        Self {
            bytes,
            mime: mime.to_string(),
        }
    }

    /// Upload name with an extension matching the MIME type,
    /// e.g. `recording.webm`.
    pub fn file_name(&self) -> String {
        let essence = self.mime.split(';').next().unwrap_or_default().trim();
        let ext = mime_guess::get_mime_extensions_str(essence)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("bin");
        format!("recording.{ext}")
    }

    /// Decode a base64 reply payload. Accepts bare base64 or a `data:` URL;
    /// `format` may be a MIME type (`audio/wav`) or an extension (`mp3`).
    pub fn from_base64(payload: &str, format: Option<&str>) -> Result<Self, AudioDecodeError> {
        let (data_url_mime, encoded) = match payload.trim().strip_prefix("data:") {
            Some(rest) => match rest.split_once(',') {
                Some((header, data)) => (
                    header.strip_suffix(";base64").map(str::to_string),
                    data,
                ),
                None => (None, rest),
            },
            None => (None, payload.trim()),
        };

        if encoded.is_empty() {
            return Err(AudioDecodeError::Empty);
        }
        let bytes = base64::engine::general_purpose::STANDARD.decode(encoded)?;
        if bytes.is_empty() {
            return Err(AudioDecodeError::Empty);
        }

        let mime = data_url_mime
            .or_else(|| format.map(mime_from_format))
            .unwrap_or_else(|| DEFAULT_REPLY_MIME.to_string());
        Ok(Self { bytes, mime })
    }
}

fn mime_from_format(format: &str) -> String {
    let format = format.trim();
    if format.contains('/') {
        return format.to_string();
    }
    mime_guess::from_ext(format)
        .first_raw()
        .unwrap_or(DEFAULT_REPLY_MIME)
        .to_string()
}
