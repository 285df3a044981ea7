use rand::{Rng, seq::SliceRandom};

/// A generic boxed error type.
pub type AnyError = Box<dyn std::error::Error + Send + Sync>;

/// A convenient Result alias returning `AnyError`.
pub type AnyResult<T> = std::result::Result<T, AnyError>;

const CPN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";

/// Strongly typed video identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::ops::Deref for VideoId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for VideoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content playback nonce, sent with player requests and appended to stream URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionNonce(pub String);

impl std::ops::Deref for SessionNonce {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl SessionNonce {
    /// Generates a random 16-character nonce over the URL-safe base64 alphabet.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let s: String = (0..16)
            .map(|_| {
                let idx = rng.gen_range(0..CPN_ALPHABET.len());
                CPN_ALPHABET[idx] as char
            })
            .collect();
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionNonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Random "t" query value some mobile endpoints expect.
pub fn random_request_tag() -> String {
    let mut bytes = CPN_ALPHABET.to_vec();
    bytes.shuffle(&mut rand::thread_rng());
    bytes.into_iter().take(12).map(char::from).collect()
}
