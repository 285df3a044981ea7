//! Player script handling: finding and caching the current script, extracting
//! the signature and throttling transforms from it, and running them.

pub mod lexer;
pub mod matcher;
#[cfg(feature = "rquickjs")]
pub mod quickjs;
pub mod runner;
pub mod script;
pub mod signature;
pub mod throttling;

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

pub use runner::{ScriptRunner, TransformInterpreter};
pub use signature::SignatureProgram;
pub use throttling::ThrottlingProgram;

use crate::{
    common::errors::{ExtractionError, ExtractionResult},
    transport::Transport,
};

struct LoadedScript {
    url: String,
    code: Arc<str>,
    loaded_at: Instant,
}

/// Everything derived from one script version. Replacing the script resets it.
#[derive(Default)]
struct CipherState {
    script: Option<LoadedScript>,
    timestamp: Option<ExtractionResult<u32>>,
    signature: Option<ExtractionResult<SignatureProgram>>,
    throttling: Option<ExtractionResult<ThrottlingProgram>>,
}

pub struct CipherManager {
    transport: Arc<dyn Transport>,
    runner: Arc<dyn ScriptRunner>,
    script_ttl: Duration,
    state: Mutex<CipherState>,
    fetch_lock: tokio::sync::Mutex<()>,
    throttling_values: Mutex<HashMap<String, String>>,
    matcher_runs: AtomicUsize,
}

/// The engine used when none is injected: QuickJS when compiled in, the native
/// interpreter otherwise.
pub fn default_runner() -> Arc<dyn ScriptRunner> {
    #[cfg(feature = "rquickjs")]
    {
        Arc::new(quickjs::QuickJsRunner)
    }
    #[cfg(not(feature = "rquickjs"))]
    {
        Arc::new(TransformInterpreter)
    }
}

impl CipherManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        runner: Arc<dyn ScriptRunner>,
        script_ttl: Duration,
    ) -> Self {
        Self {
            transport,
            runner,
            script_ttl,
            state: Mutex::new(CipherState::default()),
            fetch_lock: tokio::sync::Mutex::new(()),
            throttling_values: Mutex::new(HashMap::new()),
            matcher_runs: AtomicUsize::new(0),
        }
    }

    fn fresh_script(&self) -> Option<Arc<str>> {
        let state = self.state.lock();
        state
            .script
            .as_ref()
            .filter(|s| s.loaded_at.elapsed() < self.script_ttl)
            .map(|s| s.code.clone())
    }

    /// Returns the current player script, downloading it at most once per
    /// expiry window even under concurrent callers.
    pub async fn ensure_script(&self, video_id: &str) -> ExtractionResult<Arc<str>> {
        if let Some(code) = self.fresh_script() {
            return Ok(code);
        }

        let _guard = self.fetch_lock.lock().await;
        if let Some(code) = self.fresh_script() {
            return Ok(code);
        }

        let url = script::discover_script_url(self.transport.as_ref(), video_id).await?;
        let code = script::download_script(self.transport.as_ref(), &url).await?;
        Ok(self.install_script(url, code))
    }

    /// Replaces the cached script and drops everything extracted from the old one.
    pub fn install_script(&self, url: impl Into<String>, code: impl Into<Arc<str>>) -> Arc<str> {
        let url = url.into();
        let code = code.into();
        info!("using player script {}", url);
        *self.state.lock() = CipherState {
            script: Some(LoadedScript {
                url,
                code: code.clone(),
                loaded_at: Instant::now(),
            }),
            ..Default::default()
        };
        self.throttling_values.lock().clear();
        code
    }

    pub fn script_url(&self) -> Option<String> {
        self.state.lock().script.as_ref().map(|s| s.url.clone())
    }

    pub async fn signature_timestamp(&self, video_id: &str) -> ExtractionResult<u32> {
        let code = self.ensure_script(video_id).await?;
        let mut state = self.state.lock();
        if let Some(memo) = &state.timestamp {
            return memo.clone();
        }
        self.matcher_runs.fetch_add(1, Ordering::Relaxed);
        let extracted = signature::extract_timestamp(&code);
        state.timestamp = Some(extracted.clone());
        extracted
    }

    fn loaded_code(state: &CipherState) -> ExtractionResult<Arc<str>> {
        state
            .script
            .as_ref()
            .map(|s| s.code.clone())
            .ok_or_else(|| ExtractionError::deobfuscation("no player script loaded"))
    }

    /// The signature program of the loaded script. Extraction (including a
    /// failed one) runs once per script version.
    pub fn signature_program(&self) -> ExtractionResult<SignatureProgram> {
        let mut state = self.state.lock();
        if let Some(memo) = &state.signature {
            return memo.clone();
        }
        let code = Self::loaded_code(&state)?;
        self.matcher_runs.fetch_add(1, Ordering::Relaxed);
        let extracted = signature::extract_program(&code);
        state.signature = Some(extracted.clone());
        extracted
    }

    pub fn throttling_program(&self) -> ExtractionResult<ThrottlingProgram> {
        let mut state = self.state.lock();
        if let Some(memo) = &state.throttling {
            return memo.clone();
        }
        let code = Self::loaded_code(&state)?;
        self.matcher_runs.fetch_add(1, Ordering::Relaxed);
        let extracted = throttling::extract_program(&code);
        if let Err(e) = &extracted {
            warn!("throttling function unavailable: {}", e);
        }
        state.throttling = Some(extracted.clone());
        extracted
    }

    pub async fn deobfuscate_signature(
        &self,
        video_id: &str,
        obfuscated: &str,
    ) -> ExtractionResult<String> {
        self.ensure_script(video_id).await?;
        let program = self.signature_program()?;
        self.runner
            .run(&program.source, signature::ENTRY_FUNCTION, obfuscated)
    }

    /// Rewrites the `n` parameter of `url`. URLs without one come back unchanged.
    pub async fn deobfuscate_throttling_url(
        &self,
        video_id: &str,
        url: &str,
    ) -> ExtractionResult<String> {
        let Some(value) = throttling::throttling_param(url) else {
            return Ok(url.to_string());
        };
        if let Some(known) = self.throttling_values.lock().get(value) {
            return Ok(throttling::replace_throttling_param(url, known));
        }

        self.ensure_script(video_id).await?;
        let program = self.throttling_program()?;
        let result = self
            .runner
            .run(&program.source, &program.function_name, value)?;
        if result.is_empty() || result.starts_with("enhanced_except") || result == value {
            return Err(ExtractionError::deobfuscation(format!(
                "throttling transform returned `{result}`"
            )));
        }

        debug!("throttling value {} -> {}", value, result);
        self.throttling_values
            .lock()
            .insert(value.to_string(), result.clone());
        Ok(throttling::replace_throttling_param(url, &result))
    }

    /// Forgets the script and everything derived from it.
    pub fn clear(&self) {
        *self.state.lock() = CipherState::default();
        self.throttling_values.lock().clear();
    }

    /// How many times a matcher family has been run against a script.
    pub fn matcher_runs(&self) -> usize {
        self.matcher_runs.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{HttpRequest, HttpResponse};
    use async_trait::async_trait;

    const PLAYER: &str = r#"var foo=1;signatureTimestamp:19834,
var Xy={ab:function(a,b){a.splice(0,b)},cd:function(a){a.reverse()},ef:function(a,b){var c=a[0];a[0]=a[b%a.length];a[b%a.length]=c}};
Qz=function(a){a=a.split("");Xy.cd(a,4);Xy.ef(a,3);Xy.ab(a,1);return a.join("")};
var bar=function(h){h.s&&(m=Qz(decodeURIComponent(h.s)))};"#;

    struct NoNetwork;

    #[async_trait]
    impl Transport for NoNetwork {
        async fn execute(&self, request: HttpRequest) -> ExtractionResult<HttpResponse> {
            Err(ExtractionError::Transport(format!("unexpected {}", request.url)))
        }
    }

    /// Reverses whatever it is given.
    struct ReversingRunner;

    impl ScriptRunner for ReversingRunner {
        fn run(&self, _: &str, _: &str, argument: &str) -> ExtractionResult<String> {
            Ok(argument.chars().rev().collect())
        }
    }

    fn manager(runner: Arc<dyn ScriptRunner>) -> CipherManager {
        CipherManager::new(Arc::new(NoNetwork), runner, Duration::from_secs(3600))
    }

    #[test]
    fn programs_are_extracted_once_per_script() {
        let cipher = manager(Arc::new(TransformInterpreter));
        cipher.install_script("https://www.youtube.com/s/player/a/base.js", PLAYER);

        let first = cipher.signature_program().unwrap();
        let second = cipher.signature_program().unwrap();
        assert_eq!(first, second);
        assert_eq!(cipher.matcher_runs(), 1);

        cipher.install_script("https://www.youtube.com/s/player/b/base.js", PLAYER);
        cipher.signature_program().unwrap();
        assert_eq!(cipher.matcher_runs(), 2);
    }

    #[test]
    fn failed_extraction_is_memoized_too() {
        let cipher = manager(Arc::new(TransformInterpreter));
        cipher.install_script("u", PLAYER);
        assert!(cipher.throttling_program().is_err());
        assert!(cipher.throttling_program().is_err());
        assert_eq!(cipher.matcher_runs(), 1);
    }

    #[tokio::test]
    async fn missing_timestamp_is_memoized() {
        let cipher = manager(Arc::new(TransformInterpreter));
        cipher.install_script("u", "var nothing=here;");
        assert!(cipher.signature_timestamp("vid").await.is_err());
        assert_eq!(cipher.matcher_runs(), 1);
        assert!(cipher.signature_timestamp("vid").await.is_err());
        assert_eq!(cipher.matcher_runs(), 1);

        cipher.install_script("v", PLAYER);
        assert_eq!(cipher.signature_timestamp("vid").await.unwrap(), 19834);
        assert_eq!(cipher.matcher_runs(), 2);
    }

    #[tokio::test]
    async fn deobfuscates_with_cached_script() {
        let cipher = manager(Arc::new(TransformInterpreter));
        cipher.install_script("u", PLAYER);
        assert_eq!(cipher.signature_timestamp("vid").await.unwrap(), 19834);
        assert_eq!(
            cipher.deobfuscate_signature("vid", "abcdef").await.unwrap(),
            "edfba"
        );
    }

    #[tokio::test]
    async fn missing_script_surfaces_transport_error() {
        let cipher = manager(Arc::new(TransformInterpreter));
        let err = cipher.deobfuscate_signature("vid", "abc").await.unwrap_err();
        assert!(matches!(err, ExtractionError::Transport(_)));
    }

    #[tokio::test]
    async fn throttling_values_are_cached_per_input() {
        let script = format!(
            r#"{PLAYER}Rk=function(a){{var b=a.split("");b.reverse();return b.join("")}};(c=d.get("n"))&&(c=Rk(c),d.set("n",c));"#
        );
        let cipher = manager(Arc::new(ReversingRunner));
        cipher.install_script("u", script);

        let url = "https://host/videoplayback?n=abc&x=1";
        let out = cipher.deobfuscate_throttling_url("vid", url).await.unwrap();
        assert_eq!(out, "https://host/videoplayback?n=cba&x=1");
        let again = cipher.deobfuscate_throttling_url("vid", url).await.unwrap();
        assert_eq!(again, out);
        assert_eq!(cipher.matcher_runs(), 1);

        let plain = "https://host/videoplayback?x=1";
        assert_eq!(cipher.deobfuscate_throttling_url("vid", plain).await.unwrap(), plain);
    }

    #[test]
    fn clear_forgets_script() {
        let cipher = manager(Arc::new(TransformInterpreter));
        cipher.install_script("u", PLAYER);
        cipher.clear();
        assert!(cipher.script_url().is_none());
        assert!(cipher.signature_program().is_err());
    }
}
