//! Audio normalisation via ffmpeg.
//!
//! Browsers record webm/ogg; the ASR pipeline wants 16 kHz mono WAV. The
//! audio is piped through `ffmpeg` on stdin/stdout, nothing touches disk.

use nyay_core::error::SpeechError;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Sample rate expected by the ASR pipeline.
pub const ASR_SAMPLE_RATE: u32 = 16_000;

/// Converts arbitrary audio to 16 kHz mono WAV using an external ffmpeg.
#[derive(Debug, Clone)]
pub struct AudioConverter {
    program: String,
}

impl AudioConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn args() -> Vec<String> {
        vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            "pipe:0".into(),
            "-f".into(),
            "wav".into(),
            "-ac".into(),
            "1".into(),
            "-ar".into(),
            ASR_SAMPLE_RATE.to_string(),
            "pipe:1".into(),
        ]
    }

    /// Convert `audio` to WAV bytes.
    pub async fn to_wav(&self, audio: &[u8]) -> Result<Vec<u8>, SpeechError> {
        if audio.is_empty() {
            return Err(SpeechError::Conversion("no audio received".into()));
        }

        let mut child = Command::new(&self.program)
            .args(Self::args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => SpeechError::ConverterMissing(format!(
                    "'{}' is not installed or not on PATH",
                    self.program
                )),
                _ => SpeechError::Conversion(e.to_string()),
            })?;

        // Feed stdin from a separate task so a full stdout pipe cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| SpeechError::Conversion("ffmpeg stdin unavailable".into()))?;
        let input = audio.to_vec();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| SpeechError::Conversion(e.to_string()))?;

        if let Ok(Err(e)) = writer.await {
            debug!(error = %e, "ffmpeg closed stdin early");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(exit_code = output.status.code().unwrap_or(-1), %stderr, "ffmpeg failed");
            return Err(SpeechError::Conversion(if stderr.is_empty() {
                "ffmpeg exited with an error".into()
            } else {
                stderr
            }));
        }

        debug!(input_bytes = audio.len(), wav_bytes = output.stdout.len(), "Audio converted");
        Ok(output.stdout)
    }
}

impl Default for AudioConverter {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}
