//! Upload and co-processor update sessions.
//!
//! Progress here is simulated: ticks add small increments that stay below a
//! cap, and only a confirmed completion moves a session to 100 %. State
//! transitions never depend on the percentage.

use std::fmt;

use bytes::Bytes;

use crate::effect::TimerId;
use crate::error::CoreError;

/// Extension accepted as a firmware container.
pub const FIRMWARE_EXTENSION: &str = ".bin";
/// Token the device puts in a successful upload acknowledgement.
pub const UPLOAD_SUCCESS_TOKEN: &str = "successfully";
/// Phrase the device answers with after a completed co-processor update.
pub const UPDATE_SUCCESS_PHRASE: &str = "ATtiny1616 firmware update completed successfully";

pub type SessionId = u64;

/// A firmware file chosen by the user. The content is opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Bytes,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

pub fn is_firmware_file(name: &str) -> bool {
    name.len() > FIRMWARE_EXTENSION.len()
        && name
            .to_ascii_lowercase()
            .ends_with(FIRMWARE_EXTENSION)
}

/// Simulated progress parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressProfile {
    pub max_step: f32,
    pub cap: f32,
}

impl ProgressProfile {
    pub const UPLOAD: ProgressProfile = ProgressProfile {
        max_step: 15.0,
        cap: 90.0,
    };
    pub const UPDATE: ProgressProfile = ProgressProfile {
        max_step: 8.0,
        cap: 95.0,
    };

    fn advance(&self, progress: f32, increment: f32) -> f32 {
        (progress + increment.max(0.0)).min(self.cap)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Empty,
    Selected,
    Uploading,
    Uploaded,
    Failed,
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadState::Empty => "no file is selected",
            UploadState::Selected => "a file is selected but not uploaded",
            UploadState::Uploading => "an upload is in progress",
            UploadState::Uploaded => "the firmware is uploaded",
            UploadState::Failed => "the last upload failed",
        };
        f.write_str(label)
    }
}

/// How a finished upload or update turned out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Succeeded,
    /// The device answered, but not with the success wording. Body kept verbatim.
    Rejected(String),
    /// The request itself failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UploadSession {
    id: SessionId,
    file: Option<SelectedFile>,
    state: UploadState,
    progress: f32,
    ticker: Option<TimerId>,
}

impl UploadSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    pub fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn ticker(&self) -> Option<TimerId> {
        self.ticker
    }

    /// Starts a fresh session for `file`. An invalid file still resets the
    /// session so no stale selection survives.
    pub fn select(&mut self, id: SessionId, file: SelectedFile) -> Result<(), CoreError> {
        *self = UploadSession {
            id,
            ..UploadSession::default()
        };
        if !is_firmware_file(&file.name) {
            return Err(CoreError::InvalidFileType {
                filename: file.name,
            });
        }
        self.file = Some(file);
        self.state = UploadState::Selected;
        Ok(())
    }

    /// Moves to `Uploading` and returns the file to send.
    pub fn begin(&mut self, ticker: TimerId) -> Result<SelectedFile, CoreError> {
        let file = match (self.state, self.file.as_ref()) {
            (UploadState::Selected | UploadState::Failed, Some(file)) => file.clone(),
            _ => {
                return Err(CoreError::PreconditionViolation {
                    action: "upload",
                    state: self.state.to_string(),
                })
            }
        };
        self.state = UploadState::Uploading;
        self.progress = 0.0;
        self.ticker = Some(ticker);
        Ok(file)
    }

    /// Applies a progress tick. Ticks for other sessions or idle sessions are dropped.
    pub fn tick(&mut self, session: SessionId, increment: f32) -> bool {
        if session != self.id || self.state != UploadState::Uploading {
            return false;
        }
        self.progress = ProgressProfile::UPLOAD.advance(self.progress, increment);
        true
    }

    /// Whether a response for `session` still belongs to this session.
    pub fn accepts(&self, session: SessionId) -> bool {
        session == self.id && self.state == UploadState::Uploading
    }

    /// Records the result of the upload request and returns the ticker to stop.
    pub fn finish(&mut self, completion: &Completion) -> Option<TimerId> {
        match completion {
            Completion::Succeeded => {
                self.state = UploadState::Uploaded;
                self.progress = 100.0;
            }
            Completion::Rejected(_) => {
                self.state = UploadState::Failed;
                self.progress = 100.0;
            }
            Completion::Failed(_) => {
                self.state = UploadState::Failed;
                self.progress = 0.0;
            }
        }
        self.ticker.take()
    }

    /// Drops the selection. The new id makes in-flight responses stale.
    pub fn cancel(&mut self, id: SessionId) -> Option<TimerId> {
        let ticker = self.ticker.take();
        *self = UploadSession {
            id,
            ..UploadSession::default()
        };
        ticker
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    Updating,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateSession {
    id: SessionId,
    state: UpdateState,
    progress: f32,
    ticker: Option<TimerId>,
}

impl UpdateSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> UpdateState {
        self.state
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn ticker(&self) -> Option<TimerId> {
        self.ticker
    }

    /// Starts an update. Requires a completed upload and no update in flight.
    pub fn begin(
        &mut self,
        upload: UploadState,
        id: SessionId,
        ticker: TimerId,
    ) -> Result<(), CoreError> {
        if upload != UploadState::Uploaded {
            return Err(CoreError::PreconditionViolation {
                action: "start the update",
                state: upload.to_string(),
            });
        }
        if self.state == UpdateState::Updating {
            return Err(CoreError::PreconditionViolation {
                action: "start the update",
                state: "an update is already running".to_string(),
            });
        }
        *self = UpdateSession {
            id,
            state: UpdateState::Updating,
            progress: 0.0,
            ticker: Some(ticker),
        };
        Ok(())
    }

    pub fn tick(&mut self, session: SessionId, increment: f32) -> bool {
        if session != self.id || self.state != UpdateState::Updating {
            return false;
        }
        self.progress = ProgressProfile::UPDATE.advance(self.progress, increment);
        true
    }

    pub fn accepts(&self, session: SessionId) -> bool {
        session == self.id && self.state == UpdateState::Updating
    }

    pub fn finish(&mut self, completion: &Completion) -> Option<TimerId> {
        match completion {
            Completion::Succeeded => {
                self.state = UpdateState::Succeeded;
                self.progress = 100.0;
            }
            Completion::Rejected(_) => {
                self.state = UpdateState::Failed;
                self.progress = 100.0;
            }
            Completion::Failed(_) => {
                self.state = UpdateState::Failed;
                self.progress = 0.0;
            }
        }
        self.ticker.take()
    }

    pub fn reset(&mut self, id: SessionId) -> Option<TimerId> {
        let ticker = self.ticker.take();
        *self = UpdateSession {
            id,
            ..UpdateSession::default()
        };
        ticker
    }
}

/// Judges an upload acknowledgement by the device's free-text wording.
pub fn upload_completion(body: &str) -> Completion {
    if body.contains(UPLOAD_SUCCESS_TOKEN) {
        Completion::Succeeded
    } else {
        Completion::Rejected(body.to_string())
    }
}

/// Judges an update response by the device's completion phrase.
pub fn update_completion(body: &str) -> Completion {
    if body.contains(UPDATE_SUCCESS_PHRASE) {
        Completion::Succeeded
    } else {
        Completion::Rejected(body.to_string())
    }
}
