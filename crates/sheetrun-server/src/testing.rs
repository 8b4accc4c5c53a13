//! Test doubles shared by the unit tests.

use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::Mutex;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use sheetrun_core::ModuleSpec;

use crate::delegate::{DelegateError, DelegateOutput, ProcessingDelegate, RoleInputs};
use crate::ingest::Uploads;

/// Uploads for every `modulo1` role, all with the same content.
pub fn modulo1_uploads(content: &str) -> Uploads {
    let module = ModuleSpec::modulo1().unwrap();
    module
        .fields()
        .fold(Uploads::new(), |uploads, field| {
            uploads.with_bytes(field, content.as_bytes().to_vec())
        })
}

/// Yields some bytes, then fails.
pub struct FailingReader {
    data: Vec<u8>,
    pos: usize,
}

impl FailingReader {
    pub fn after(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.pos < self.data.len() {
            let start = self.pos;
            let n = (self.data.len() - start).min(buf.remaining());
            buf.put_slice(&self.data[start..start + n]);
            self.pos += n;
            Poll::Ready(Ok(()))
        } else {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "upload stream interrupted",
            )))
        }
    }
}

/// Writes a fixed artifact and records the inputs it was called with, along
/// with the content of the first input at call time.
pub struct StaticDelegate {
    artifact: String,
    content: Vec<u8>,
    logs: Vec<String>,
    seen: Mutex<Vec<RoleInputs>>,
    first_inputs: Mutex<Vec<Vec<u8>>>,
}

impl StaticDelegate {
    pub fn new(artifact: &str, content: Vec<u8>, logs: Vec<String>) -> Self {
        Self {
            artifact: artifact.to_string(),
            content,
            logs,
            seen: Mutex::new(Vec::new()),
            first_inputs: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<RoleInputs> {
        self.seen.lock().unwrap().clone()
    }

    pub fn first_inputs(&self) -> Vec<Vec<u8>> {
        self.first_inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessingDelegate for StaticDelegate {
    async fn process(
        &self,
        inputs: &RoleInputs,
        output_dir: &Path,
    ) -> Result<DelegateOutput, DelegateError> {
        if let Some((_, path)) = inputs.iter().next() {
            let content = tokio::fs::read(path).await?;
            self.first_inputs.lock().unwrap().push(content);
        }
        self.seen.lock().unwrap().push(inputs.clone());
        let artifact = output_dir.join(&self.artifact);
        tokio::fs::write(&artifact, &self.content).await?;
        Ok(DelegateOutput {
            artifact,
            logs: self.logs.clone(),
        })
    }
}

pub struct FailingDelegate {
    message: String,
}

impl FailingDelegate {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl ProcessingDelegate for FailingDelegate {
    async fn process(&self, _: &RoleInputs, _: &Path) -> Result<DelegateOutput, DelegateError> {
        Err(DelegateError::Failed(self.message.clone()))
    }
}

pub struct SlowDelegate {
    delay: Duration,
}

impl SlowDelegate {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl ProcessingDelegate for SlowDelegate {
    async fn process(&self, _: &RoleInputs, output_dir: &Path) -> Result<DelegateOutput, DelegateError> {
        tokio::time::sleep(self.delay).await;
        Ok(DelegateOutput {
            artifact: output_dir.join("late.xlsx"),
            logs: Vec::new(),
        })
    }
}

/// Checks that all inputs of a run carry the same content and stay
/// unchanged while it works.
#[derive(Default)]
pub struct ConsistencyDelegate {
    observations: Mutex<Vec<bool>>,
}

impl ConsistencyDelegate {
    pub fn observations(&self) -> Vec<bool> {
        self.observations.lock().unwrap().clone()
    }

    async fn snapshot(inputs: &RoleInputs) -> io::Result<Vec<Vec<u8>>> {
        let mut contents = Vec::new();
        for (_, path) in inputs.iter() {
            contents.push(tokio::fs::read(path).await?);
        }
        Ok(contents)
    }
}

#[async_trait]
impl ProcessingDelegate for ConsistencyDelegate {
    async fn process(
        &self,
        inputs: &RoleInputs,
        output_dir: &Path,
    ) -> Result<DelegateOutput, DelegateError> {
        let before = Self::snapshot(inputs).await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let after = Self::snapshot(inputs).await?;

        let consistent = before == after && before.windows(2).all(|w| w[0] == w[1]);
        self.observations.lock().unwrap().push(consistent);

        let marker = String::from_utf8_lossy(&before[0]);
        let name = format!("{}.xlsx", marker.split('-').take(2).collect::<Vec<_>>().join("-"));
        let artifact = output_dir.join(name);
        tokio::fs::write(&artifact, &before[0]).await?;
        Ok(DelegateOutput {
            artifact,
            logs: Vec::new(),
        })
    }
}
