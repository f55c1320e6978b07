//! Test harness for isolated batch runs.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Semaphore;

use docustack::extraction::{ExtractionRequest, Extractor};
use docustack::{BatchProcessor, ExtractedData, ExtractionError, JobRegistry, SourceFile};

/// Canned extraction results keyed by file name.
///
/// Unknown files fail with "no script for <name>". A gated call waits for a
/// permit before answering, which keeps its job in flight until the test
/// calls [`ScriptedExtractor::release`]. `gated()` holds every call, `hold`
/// only the named files.
#[derive(Default)]
pub struct ScriptedExtractor {
    scripts: Mutex<HashMap<String, Result<ExtractedData, String>>>,
    gate: Option<Arc<Semaphore>>,
    held: Option<HashSet<String>>,
    calls: AtomicUsize,
    seen: Mutex<Vec<ExtractionRequest>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn succeed(self, file_name: &str, data: ExtractedData) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Ok(data));
        self
    }

    pub fn fail(self, file_name: &str, message: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(file_name.to_string(), Err(message.to_string()));
        self
    }

    /// Holds calls for `file_name` until released; other files answer at once.
    pub fn hold(mut self, file_name: &str) -> Self {
        self.gate.get_or_insert_with(|| Arc::new(Semaphore::new(0)));
        self.held
            .get_or_insert_with(HashSet::new)
            .insert(file_name.to_string());
        self
    }

    fn is_held(&self, file_name: &str) -> bool {
        match &self.held {
            Some(names) => names.contains(file_name),
            None => true,
        }
    }

    /// Lets `n` gated calls proceed.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, request: ExtractionRequest) -> Result<ExtractedData, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(request.clone());

        if let Some(gate) = self.gate.as_ref().filter(|_| self.is_held(&request.file_name)) {
            gate.acquire()
                .await
                .expect("gate semaphore closed")
                .forget();
        }

        let script = self.scripts.lock().unwrap().get(&request.file_name).cloned();
        match script {
            Some(Ok(mut data)) => {
                data.source_file_name = request.file_name.clone();
                Ok(data)
            }
            Some(Err(message)) => Err(ExtractionError::service(message)),
            None => Err(ExtractionError::service(format!(
                "no script for {}",
                request.file_name
            ))),
        }
    }
}

/// Isolated upload directory plus helpers to build processors around it.
pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");
        std::fs::create_dir_all(&upload_dir).expect("Failed to create upload directory");
        Self {
            temp_dir,
            upload_dir,
        }
    }

    /// Writes a minimal PDF file and returns it as a source file.
    pub fn pdf(&self, name: &str) -> SourceFile {
        let path = self.upload_dir.join(name);
        std::fs::write(&path, format!("%PDF-1.4\n% {}\n%%EOF\n", name))
            .expect("Failed to write test PDF");
        SourceFile::from_path(path)
    }

    /// A source file pointing at a path that does not exist.
    pub fn missing(&self, name: &str) -> SourceFile {
        SourceFile::from_path(self.upload_dir.join("missing").join(name))
    }

    pub fn processor(&self, extractor: Arc<ScriptedExtractor>) -> BatchProcessor {
        BatchProcessor::new(Arc::new(JobRegistry::new()), extractor)
    }
}

/// Polls `condition` until it holds or a second has passed.
pub async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
