//! Synthea generation pipeline
//!
//! Runs the generator for a batch of synthetic patients inside a private job
//! directory, then ingests every patient bundle it produced. Steps up to and
//! including the generator run are fatal; a bad output file is skipped.

use crate::adapters::database::{create_store, ResourceStore, UnitOfWork};
use crate::config::{FhirSyncConfig, GeneratorConfig};
use crate::core::batch::BatchRunner;
use crate::core::generate::process::GeneratorCommand;
use crate::core::generate::workspace::GenerationJob;
use crate::core::ingest::{EnvelopePersister, ResourceUpserter};
use crate::core::sync::RunStatus;
use crate::domain::{EnvelopeKind, PatientId, QueryDescriptor, Result, SyncError};
use crate::fhir::{parse_bundle, Bundle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::Span;

/// Generator output files containing this marker hold organization and
/// practitioner data rather than patient records
const HOSPITAL_MARKER: &str = "hospital";

/// Result of a generation run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub status: RunStatus,

    /// Patients requested from the generator
    pub count: u32,

    pub transaction_id: String,

    /// Patient bundles stored
    pub files_ingested: usize,

    /// Patient bundles skipped because they could not be ingested
    pub failed_files: usize,

    /// Resources upserted across all stored bundles
    pub resources_ingested: usize,
}

impl GenerationOutcome {
    pub fn log_summary(&self, span: &Span) {
        tracing::info!(
            parent: span,
            transaction_id = %self.transaction_id,
            count = self.count,
            files_ingested = self.files_ingested,
            failed_files = self.failed_files,
            resources_ingested = self.resources_ingested,
            "Generation completed"
        );
    }
}

/// Generation pipeline
pub struct GenerationPipeline {
    config: GeneratorConfig,
    store: Arc<dyn ResourceStore>,
    upserter: ResourceUpserter,
    persister: EnvelopePersister,
    span: Span,
}

impl GenerationPipeline {
    pub fn new(config: GeneratorConfig, store: Arc<dyn ResourceStore>) -> Self {
        Self {
            config,
            store,
            upserter: ResourceUpserter::new(),
            persister: EnvelopePersister::new(),
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.upserter = ResourceUpserter::new().with_span(span.clone());
        self.persister = EnvelopePersister::new().with_span(span.clone());
        self.span = span;
        self
    }

    /// Create a pipeline writing to the configured store
    pub async fn from_config(config: &FhirSyncConfig) -> Result<Self> {
        let store = create_store(config).await?;
        let span = tracing::info_span!("generate");
        Ok(Self::new(config.generator.clone(), store).with_span(span))
    }

    /// Generate `count` synthetic patients and ingest their bundles
    ///
    /// The job directory is gone when this returns, whatever the outcome.
    pub async fn generate_patients(&self, count: u32) -> Result<GenerationOutcome> {
        if count == 0 {
            return Err(SyncError::Validation(
                "patient count must be at least 1".to_string(),
            ));
        }

        tracing::info!(parent: &self.span, count, "Starting Synthea generation");

        self.check_tooling().await?;
        let artifact = self.locate_artifact().await?;

        let job = GenerationJob::create(&self.config.output_root, count, &self.span).await?;
        let result = self.run_job(&job, &artifact).await;
        job.release().await;

        let outcome = result?;
        outcome.log_summary(&self.span);
        Ok(outcome)
    }

    async fn check_tooling(&self) -> Result<()> {
        let scripts_dir = &self.config.scripts_dir;
        match tokio::fs::metadata(scripts_dir).await {
            Ok(meta) if meta.is_dir() => Ok(()),
            _ => Err(SyncError::MissingTooling(format!(
                "scripts directory {} not found; is the volume mounted?",
                scripts_dir.display()
            ))),
        }
    }

    /// Absolute path of the generator artifact
    async fn locate_artifact(&self) -> Result<PathBuf> {
        let primary = self.config.scripts_dir.join(&self.config.artifact);
        for candidate in [&primary, &self.config.fallback_artifact] {
            if is_file(candidate).await {
                return Ok(tokio::fs::canonicalize(candidate).await?);
            }
        }

        Err(SyncError::MissingExecutable(format!(
            "generator artifact not found at {} or {}",
            primary.display(),
            self.config.fallback_artifact.display()
        )))
    }

    async fn run_job(&self, job: &GenerationJob, artifact: &Path) -> Result<GenerationOutcome> {
        let output_dir = job.workspace.path();

        GeneratorCommand::synthea(&self.config, artifact, job.requested, output_dir)
            .run(&self.span)
            .await?;

        let files = collect_patient_files(output_dir).await?;
        tracing::info!(parent: &self.span, files = files.len(), "Ingesting generated bundles");

        let runner = BatchRunner::new("synthea-harvest").with_span(self.span.clone());
        let items = files.into_iter().map(|path| {
            let key = path
                .strip_prefix(output_dir)
                .unwrap_or(&path)
                .display()
                .to_string();
            (key, path)
        });
        let outcome = runner
            .run(items, |path| async move {
                self.ingest_file(&path)
                    .await
                    .map_err(|e| SyncError::FileProcessing {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    })
            })
            .await;

        Ok(GenerationOutcome {
            status: RunStatus::Success,
            count: job.requested,
            transaction_id: job.transaction_id.to_string(),
            files_ingested: outcome.succeeded.len(),
            failed_files: outcome.failed.len(),
            resources_ingested: outcome.aggregate(0, |total, n| total + n),
        })
    }

    /// Store one generated bundle in its own unit of work
    ///
    /// Returns the number of resources upserted.
    async fn ingest_file(&self, path: &Path) -> Result<usize> {
        let text = tokio::fs::read_to_string(path).await?;
        let bundle = parse_bundle(&text)?;
        let patient_id = owning_patient(&bundle);

        let mut uow = UnitOfWork::begin(
            self.store.as_ref(),
            format!("file:{}", path.display()),
            &self.span,
        )
        .await?;
        let outcome = self.store_bundle(&mut uow, &bundle, &patient_id).await;
        uow.finish(outcome).await
    }

    async fn store_bundle(
        &self,
        uow: &mut UnitOfWork,
        bundle: &Bundle,
        patient_id: &PatientId,
    ) -> Result<usize> {
        self.persister
            .persist_bundle(
                uow,
                bundle,
                EnvelopeKind::SyntheaGenerated,
                &QueryDescriptor::for_patient(patient_id),
            )
            .await?;

        if !self.config.ingest_resources {
            return Ok(0);
        }

        let mut upserted = 0;
        for resource in bundle.resources() {
            self.upserter.upsert_resource(uow, resource).await?;
            upserted += 1;
        }
        Ok(upserted)
    }
}

/// Id of the leading `Patient` entry, or `unknown`
fn owning_patient(bundle: &Bundle) -> PatientId {
    bundle
        .resources()
        .next()
        .filter(|resource| resource.is_patient())
        .and_then(|resource| resource.id())
        .and_then(|id| PatientId::new(id).ok())
        .unwrap_or_else(PatientId::unknown)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

/// Patient bundle files under `root`, sorted by path
async fn collect_patient_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else if is_patient_file(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_patient_file(path: &Path) -> bool {
    let is_json = path.extension().is_some_and(|ext| ext == "json");
    let is_hospital = path
        .file_name()
        .is_some_and(|name| name.to_string_lossy().contains(HOSPITAL_MARKER));
    is_json && !is_hospital
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fhir::Resource;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("fhir/Jane_Doe_1.json", true ; "patient bundle")]
    #[test_case("fhir/hospitalInformation1700000000.json", false ; "hospital information")]
    #[test_case("fhir/practitionerInformation1700000000.json", true ; "practitioner information")]
    #[test_case("fhir/notes.txt", false ; "not json")]
    fn test_is_patient_file(path: &str, expected: bool) {
        assert_eq!(is_patient_file(Path::new(path)), expected);
    }

    #[test]
    fn test_owning_patient() {
        let patient = Resource::from_document(
            json!({"resourceType": "Patient", "id": "abc"}).as_object().unwrap().clone(),
        )
        .unwrap();
        let encounter = Resource::from_document(
            json!({"resourceType": "Encounter", "id": "enc"}).as_object().unwrap().clone(),
        )
        .unwrap();

        let bundle = Bundle::new("transaction")
            .with_resource(patient.clone())
            .with_resource(encounter.clone());
        assert_eq!(owning_patient(&bundle).as_str(), "abc");

        let bundle = Bundle::new("transaction")
            .with_resource(encounter)
            .with_resource(patient);
        assert_eq!(owning_patient(&bundle).as_str(), PatientId::UNKNOWN);

        assert_eq!(owning_patient(&Bundle::new("transaction")).as_str(), PatientId::UNKNOWN);
    }

    #[tokio::test]
    async fn test_collect_patient_files_walks_and_sorts() {
        let root = tempfile::tempdir().unwrap();
        let fhir = root.path().join("fhir");
        std::fs::create_dir_all(fhir.join("nested")).unwrap();
        std::fs::write(fhir.join("b.json"), "{}").unwrap();
        std::fs::write(fhir.join("a.json"), "{}").unwrap();
        std::fs::write(fhir.join("nested").join("c.json"), "{}").unwrap();
        std::fs::write(fhir.join("hospitalInformation1.json"), "{}").unwrap();
        std::fs::write(root.path().join("run.log"), "").unwrap();

        let files = collect_patient_files(root.path()).await.unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root.path()).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["fhir/a.json", "fhir/b.json", "fhir/nested/c.json"]);
    }
}
