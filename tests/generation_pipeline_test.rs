//! Integration tests for the generation pipeline
//!
//! A shell script stands in for the generator: it is launched through `sh`
//! and honours `--exporter.baseDirectory=` like the real tool.

#![cfg(unix)]

use fhirsync::adapters::memory::InMemoryStore;
use fhirsync::config::GeneratorConfig;
use fhirsync::core::generate::GenerationPipeline;
use fhirsync::core::sync::RunStatus;
use fhirsync::domain::{EnvelopeKind, SyncError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const ARTIFACT: &str = "fake-synthea.sh";

const WRITES_BUNDLES: &str = r##"
out=""
for arg in "$@"; do
  case "$arg" in
    --exporter.baseDirectory=*) out="${arg#--exporter.baseDirectory=}" ;;
  esac
done
echo "$out" >> "$(dirname "$0")/runs.log"
mkdir -p "$out/fhir"
cat > "$out/fhir/Good_Patient_gen-1.json" <<'JSON'
{
  "resourceType": "Bundle",
  "type": "transaction",
  "entry": [
    {"resource": {"resourceType": "Patient", "id": "gen-1"}},
    {"resource": {"resourceType": "Encounter", "id": "gen-1-enc"}}
  ]
}
JSON
echo "{ not json" > "$out/fhir/Broken_Patient.json"
echo '{"resourceType": "Bundle", "type": "transaction", "entry": []}' > "$out/fhir/hospitalInformation1700000000.json"
echo "Running with seed"
echo "warning: low memory" >&2
"##;

const FAILS: &str = r#"
echo "generator crashed" >&2
exit 3
"#;

const HANGS: &str = r#"
exec sleep 30
"#;

struct Fixture {
    _root: TempDir,
    scripts_dir: PathBuf,
    output_root: PathBuf,
}

impl Fixture {
    fn new(script: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let scripts_dir = root.path().join("scripts");
        let output_root = root.path().join("output");
        std::fs::create_dir_all(&scripts_dir).unwrap();
        std::fs::write(scripts_dir.join(ARTIFACT), script).unwrap();

        Self {
            _root: root,
            scripts_dir,
            output_root,
        }
    }

    fn config(&self) -> GeneratorConfig {
        GeneratorConfig {
            scripts_dir: self.scripts_dir.clone(),
            artifact: ARTIFACT.to_string(),
            fallback_artifact: self.scripts_dir.join("missing-fallback.sh"),
            launcher: "sh".to_string(),
            launcher_args: Vec::new(),
            output_root: self.output_root.clone(),
            region: "Massachusetts".to_string(),
            extra_args: Vec::new(),
            ingest_resources: true,
        }
    }

    fn pipeline(&self, store: &InMemoryStore) -> GenerationPipeline {
        GenerationPipeline::new(self.config(), Arc::new(store.clone()))
    }

    fn runs(&self) -> Vec<String> {
        std::fs::read_to_string(self.scripts_dir.join("runs.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}

fn job_dirs(output_root: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(output_root) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}

#[tokio::test]
async fn test_generate_ingests_good_bundles_and_cleans_up() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();

    let outcome = fixture.pipeline(&store).generate_patients(5).await.unwrap();

    assert_eq!(outcome.status, RunStatus::Success);
    assert_eq!(outcome.count, 5);
    assert_eq!(outcome.files_ingested, 1);
    assert_eq!(outcome.failed_files, 1);
    assert_eq!(outcome.resources_ingested, 2);

    let envelopes = store.envelopes();
    assert_eq!(envelopes.len(), 1);
    assert_eq!(envelopes[0].envelope_kind, EnvelopeKind::SyntheaGenerated);
    assert_eq!(envelopes[0].patient_id.as_str(), "gen-1");
    assert_eq!(envelopes[0].resource_count, 2);
    assert!(store.resource("gen-1-enc").is_some());

    let runs = fixture.runs();
    assert_eq!(runs.len(), 1);
    assert!(runs[0].contains(&outcome.transaction_id));
    assert!(job_dirs(&fixture.output_root).is_empty());
}

#[tokio::test]
async fn test_envelope_only_ingestion() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();
    let config = GeneratorConfig {
        ingest_resources: false,
        ..fixture.config()
    };

    let outcome = GenerationPipeline::new(config, Arc::new(store.clone()))
        .generate_patients(1)
        .await
        .unwrap();

    assert_eq!(outcome.files_ingested, 1);
    assert_eq!(outcome.resources_ingested, 0);
    assert_eq!(store.envelopes().len(), 1);
    assert!(store.resources().is_empty());
}

#[tokio::test]
async fn test_generator_failure_reports_exit_code_and_cleans_up() {
    let fixture = Fixture::new(FAILS);
    let store = InMemoryStore::new();

    let err = fixture.pipeline(&store).generate_patients(2).await.unwrap_err();

    assert!(matches!(err, SyncError::GeneratorProcess { exit_code: Some(3), .. }));
    assert!(job_dirs(&fixture.output_root).is_empty());
    assert!(store.envelopes().is_empty());
}

#[tokio::test]
async fn test_missing_tooling_directory() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();
    let config = GeneratorConfig {
        scripts_dir: fixture.scripts_dir.join("not-mounted"),
        ..fixture.config()
    };

    let err = GenerationPipeline::new(config, Arc::new(store))
        .generate_patients(1)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MissingTooling(_)));
    assert!(!fixture.output_root.exists());
}

#[tokio::test]
async fn test_missing_artifact() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();
    let config = GeneratorConfig {
        artifact: "other.sh".to_string(),
        ..fixture.config()
    };

    let err = GenerationPipeline::new(config, Arc::new(store))
        .generate_patients(1)
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::MissingExecutable(_)));
    assert!(!fixture.output_root.exists());
}

#[tokio::test]
async fn test_fallback_artifact_is_used() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();
    let config = GeneratorConfig {
        artifact: "other.sh".to_string(),
        fallback_artifact: fixture.scripts_dir.join(ARTIFACT),
        ..fixture.config()
    };

    let outcome = GenerationPipeline::new(config, Arc::new(store))
        .generate_patients(1)
        .await
        .unwrap();
    assert_eq!(outcome.files_ingested, 1);
}

#[tokio::test]
async fn test_zero_count_is_rejected() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();

    let err = fixture.pipeline(&store).generate_patients(0).await.unwrap_err();
    assert!(matches!(err, SyncError::Validation(_)));
    assert!(fixture.runs().is_empty());
}

#[tokio::test]
async fn test_concurrent_jobs_use_distinct_directories() {
    let fixture = Fixture::new(WRITES_BUNDLES);
    let store = InMemoryStore::new();
    let first = fixture.pipeline(&store);
    let second = fixture.pipeline(&store);

    let (a, b) = tokio::join!(first.generate_patients(1), second.generate_patients(1));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.transaction_id, b.transaction_id);
    let runs = fixture.runs();
    assert_eq!(runs.len(), 2);
    assert_ne!(runs[0], runs[1]);
    assert_eq!(store.envelopes().len(), 2);
    assert!(job_dirs(&fixture.output_root).is_empty());
}

#[tokio::test]
async fn test_cancelled_job_removes_directory() {
    let fixture = Fixture::new(HANGS);
    let store = InMemoryStore::new();
    let pipeline = fixture.pipeline(&store);

    let result = tokio::time::timeout(
        Duration::from_millis(500),
        pipeline.generate_patients(1),
    )
    .await;

    assert!(result.is_err());
    assert!(job_dirs(&fixture.output_root).is_empty());
}
