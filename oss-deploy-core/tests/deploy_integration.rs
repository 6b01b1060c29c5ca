use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use oss_deploy_core::config::{BranchTargets, ChangeDetection, DeployConfig, Target};
use oss_deploy_core::contract::{MockObjectStore, MockVcs};
use oss_deploy_core::deploy::{deploy, DeployOutcome, UploadStatus};
use oss_deploy_core::environment::Environment;
use oss_deploy_core::error::CommandError;
use tempfile::{tempdir, TempDir};

fn env_for(token: &str) -> Environment {
    [
        (format!("OSS_BUCKET_NAME_{token}"), format!("bucket-{}", token.to_lowercase())),
        (format!("OSS_ACCESS_KEY_ID_{token}"), "AKID-TEST".to_string()),
        (format!("OSS_SECRET_ACCESS_KEY_{token}"), "secret-test".to_string()),
        (format!("OSS_ENDPOINT_{token}"), "oss-cn-hangzhou.aliyuncs.com".to_string()),
    ]
    .into_iter()
    .collect()
}

/// Default dev/prod layout rooted in a fresh temp dir, with both html files present.
fn workspace() -> (TempDir, DeployConfig) {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("dev.html"), "<h1>dev</h1>").unwrap();
    fs::write(dir.path().join("prod.html"), "<h1>prod</h1>").unwrap();
    let config = DeployConfig {
        working_dir: dir.path().to_path_buf(),
        ..DeployConfig::default()
    };
    (dir, config)
}

fn vcs_on(branch: &'static str) -> MockVcs {
    let mut vcs = MockVcs::new();
    vcs.expect_current_branch()
        .times(1)
        .returning(move || Ok(branch.to_string()));
    vcs
}

fn with_new_commits(vcs: &mut MockVcs, log: &'static str) {
    vcs.expect_pull().times(1).returning(|| Ok(()));
    vcs.expect_log_oneline()
        .times(1)
        .returning(move |_, _| Ok(log.to_string()));
}

type Seen = Arc<Mutex<Vec<(PathBuf, String, bool)>>>;

fn recording_store(seen: &Seen) -> MockObjectStore {
    let seen = seen.clone();
    let mut store = MockObjectStore::new();
    store.expect_upload().returning(move |req| {
        seen.lock()
            .unwrap()
            .push((req.source.clone(), req.destination.clone(), req.recursive));
        Ok(())
    });
    store
}

#[tokio::test]
async fn dev_branch_with_changes_uploads_dev_file_once() {
    let (dir, config) = workspace();
    let mut vcs = vcs_on("dev");
    with_new_commits(&mut vcs, "a1b2c3d update dev page");

    let mut store = MockObjectStore::new();
    let expected_source = dir.path().join("dev.html");
    store
        .expect_upload()
        .withf(move |req| {
            req.source == expected_source
                && req.destination == "dev.html"
                && !req.recursive
                && req.credentials.bucket == "bucket-dev"
        })
        .times(1)
        .returning(|_| Ok(()));

    let outcome = deploy(&config, &env_for("DEV"), &vcs, &store).await;

    match outcome {
        DeployOutcome::Completed(report) => {
            assert_eq!(report.branch, "dev");
            assert_eq!(report.uploaded(), 1);
            assert!(!report.has_failures());
        }
        other => panic!("expected a completed deployment, got {other:?}"),
    }
}

#[tokio::test]
async fn unsupported_branch_skips_everything() {
    let (_dir, config) = workspace();
    // Only current_branch is expected: any pull/log call would panic the mock.
    let vcs = vcs_on("master");
    let mut store = MockObjectStore::new();
    store.expect_upload().times(0);

    // Credentials for master exist, so only the allow-list can stop the upload.
    let env = env_for("MASTER");
    let outcome = deploy(&config, &env, &vcs, &store).await;

    assert_eq!(
        outcome,
        DeployOutcome::UnsupportedBranch {
            branch: "master".into()
        }
    );
    assert!(!outcome.has_failures());
}

#[tokio::test]
async fn prod_without_changes_does_not_upload() {
    let (_dir, config) = workspace();
    let mut vcs = vcs_on("prod");
    with_new_commits(&mut vcs, "");
    let mut store = MockObjectStore::new();
    store.expect_upload().times(0);

    let outcome = deploy(&config, &env_for("PROD"), &vcs, &store).await;

    assert_eq!(
        outcome,
        DeployOutcome::NoChanges {
            branch: "prod".into()
        }
    );
}

#[tokio::test]
async fn unresolvable_branch_is_a_clean_exit() {
    let (_dir, config) = workspace();
    let mut vcs = MockVcs::new();
    vcs.expect_current_branch()
        .returning(|| Err(CommandError::failed("git rev-parse --abbrev-ref HEAD", "fatal: not a git repository")));
    let mut store = MockObjectStore::new();
    store.expect_upload().times(0);

    let outcome = deploy(&config, &env_for("DEV"), &vcs, &store).await;
    assert_eq!(outcome, DeployOutcome::UnknownBranch);
}

#[tokio::test]
async fn any_missing_variable_prevents_upload() {
    struct TestCase {
        name: &'static str,
        unset: &'static str,
    }
    let cases = [
        TestCase { name: "bucket", unset: "OSS_BUCKET_NAME_DEV" },
        TestCase { name: "key id", unset: "OSS_ACCESS_KEY_ID_DEV" },
        TestCase { name: "secret", unset: "OSS_SECRET_ACCESS_KEY_DEV" },
        TestCase { name: "endpoint", unset: "OSS_ENDPOINT_DEV" },
    ];

    for case in cases {
        let (_dir, config) = workspace();
        let mut vcs = vcs_on("dev");
        with_new_commits(&mut vcs, "a1b2c3d change");
        let mut store = MockObjectStore::new();
        store.expect_upload().times(0);

        let env: Environment = [
            ("OSS_BUCKET_NAME_DEV", "bucket-dev"),
            ("OSS_ACCESS_KEY_ID_DEV", "AKID"),
            ("OSS_SECRET_ACCESS_KEY_DEV", "secret"),
            ("OSS_ENDPOINT_DEV", "endpoint"),
        ]
        .into_iter()
        .filter(|(name, _)| *name != case.unset)
        .collect();

        let outcome = deploy(&config, &env, &vcs, &store).await;
        assert_eq!(
            outcome,
            DeployOutcome::MissingCredentials {
                branch: "dev".into(),
                variables: vec![case.unset.to_string()],
            },
            "case: {}",
            case.name
        );
        assert!(outcome.has_failures());
    }
}

#[tokio::test]
async fn missing_source_is_never_handed_to_the_uploader() {
    let (dir, config) = workspace();
    fs::remove_file(dir.path().join("dev.html")).unwrap();
    let mut vcs = vcs_on("dev");
    with_new_commits(&mut vcs, "a1b2c3d change");
    let mut store = MockObjectStore::new();
    store.expect_upload().times(0);

    let outcome = deploy(&config, &env_for("DEV"), &vcs, &store).await;

    let DeployOutcome::Completed(report) = outcome else {
        panic!("expected a completed deployment");
    };
    assert_eq!(report.uploads.len(), 1);
    assert_eq!(report.uploads[0].status, UploadStatus::SourceMissing);
    assert!(report.has_failures());
}

#[tokio::test]
async fn failed_upload_does_not_stop_remaining_targets() {
    let (dir, mut config) = workspace();
    fs::create_dir_all(dir.path().join("project_2/assets")).unwrap();
    fs::write(dir.path().join("project_2/assets/app.js"), "js").unwrap();
    config.branches.insert(
        "dev".into(),
        BranchTargets {
            targets: vec![
                Target {
                    source: PathBuf::from("dev.html"),
                    destination: "dev.html".into(),
                },
                Target {
                    source: PathBuf::from("project_2"),
                    destination: "project_2".into(),
                },
            ],
        },
    );
    config.change_detection = ChangeDetection::Always;

    let mut vcs = vcs_on("dev");
    vcs.expect_pull().times(0);

    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();
    let mut store = MockObjectStore::new();
    store.expect_upload().times(2).returning(move |req| {
        recorder
            .lock()
            .unwrap()
            .push((req.source.clone(), req.destination.clone(), req.recursive));
        if req.destination == "dev.html" {
            Err(CommandError::failed("ossutil cp", "AccessDenied"))
        } else {
            Ok(())
        }
    });

    let outcome = deploy(&config, &env_for("DEV"), &vcs, &store).await;

    let DeployOutcome::Completed(report) = outcome else {
        panic!("expected a completed deployment");
    };
    assert!(matches!(&report.uploads[0].status, UploadStatus::Failed(msg) if msg.contains("AccessDenied")));
    assert_eq!(report.uploads[1].status, UploadStatus::Uploaded);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1], (dir.path().join("project_2"), "project_2".to_string(), true));
}

#[tokio::test]
async fn staging_dir_copy_is_what_gets_uploaded() {
    let (dir, mut config) = workspace();
    config.change_detection = ChangeDetection::Always;
    config.staging_dir = Some(PathBuf::from("staging"));

    let vcs = vcs_on("dev");
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(&seen);

    let outcome = deploy(&config, &env_for("DEV"), &vcs, &store).await;
    assert!(!outcome.has_failures(), "outcome: {outcome:?}");

    let staged = dir.path().join("staging/dev.html");
    assert_eq!(fs::read_to_string(&staged).unwrap(), "<h1>dev</h1>");
    assert_eq!(seen.lock().unwrap()[0].0, staged);
}

#[tokio::test]
async fn source_already_in_staging_dir_is_uploaded_unchanged() {
    let (dir, mut config) = workspace();
    config.change_detection = ChangeDetection::Always;
    config.staging_dir = Some(PathBuf::from("."));

    let vcs = vcs_on("dev");
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(&seen);

    let outcome = deploy(&config, &env_for("DEV"), &vcs, &store).await;
    assert!(!outcome.has_failures(), "outcome: {outcome:?}");

    let source = dir.path().join("dev.html");
    assert_eq!(fs::read_to_string(&source).unwrap(), "<h1>dev</h1>");
    assert_eq!(seen.lock().unwrap()[0].0, source);
}

#[tokio::test]
async fn path_diff_gates_on_target_sources() {
    let (_dir, mut config) = workspace();
    config.change_detection = ChangeDetection::PathDiff { path: None };

    let mut vcs = vcs_on("prod");
    vcs.expect_rev_parse().times(2).returning(|rev| match rev {
        "HEAD~1" => Ok("1111111".to_string()),
        _ => Ok("2222222".to_string()),
    });
    vcs.expect_diff_name_only()
        .times(1)
        .returning(|from, to, path| {
            assert_eq!((from, to), ("1111111", "2222222"));
            Ok(path.display().to_string())
        });

    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let store = recording_store(&seen);

    let outcome = deploy(&config, &env_for("PROD"), &vcs, &store).await;
    let DeployOutcome::Completed(report) = outcome else {
        panic!("expected a completed deployment");
    };
    assert_eq!(report.uploaded(), 1);
    assert_eq!(seen.lock().unwrap()[0].1, "prod.html");
}

#[tokio::test]
async fn credentials_are_a_pure_function_of_branch_and_snapshot() {
    let naming = DeployConfig::default().env;
    let env = env_for("PROD");
    let first = oss_deploy_core::credentials::load_credentials("prod", &naming, &env).unwrap();
    let second = oss_deploy_core::credentials::load_credentials("prod", &naming, &env).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.bucket, "bucket-prod");
}
