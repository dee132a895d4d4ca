use async_trait::async_trait;
use docker_image_mover::config::AuthConfig;
use docker_image_mover::registry::{
    ImageEngine, LoginStatus, ProgressRecord, ProgressStream, TagStatus,
};
use docker_image_mover::{ImageMover, Logger, MoverError, Result, TransferRequest, TransferSide};
use futures::StreamExt;
use futures::stream;
use serde_json::json;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Login { username: String, server: Option<String> },
    Pull { image: String, tag: String },
    Tag { source: String, repository: String, tag: String },
    Push { image: String, tag: String },
}

/// Engine that records every call and answers from a script
struct FakeEngine {
    calls: Vec<Call>,
    rejected_users: Vec<String>,
    pull_records: Vec<ProgressRecord>,
    tag_status: TagStatus,
    push_records: Vec<ProgressRecord>,
}

impl FakeEngine {
    fn healthy() -> Self {
        let mut aux = ProgressRecord::default();
        aux.aux = Some(json!({"Tag": "prod", "Digest": "sha256:feedbeef", "Size": 528}));

        Self {
            calls: Vec::new(),
            rejected_users: Vec::new(),
            pull_records: vec![
                ProgressRecord::with_status("Pulling from alice/app"),
                ProgressRecord::with_status("Digest: sha256:feedbeef"),
                ProgressRecord::with_status("Status: Downloaded newer image for alice/app:1.0"),
            ],
            tag_status: TagStatus::Tagged,
            push_records: vec![
                ProgressRecord::with_status("The push refers to repository [docker.io/bob/app]"),
                ProgressRecord::with_status("prod: digest: sha256:feedbeef size: 528"),
                aux,
            ],
        }
    }

    fn rejecting(mut self, username: &str) -> Self {
        self.rejected_users.push(username.to_string());
        self
    }

    fn stream_of(records: &[ProgressRecord]) -> ProgressStream {
        let items: Vec<Result<ProgressRecord>> = records.iter().cloned().map(Ok).collect();
        stream::iter(items).boxed()
    }
}

#[async_trait]
impl ImageEngine for FakeEngine {
    async fn login(&mut self, credentials: &AuthConfig, server: Option<&str>) -> Result<LoginStatus> {
        self.calls.push(Call::Login {
            username: credentials.username.clone(),
            server: server.map(str::to_string),
        });
        if self.rejected_users.contains(&credentials.username) {
            Ok(LoginStatus::Rejected("incorrect username or password".to_string()))
        } else {
            Ok(LoginStatus::Succeeded)
        }
    }

    async fn pull(&mut self, image: &str, tag: &str) -> Result<ProgressStream> {
        self.calls.push(Call::Pull {
            image: image.to_string(),
            tag: tag.to_string(),
        });
        Ok(Self::stream_of(&self.pull_records))
    }

    async fn tag(&mut self, source: &str, repository: &str, tag: &str) -> Result<TagStatus> {
        self.calls.push(Call::Tag {
            source: source.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        });
        Ok(self.tag_status.clone())
    }

    async fn push(&mut self, image: &str, tag: &str) -> Result<ProgressStream> {
        self.calls.push(Call::Push {
            image: image.to_string(),
            tag: tag.to_string(),
        });
        Ok(Self::stream_of(&self.push_records))
    }
}

fn request() -> TransferRequest {
    TransferRequest::new(
        TransferSide::new("alice", "a-pass", "app", "1.0"),
        TransferSide::new("bob", "b-pass", "app", "prod"),
    )
    .unwrap()
}

fn login(username: &str) -> Call {
    Call::Login {
        username: username.to_string(),
        server: None,
    }
}

fn pull() -> Call {
    Call::Pull {
        image: "alice/app".to_string(),
        tag: "1.0".to_string(),
    }
}

fn tag() -> Call {
    Call::Tag {
        source: "alice/app:1.0".to_string(),
        repository: "bob/app".to_string(),
        tag: "prod".to_string(),
    }
}

fn push() -> Call {
    Call::Push {
        image: "bob/app".to_string(),
        tag: "prod".to_string(),
    }
}

async fn run(engine: FakeEngine) -> (Result<docker_image_mover::MoveReport>, Vec<Call>) {
    let mut mover = ImageMover::new(engine, Logger::new_quiet());
    let result = mover.run(&request()).await;
    (result, mover.into_engine().calls)
}

#[tokio::test]
async fn test_successful_move_runs_steps_in_order() {
    let (result, calls) = run(FakeEngine::healthy()).await;

    let report = result.unwrap();
    assert_eq!(calls, vec![login("alice"), pull(), tag(), login("bob"), push()]);
    assert_eq!(report.source, "alice/app:1.0");
    assert_eq!(report.destination, "bob/app:prod");
    assert_eq!(report.pull.digest, report.push.digest);
    assert_eq!(report.push.digest.as_deref(), Some("sha256:feedbeef"));
}

#[tokio::test]
async fn test_source_login_rejection_stops_everything() {
    let (result, calls) = run(FakeEngine::healthy().rejecting("alice")).await;

    assert!(matches!(result, Err(MoverError::Authentication(_))));
    assert_eq!(calls, vec![login("alice")]);
}

#[tokio::test]
async fn test_pull_not_found_skips_tag_and_push() {
    let mut engine = FakeEngine::healthy();
    engine.pull_records = vec![ProgressRecord::with_error(
        "manifest for alice/app:1.0 not found: manifest unknown",
    )];

    let (result, calls) = run(engine).await;

    assert!(matches!(result, Err(MoverError::NotFound(_))));
    assert_eq!(calls, vec![login("alice"), pull()]);
}

#[tokio::test]
async fn test_pull_stream_without_completion_is_transfer_error() {
    let mut engine = FakeEngine::healthy();
    engine.pull_records = vec![ProgressRecord::with_status("Pulling fs layer")];

    let (result, calls) = run(engine).await;

    assert!(matches!(result, Err(MoverError::Transfer(_))));
    assert_eq!(calls, vec![login("alice"), pull()]);
}

#[tokio::test]
async fn test_tag_failure_skips_destination_login_and_push() {
    let mut engine = FakeEngine::healthy();
    engine.tag_status = TagStatus::Rejected("No such image: alice/app:1.0".to_string());

    let (result, calls) = run(engine).await;

    assert!(matches!(result, Err(MoverError::Tag(_))));
    assert_eq!(calls, vec![login("alice"), pull(), tag()]);
}

#[tokio::test]
async fn test_destination_login_rejection_skips_push() {
    let (result, calls) = run(FakeEngine::healthy().rejecting("bob")).await;

    assert!(matches!(result, Err(MoverError::Authentication(_))));
    assert_eq!(calls, vec![login("alice"), pull(), tag(), login("bob")]);
}

#[tokio::test]
async fn test_push_denied_is_permission_error() {
    let mut engine = FakeEngine::healthy();
    engine.push_records = vec![
        ProgressRecord::with_status("The push refers to repository [docker.io/bob/app]"),
        ProgressRecord::with_error("denied: requested access to the resource is denied"),
    ];

    let (result, calls) = run(engine).await;

    assert!(matches!(result, Err(MoverError::Permission(_))));
    assert_eq!(calls.last(), Some(&push()));
}

#[tokio::test]
async fn test_repeated_runs_repeat_every_step() {
    let mut mover = ImageMover::new(FakeEngine::healthy(), Logger::new_quiet());
    let request = request();

    mover.run(&request).await.unwrap();
    mover.run(&request).await.unwrap();

    let calls = mover.into_engine().calls;
    let cycle = vec![login("alice"), pull(), tag(), login("bob"), push()];
    assert_eq!(calls.len(), 10);
    assert_eq!(calls[..5], cycle[..]);
    assert_eq!(calls[5..], cycle[..]);
}

#[tokio::test]
async fn test_registry_servers_flow_into_login_and_references() {
    let request = TransferRequest::new(
        TransferSide::new("alice", "a-pass", "app", "1.0")
            .with_registry(Some("src.example.com".to_string())),
        TransferSide::new("bob", "b-pass", "app", "")
            .with_registry(Some("dst.example.com".to_string())),
    )
    .unwrap();

    let mut mover = ImageMover::new(FakeEngine::healthy(), Logger::new_quiet());
    mover.run(&request).await.unwrap();
    let calls = mover.into_engine().calls;

    assert_eq!(
        calls,
        vec![
            Call::Login {
                username: "alice".to_string(),
                server: Some("src.example.com".to_string()),
            },
            Call::Pull {
                image: "src.example.com/alice/app".to_string(),
                tag: "1.0".to_string(),
            },
            Call::Tag {
                source: "src.example.com/alice/app:1.0".to_string(),
                repository: "dst.example.com/bob/app".to_string(),
                tag: "latest".to_string(),
            },
            Call::Login {
                username: "bob".to_string(),
                server: Some("dst.example.com".to_string()),
            },
            Call::Push {
                image: "dst.example.com/bob/app".to_string(),
                tag: "latest".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_stages_can_be_driven_individually() {
    let request = request();
    let mut mover = ImageMover::new(FakeEngine::healthy(), Logger::new_quiet());

    mover.tag_downloaded_image(&request).await.unwrap();
    let summary = mover.pull(request.source()).await.unwrap();

    assert_eq!(summary.records, 3);
    assert_eq!(mover.engine().calls, vec![tag(), pull()]);
}
