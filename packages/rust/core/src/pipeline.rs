//! End-to-end research pipeline: topic → prompt → completion → report file.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{info, instrument};

use researchkit_llm::{ChatRequest, CompletionClient};
use researchkit_report::{Report, ReportMeta, write_report};
use researchkit_shared::{AppConfig, Completion, ResearchError, Result, Topic};

use crate::prompt::build_research_prompt;

/// Fewest key points that may be requested.
pub const MIN_BULLETS: u8 = 1;
/// Most key points that may be requested.
pub const MAX_BULLETS: u8 = 10;

/// Configuration for one `research` run.
#[derive(Debug, Clone)]
pub struct ResearchConfig {
    /// Raw topic as given by the user; validated by the pipeline.
    pub topic: String,
    /// Number of key points to request.
    pub bullets: u8,
    /// Directory to write the report into. `None` means print-only.
    pub output_dir: Option<PathBuf>,
    /// Model id.
    pub model: String,
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Completion length cap.
    pub max_tokens: Option<u32>,
    /// Add a YAML metadata block under the report title.
    pub front_matter: bool,
}

impl ResearchConfig {
    /// Start from config-file defaults; callers override fields from flags.
    pub fn from_app_config(config: &AppConfig, topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            bullets: config.defaults.bullets,
            output_dir: Some(PathBuf::from(&config.defaults.output_dir)),
            model: config.openai.model.clone(),
            temperature: Some(config.openai.temperature),
            max_tokens: Some(config.openai.max_tokens),
            front_matter: config.defaults.front_matter,
        }
    }
}

/// Result of a successful `research` run.
#[derive(Debug)]
pub struct ResearchResult {
    /// The validated topic.
    pub topic: Topic,
    /// What the model returned.
    pub completion: Completion,
    /// Where the report was written, unless print-only.
    pub report_path: Option<PathBuf>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once the pipeline has succeeded.
    fn done(&self, result: &ResearchResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &ResearchResult) {}
}

/// Reject bullet counts outside `MIN_BULLETS..=MAX_BULLETS`.
pub fn validate_bullets(bullets: u8) -> Result<()> {
    if (MIN_BULLETS..=MAX_BULLETS).contains(&bullets) {
        Ok(())
    } else {
        Err(ResearchError::invalid_input(format!(
            "number of bullets must be between {MIN_BULLETS} and {MAX_BULLETS}, got {bullets}"
        )))
    }
}

/// Run the research pipeline.
///
/// 1. Validate topic and bullet count
/// 2. Build the prompt
/// 3. One completion request (no retry)
/// 4. Write the report, unless print-only
///
/// Input errors are raised before the network call; nothing is written
/// unless the completion succeeded.
#[instrument(skip_all, fields(topic = %config.topic, bullets = config.bullets, model = %config.model))]
pub async fn research<C: CompletionClient>(
    config: &ResearchConfig,
    client: &C,
    progress: &dyn ProgressReporter,
) -> Result<ResearchResult> {
    let start = Instant::now();

    let topic = Topic::new(&config.topic)?;
    validate_bullets(config.bullets)?;

    progress.phase("Building prompt");
    let prompt = build_research_prompt(&topic, config.bullets);

    let mut request = ChatRequest::new(config.model.clone(), prompt.into_messages());
    request.temperature = config.temperature;
    request.max_tokens = config.max_tokens;

    progress.phase("Researching");
    info!("requesting completion");
    let completion = client.complete(&request).await?;

    let report_path = match &config.output_dir {
        Some(dir) => {
            progress.phase("Saving report");
            let mut report = Report::new(topic.clone(), completion.text.clone());
            if config.front_matter {
                report = report.with_meta(ReportMeta {
                    model: completion.model.clone(),
                    generated_at: Local::now(),
                });
            }
            Some(write_report(dir, &report)?)
        }
        None => None,
    };

    let result = ResearchResult {
        topic,
        completion,
        report_path,
        elapsed: start.elapsed(),
    };

    info!(
        path = ?result.report_path,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "research complete"
    );
    progress.done(&result);

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;
    use researchkit_shared::Role;

    /// Canned client that records every request it receives.
    struct MockClient {
        reply: std::result::Result<String, String>,
        requests: RefCell<Vec<ChatRequest>>,
    }

    impl MockClient {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.into()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn failing(msg: &str) -> Self {
            Self {
                reply: Err(msg.into()),
                requests: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl CompletionClient for MockClient {
        async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
            self.requests.borrow_mut().push(request.clone());
            match &self.reply {
                Ok(text) => Ok(Completion {
                    text: text.clone(),
                    model: request.model.clone(),
                    usage: None,
                }),
                Err(msg) => Err(ResearchError::external_status(500, msg.clone())),
            }
        }
    }

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rk-pipeline-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn config(topic: &str, output_dir: &Path) -> ResearchConfig {
        let mut config = ResearchConfig::from_app_config(&AppConfig::default(), topic);
        config.output_dir = Some(output_dir.to_path_buf());
        config
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .map(|rd| rd.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn writes_one_report_with_title_and_verbatim_body() {
        let tmp = temp_dir();
        let completion = "# Artificial Intelligence\n\n## Summary\nComputers doing clever things.\n";
        let client = MockClient::ok(completion);

        let result = research(&config("Artificial Intelligence", &tmp), &client, &SilentProgress)
            .await
            .expect("research succeeds");

        let files = files_in(&tmp);
        assert_eq!(files.len(), 1);
        assert_eq!(result.report_path.as_deref(), Some(files[0].as_path()));

        let content = std::fs::read_to_string(&files[0]).unwrap();
        let (first_line, rest) = content.split_once('\n').unwrap();
        assert!(first_line.starts_with("# "));
        assert!(first_line.contains("Artificial Intelligence"));
        assert_eq!(rest.strip_prefix('\n').unwrap(), completion);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn title_contains_topic_for_various_topics() {
        for topic in ["Black Holes", "C++ templates", "日本の歴史", "a/b: c?"] {
            let tmp = temp_dir();
            let client = MockClient::ok("body");

            research(&config(topic, &tmp), &client, &SilentProgress)
                .await
                .expect("research succeeds");

            let files = files_in(&tmp);
            assert_eq!(files.len(), 1, "topic {topic}");
            let content = std::fs::read_to_string(&files[0]).unwrap();
            assert!(content.lines().next().unwrap().contains(topic));

            std::fs::remove_dir_all(&tmp).ok();
        }
    }

    #[tokio::test]
    async fn multi_line_topic_stays_on_title_line() {
        let tmp = temp_dir();
        let client = MockClient::ok("body");

        let result = research(&config("Black\nHoles\r\n", &tmp), &client, &SilentProgress)
            .await
            .expect("research succeeds");
        assert_eq!(result.topic.as_str(), "Black Holes");

        let content = std::fs::read_to_string(result.report_path.unwrap()).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("# Black Holes"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("body"));
        assert_eq!(lines.next(), None);

        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn empty_topic_is_invalid_input_and_writes_nothing() {
        let tmp = temp_dir();
        let client = MockClient::ok("unused");

        for topic in ["", "   "] {
            let err = research(&config(topic, &tmp), &client, &SilentProgress)
                .await
                .unwrap_err();
            assert!(matches!(err, ResearchError::InvalidInput { .. }));
        }

        assert_eq!(client.calls(), 0);
        assert!(files_in(&tmp).is_empty());
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn service_failure_propagates_and_writes_nothing() {
        let tmp = temp_dir();
        let client = MockClient::failing("boom");

        let err = research(&config("Black Holes", &tmp), &client, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::ExternalService { status: Some(500), .. }));
        assert_eq!(client.calls(), 1, "no retry");
        assert!(files_in(&tmp).is_empty());
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn unwritable_output_dir_surfaces_io_error() {
        let tmp = temp_dir();
        let blocker = tmp.join("not-a-dir");
        std::fs::write(&blocker, "occupied").unwrap();
        let client = MockClient::ok("summary");

        let err = research(&config("Black Holes", &blocker), &client, &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, ResearchError::Io { .. }), "got {err:?}");
        assert_eq!(client.calls(), 1);
        assert_eq!(files_in(&tmp), vec![blocker.clone()]);
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "occupied");
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn bullets_out_of_range_fail_before_network() {
        let tmp = temp_dir();
        let client = MockClient::ok("unused");

        for bullets in [0, 11] {
            let mut cfg = config("Black Holes", &tmp);
            cfg.bullets = bullets;
            let err = research(&cfg, &client, &SilentProgress).await.unwrap_err();
            assert!(matches!(err, ResearchError::InvalidInput { .. }));
        }

        assert_eq!(client.calls(), 0);
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn print_only_writes_nothing() {
        let tmp = temp_dir();
        let client = MockClient::ok("summary");
        let mut cfg = config("Black Holes", &tmp);
        cfg.output_dir = None;

        let result = research(&cfg, &client, &SilentProgress).await.unwrap();

        assert!(result.report_path.is_none());
        assert_eq!(result.completion.text, "summary");
        assert!(files_in(&tmp).is_empty());
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn request_carries_prompt_and_settings() {
        let tmp = temp_dir();
        let client = MockClient::ok("ok");
        let mut cfg = config("  Black Holes  ", &tmp);
        cfg.bullets = 7;

        let result = research(&cfg, &client, &SilentProgress).await.unwrap();
        assert_eq!(result.topic.as_str(), "Black Holes");

        let requests = client.requests.borrow();
        let req = &requests[0];
        assert_eq!(req.model, "gpt-4o-mini");
        assert_eq!(req.max_tokens, Some(1000));
        assert_eq!(req.messages[0].role, Role::System);
        assert!(req.messages[1].content.contains("topic: Black Holes"));
        assert!(req.messages[1].content.contains("exactly 7 key bullet points"));
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[tokio::test]
    async fn front_matter_follows_title() {
        let tmp = temp_dir();
        let client = MockClient::ok("body text");
        let mut cfg = config("Mars", &tmp);
        cfg.front_matter = true;

        let result = research(&cfg, &client, &SilentProgress).await.unwrap();
        let content = std::fs::read_to_string(result.report_path.unwrap()).unwrap();

        assert!(content.starts_with("# Mars\n\n---\ntopic: \"Mars\"\n"));
        assert!(content.contains("model: \"gpt-4o-mini\"\n"));
        assert!(content.ends_with("---\n\nbody text"));
        std::fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn bullet_bounds() {
        assert!(validate_bullets(1).is_ok());
        assert!(validate_bullets(10).is_ok());
        assert!(validate_bullets(0).is_err());
        assert!(validate_bullets(11).is_err());
    }
}
