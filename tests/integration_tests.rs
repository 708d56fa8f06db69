//! Integration tests for the logging pipeline
//!
//! These tests verify:
//! - Builder validation and fail-fast behavior
//! - Per-sink level filtering
//! - Redaction end to end
//! - Rotation at the size boundary
//! - Sink failure isolation
//! - Graceful shutdown and drain

use logpipe::prelude::*;
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Custom sink collecting every payload, shared with the test body
struct CollectingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Sink for CollectingSink {
    fn name(&self) -> &str {
        "collector"
    }

    fn write(&mut self, _level: Level, payload: &[u8]) -> Result<(), SinkError> {
        self.lines
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(payload).into_owned());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Build a pipeline with one collecting custom sink plus any extra handlers
fn collector_pipeline(
    config: Config,
    lines: Arc<Mutex<Vec<String>>>,
) -> Pipeline {
    let config = config.with_handler(HandlerConfig::new(HandlerKind::Custom {
        name: "collector".to_string(),
    }));
    PipelineBuilder::new()
        .register_sink("collector", move |_| {
            Ok(Box::new(CollectingSink {
                lines: Arc::clone(&lines),
            }))
        })
        .build(config)
        .expect("valid config")
}

#[test]
fn test_global_level_gate() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = collector_pipeline(
        Config::new().with_min_level(Level::Warn).with_format(OutputFormat::Text),
        Arc::clone(&lines),
    );

    pipeline.debug("app", "debug message");
    pipeline.info("app", "info message");
    pipeline.warn("app", "warn message");
    pipeline.error("app", "error message");
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("warn message"));
    assert!(lines[1].contains("error message"));
}

#[test]
fn test_per_sink_level_overrides_global() {
    let temp = TempDir::new().unwrap();
    let quiet = temp.path().join("quiet.log");
    let chatty = temp.path().join("chatty.log");

    let config = Config::new()
        .with_min_level(Level::Debug)
        .with_format(OutputFormat::Text)
        .with_handler(
            HandlerConfig::new(HandlerKind::File {
                path: quiet.clone(),
                rotation: RotationPolicy::default(),
            })
            .with_level(Level::Error),
        )
        .with_handler(HandlerConfig::new(HandlerKind::File {
            path: chatty.clone(),
            rotation: RotationPolicy::default(),
        }));

    let mut pipeline = build_pipeline(config).unwrap();
    pipeline.debug("app", "low severity");
    pipeline.error("app", "high severity");
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let quiet_content = fs::read_to_string(&quiet).unwrap();
    let chatty_content = fs::read_to_string(&chatty).unwrap();

    assert!(!quiet_content.contains("low severity"));
    assert!(quiet_content.contains("high severity"));
    assert!(chatty_content.contains("low severity"));
    assert!(chatty_content.contains("high severity"));
}

#[test]
fn test_redaction_scenario_json() {
    // Spec scenario: redact ["password"], json format, email survives
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = collector_pipeline(
        Config::new().with_redact_fields(vec!["password".to_string()]),
        Arc::clone(&lines),
    );

    pipeline.emit(
        Record::new(Level::Info, "signup")
            .with_logger("app.auth")
            .with_attr("email", "a@b.com")
            .with_attr("password", "secret"),
    );
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 1);
    let parsed: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    assert_eq!(parsed["password"], "[REDACTED]");
    assert_eq!(parsed["email"], "a@b.com");
    assert!(!lines[0].contains("secret"));
}

#[test]
fn test_redaction_applies_to_every_sink_and_format() {
    let temp = TempDir::new().unwrap();
    let text_log = temp.path().join("text.log");

    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = collector_pipeline(
        Config::new()
            .with_redact_fields(vec!["token".to_string()])
            .with_handler(
                HandlerConfig::new(HandlerKind::File {
                    path: text_log.clone(),
                    rotation: RotationPolicy::default(),
                })
                .with_format(OutputFormat::Text),
            ),
        Arc::clone(&lines),
    );

    pipeline.emit(
        Record::new(Level::Info, "auth").with_attr("token", "tok-123456"),
    );
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let lines = lines.lock().unwrap();
    let json_line = &lines[0];
    let text_line = fs::read_to_string(&text_log).unwrap();
    assert!(!json_line.contains("tok-123456"));
    assert!(!text_line.contains("tok-123456"));
    assert!(json_line.contains("[REDACTED]"));
    assert!(text_line.contains("[REDACTED]"));
}

#[test]
fn test_rotation_scenario_exactly_one_rollover() {
    // Equal-sized records crossing the size threshold once: one rotation,
    // two files afterward, every record accounted for
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("rotate.log");

    let config = Config::new()
        .with_format(OutputFormat::Text)
        .with_handler(HandlerConfig::new(HandlerKind::File {
            path: path.clone(),
            rotation: RotationPolicy::new()
                .with_strategy(RotationStrategy::size(1300))
                .with_max_backups(5),
        }));

    let mut pipeline = build_pipeline(config).unwrap();

    // Each text line is 43 bytes (24-char timestamp, padded level, "app"
    // logger, fixed-width message, newline): 30 fit under 1300
    for i in 0..50 {
        pipeline.info("app", format!("rec {:02}", i));
    }
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let mut files: Vec<_> = fs::read_dir(temp.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with("rotate.log"))
        .collect();
    files.sort();

    assert_eq!(files, vec!["rotate.log", "rotate.log.1"]);

    let total_lines = files
        .iter()
        .map(|f| {
            fs::read_to_string(temp.path().join(f))
                .unwrap()
                .lines()
                .count()
        })
        .sum::<usize>();
    assert_eq!(total_lines, 50, "no record lost or duplicated across rotation");
}

#[test]
fn test_fatal_sink_does_not_affect_others() {
    // Spec scenario: remote sink goes fatal, co-configured sink keeps working
    struct DeadTransport;
    impl Transport for DeadTransport {
        fn send(&mut self, _payload: &[u8]) -> Result<(), SinkError> {
            Err(SinkError::fatal("collector rejected credentials"))
        }
    }

    let lines = Arc::new(Mutex::new(Vec::new()));
    let lines_clone = Arc::clone(&lines);

    let config = Config::new()
        .with_handler(HandlerConfig::new(HandlerKind::Remote {
            params: RemoteParams {
                endpoint: "https://logs.example.com/ingest".to_string(),
                token: Some("bad".to_string()),
                timeout: Duration::from_secs(1),
            },
        }))
        .with_handler(HandlerConfig::new(HandlerKind::Custom {
            name: "collector".to_string(),
        }));

    let mut pipeline = PipelineBuilder::new()
        .register_transport(|_| Ok(Box::new(DeadTransport)))
        .register_sink("collector", move |_| {
            Ok(Box::new(CollectingSink {
                lines: Arc::clone(&lines_clone),
            }))
        })
        .build(config)
        .unwrap();

    pipeline.info("app", "first");
    std::thread::sleep(Duration::from_millis(100));
    pipeline.info("app", "second");
    pipeline.info("app", "third");
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    // The healthy sink received everything
    assert_eq!(lines.lock().unwrap().len(), 3);
    // The remote sink tripped its health flag and was counted
    assert!(pipeline.metrics().sink_fatal_events() >= 1);
}

#[test]
fn test_transient_remote_errors_retried_until_delivered() {
    struct FlakyTransport {
        failures_left: usize,
        delivered: Arc<Mutex<Vec<Vec<u8>>>>,
    }
    impl Transport for FlakyTransport {
        fn send(&mut self, payload: &[u8]) -> Result<(), SinkError> {
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(SinkError::transient("503 from collector"));
            }
            self.delivered.lock().unwrap().push(payload.to_vec());
            Ok(())
        }
    }

    let delivered = Arc::new(Mutex::new(Vec::new()));
    let delivered_clone = Arc::clone(&delivered);

    let config = Config::new()
        .with_retry(RetryPolicy {
            max_retries: 3,
            backoff: Duration::from_millis(1),
        })
        .with_handler(HandlerConfig::new(HandlerKind::Remote {
            params: RemoteParams {
                endpoint: "https://logs.example.com/ingest".to_string(),
                token: None,
                timeout: Duration::from_secs(1),
            },
        }));

    let mut pipeline = PipelineBuilder::new()
        .register_transport(move |_| {
            Ok(Box::new(FlakyTransport {
                failures_left: 2,
                delivered: Arc::clone(&delivered_clone),
            }))
        })
        .build(config)
        .unwrap();

    pipeline.info("app", "survives two 503s");
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    assert_eq!(delivered.lock().unwrap().len(), 1);
    assert_eq!(pipeline.metrics().retry_exhausted(), 0);
}

#[test]
fn test_single_producer_ordering_preserved() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = collector_pipeline(
        Config::new().with_format(OutputFormat::Text),
        Arc::clone(&lines),
    );

    for i in 0..200 {
        pipeline.info("app", format!("seq-{:04}", i));
    }
    assert!(pipeline.shutdown(Duration::from_secs(5)));

    let lines = lines.lock().unwrap();
    assert_eq!(lines.len(), 200);
    for (i, line) in lines.iter().enumerate() {
        assert!(
            line.contains(&format!("seq-{:04}", i)),
            "record {} out of order: {}",
            i,
            line
        );
    }
}

#[test]
fn test_shutdown_drains_pending_records() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drain.log");

    let config = Config::new()
        .with_format(OutputFormat::Text)
        .with_handler(HandlerConfig::new(HandlerKind::File {
            path: path.clone(),
            rotation: RotationPolicy::default(),
        }));

    let mut pipeline = build_pipeline(config).unwrap();
    for i in 0..100 {
        pipeline.info("app", format!("pending {}", i));
    }
    assert!(pipeline.shutdown(Duration::from_secs(5)));

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 100);
}

#[test]
fn test_drop_on_shutdown_also_drains() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("drop.log");

    {
        let config = Config::new()
            .with_format(OutputFormat::Text)
            .with_handler(HandlerConfig::new(HandlerKind::File {
                path: path.clone(),
                rotation: RotationPolicy::default(),
            }));
        let pipeline = build_pipeline(config).unwrap();
        for i in 0..10 {
            pipeline.info("app", format!("message {}", i));
        }
        // Pipeline drops here
    }

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 10);
}

#[test]
fn test_message_injection_prevented_end_to_end() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("inject.log");

    let config = Config::new()
        .with_format(OutputFormat::Text)
        .with_handler(HandlerConfig::new(HandlerKind::File {
            path: path.clone(),
            rotation: RotationPolicy::default(),
        }));

    let mut pipeline = build_pipeline(config).unwrap();
    pipeline.info("app", "User login\nERROR fake injected line");
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("\\n"));
}

#[test]
fn test_reserved_key_collision_counted() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = collector_pipeline(Config::new(), Arc::clone(&lines));

    pipeline.emit(
        Record::new(Level::Info, "genuine message")
            .with_logger("app")
            .with_attr("message", "forged message")
            .with_attr("level", "FORGED"),
    );
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let parsed: serde_json::Value =
        serde_json::from_str(&lines.lock().unwrap()[0]).unwrap();
    assert_eq!(parsed["message"], "genuine message");
    assert_eq!(parsed["level"], "INFO");
    assert_eq!(pipeline.metrics().attr_collisions(), 2);
}

#[test]
fn test_error_info_serialized_as_nested_object() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let mut pipeline = collector_pipeline(Config::new(), Arc::clone(&lines));

    pipeline.emit(
        Record::new(Level::Error, "request failed")
            .with_logger("app.http")
            .with_error(
                ErrorInfo::new("connection reset")
                    .with_frame("handle_request")
                    .with_frame("read_body"),
            ),
    );
    assert!(pipeline.shutdown(Duration::from_secs(2)));

    let parsed: serde_json::Value =
        serde_json::from_str(&lines.lock().unwrap()[0]).unwrap();
    assert_eq!(parsed["error"]["message"], "connection reset");
    assert_eq!(parsed["error"]["stack"][0], "handle_request");
    assert_eq!(parsed["error"]["stack"][1], "read_body");
}

#[test]
fn test_builder_fail_fast_leaves_no_files() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("never_created.log");

    let config = Config::new()
        .with_queue_capacity(0) // invalid
        .with_handler(HandlerConfig::new(HandlerKind::File {
            path: path.clone(),
            rotation: RotationPolicy::default(),
        }));

    assert!(build_pipeline(config).is_err());
    assert!(!path.exists(), "fail-fast build must not open files");
}
