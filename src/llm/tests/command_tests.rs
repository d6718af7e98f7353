use super::*;

fn sh(script: &str) -> CommandProvider {
    let config = CommandProviderConfig::new("sh").with_args(vec!["-c".into(), script.into()]);
    CommandProvider::new(config).unwrap()
}

#[test]
fn test_missing_command_fails_at_construction() {
    let result = CommandProvider::new(CommandProviderConfig::new(
        "specflow-definitely-missing-binary",
    ));
    assert!(result.is_err());
}

#[test]
fn test_prompt_placeholder_is_substituted() {
    let provider = CommandProvider::new(
        CommandProviderConfig::new("sh").with_args(vec!["-p".into(), "ask: {prompt}".into()]),
    )
    .unwrap();
    let (args, stdin) = provider.render_args("hi");
    assert_eq!(args, vec!["-p".to_string(), "ask: hi".to_string()]);
    assert!(stdin.is_none());
}

#[test]
fn test_prompt_goes_to_stdin_without_placeholder() {
    let provider = sh("cat");
    let (args, stdin) = provider.render_args("hi");
    assert_eq!(args, vec!["-c".to_string(), "cat".to_string()]);
    assert_eq!(stdin.as_deref(), Some("hi"));
}

#[tokio::test]
async fn test_stdin_prompt_is_echoed() {
    let provider = sh("cat");
    let text = provider.generate(&LlmRequest::new("## Echo")).await.unwrap();
    assert_eq!(text, "## Echo\n");
}

#[tokio::test]
async fn test_stream_yields_lines_then_done() {
    let provider = sh("printf 'a\\nb\\n'");
    let request = LlmRequest::new("ignored");
    let chunks: Vec<LlmChunk> = provider
        .generate_stream(&request)
        .map(|c| c.unwrap())
        .collect()
        .await;
    assert_eq!(
        chunks,
        vec![
            LlmChunk::Delta("a\n".into()),
            LlmChunk::Delta("b\n".into()),
            LlmChunk::Done
        ]
    );
}

#[tokio::test]
async fn test_non_zero_exit_reports_stderr() {
    let provider = sh("echo partial; echo quota exceeded >&2; exit 3");
    let err = provider
        .generate(&LlmRequest::new("x"))
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("quota exceeded"), "{message}");
}

#[tokio::test]
async fn test_request_options_are_exported_as_env() {
    let provider = sh("echo \"$SPECFLOW_MODEL/$SPECFLOW_MAX_TOKENS\"");
    let request = LlmRequest {
        prompt: "x".into(),
        model: Some("large".into()),
        temperature: None,
        max_tokens: Some(512),
    };
    let text = provider.generate(&request).await.unwrap();
    assert_eq!(text.trim(), "large/512");
}

#[tokio::test]
async fn test_timeout_kills_process() {
    let config = CommandProviderConfig::new("sh")
        .with_args(vec!["-c".into(), "sleep 5".into()])
        .with_timeout(Duration::from_millis(200));
    let provider = CommandProvider::new(config).unwrap();
    let err = provider
        .generate(&LlmRequest::new("x"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timeout"));
}
