//! Integration tests for the dataeng-chat library.
//!
//! The `local_*` tests drive the real client against a one-shot HTTP server on
//! loopback. The `live_*` tests require GROQ_API_KEY in the environment.

#[cfg(test)]
mod tests {
    use dataeng_chat::chat::{ChatSession, Renderer};
    use dataeng_chat::{
        CompletionRequest, Groq, KnownModel, Message, MessageRole, ModelSpec, consume,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[derive(Default)]
    struct Capture {
        text: String,
        errors: Vec<String>,
        finished: usize,
    }

    impl Renderer for Capture {
        fn start_response(&mut self, _: &ModelSpec) {}

        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
        }

        fn finish_response(&mut self) {
            self.finished += 1;
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_info(&mut self, _: &str) {}

        fn print_message(&mut self, _: &Message) {}
    }

    /// Serves exactly one request with `status` and `body`, returning the base
    /// URL and a handle yielding the raw request text.
    async fn serve_once(
        status: &'static str,
        content_type: &'static str,
        body: String,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (format!("http://{addr}/openai/v1"), handle)
    }

    async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn sse_body(fragments: &[&str]) -> String {
        let mut body = String::new();
        body.push_str(": keep-alive\n\n");
        for fragment in fragments {
            let chunk = serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion.chunk",
                "model": "qwen-qwq-32b",
                "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}],
            });
            body.push_str(&format!("data: {chunk}\n\n"));
        }
        let last = serde_json::json!({
            "id": "chatcmpl-1",
            "choices": [{"index": 0, "delta": {}, "finish_reason": "stop"}],
            "x_groq": {"id": "req_1", "usage": {"prompt_tokens": 42, "completion_tokens": 7, "total_tokens": 49}},
        });
        body.push_str(&format!("data: {last}\n\n"));
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[tokio::test]
    async fn local_stream_round_trip() {
        let (base_url, server) = serve_once(
            "200 OK",
            "text/event-stream",
            sse_body(&["Spark splits", " data into", " partitions."]),
        )
        .await;
        let client =
            Groq::with_options(Some("gsk_test".to_string()), Some(base_url), None).unwrap();

        let mut session = ChatSession::new(client);
        session.select_model(KnownModel::QwenQwq32b);
        let mut renderer = Capture::default();
        session
            .send_streaming("Explain partitioning in Spark", &mut renderer)
            .await
            .unwrap();

        assert_eq!(renderer.text, "Spark splits data into partitions.");
        assert_eq!(renderer.finished, 1);
        let roles: Vec<MessageRole> = session.conversation().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );
        let stats = session.stats();
        assert_eq!(stats.total_prompt_tokens, 42);
        assert_eq!(stats.total_completion_tokens, 7);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /openai/v1/chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer gsk_test"));
        assert!(request.contains(r#""model":"qwen-qwq-32b""#));
        assert!(request.contains(r#""stream":true"#));
        assert!(request.contains(r#""max_tokens":8192"#));
    }

    #[tokio::test]
    async fn local_http_error_becomes_notice() {
        let body = serde_json::json!({
            "error": {
                "message": "The model `compound-beta` has been decommissioned",
                "type": "invalid_request_error",
            }
        })
        .to_string();
        let (base_url, server) = serve_once("400 Bad Request", "application/json", body).await;
        let client =
            Groq::with_options(Some("gsk_test".to_string()), Some(base_url), None).unwrap();

        let mut session = ChatSession::new(client);
        session.select_model(KnownModel::CompoundBeta);
        let mut renderer = Capture::default();
        let err = session
            .send_streaming("hello", &mut renderer)
            .await
            .unwrap_err();

        assert!(err.is_bad_request());
        assert_eq!(renderer.errors.len(), 1);
        assert!(renderer.errors[0].contains("decommissioned"));
        assert!(renderer.text.is_empty());
        assert_eq!(session.message_count(), 2);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn local_unauthorized_is_authentication_error() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        let (base_url, server) =
            serve_once("401 Unauthorized", "application/json", body.to_string()).await;
        let client =
            Groq::with_options(Some("gsk_bad".to_string()), Some(base_url), None).unwrap();

        let request = CompletionRequest::new(
            KnownModel::Llama4Scout.spec().identifier,
            vec![Message::user("hi")],
            512,
        );
        let err = match client.stream(&request).await {
            Ok(_) => panic!("expected an authentication error"),
            Err(err) => err,
        };
        assert!(err.is_authentication());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn live_streaming_response() {
        let api_key = std::env::var("GROQ_API_KEY").ok();
        if api_key.is_none() {
            eprintln!("Skipping test: GROQ_API_KEY not set");
            return;
        }

        let client = Groq::new(api_key).expect("Failed to create client");
        let request = CompletionRequest::new(
            KnownModel::Llama4Scout.spec().identifier,
            vec![Message::user("Count to 3")],
            512,
        );

        let stream = client.stream(&request).await.expect("stream should open");
        let mut renderer = Capture::default();
        let outcome = consume(stream, &mut renderer).await.expect("stream should finish");
        assert_eq!(outcome.text, renderer.text);
        assert!(!outcome.text.is_empty());
    }
}
