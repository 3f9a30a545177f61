use echoharness::common::{spawn_http_test_server, spawn_websocket_test_server};
use echoharness::http::{EchoRequest, EchoResponse, HttpConfig, HttpEchoClient};
use echoharness::websocket::{WebSocketConfig, WebSocketEchoClient};
use http::Method;
use proptest::prelude::*;

fn echo_method() -> impl Strategy<Value = Method> {
    prop_oneof![
        Just(Method::GET),
        Just(Method::POST),
        Just(Method::PUT),
        Just(Method::PATCH),
        Just(Method::DELETE),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: method, path and body come back unchanged, every header sent is present
    #[test]
    fn http_echo_preserves_request(
        method in echo_method(),
        body in "[ -~]{0,512}",
        headers in prop::collection::vec(("X-[A-Za-z]{1,12}", "[!-~]{1,24}"), 0..8),
    ) {
        tokio_test::block_on(async {
            let server = spawn_http_test_server(HttpConfig::default()).await
                .map_err(|e| TestCaseError::fail(format!("Server setup failed: {e}")))?;
            let mut client = HttpEchoClient::connect(server.addr).await
                .map_err(|e| TestCaseError::fail(format!("Client connection failed: {e}")))?;

            let sent: Vec<(&str, &str)> = headers.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
            let record = client.echo_record(method.clone(), &sent, body.as_bytes()).await
                .map_err(|e| TestCaseError::fail(format!("Echo failed: {e}")))?;

            server.handle.abort();

            prop_assert_eq!(record.method.as_str(), method.as_str());
            prop_assert_eq!(record.path.as_str(), "/api/Tags/tag-crime");
            prop_assert_eq!(&record.body, &body);
            for (name, value) in &headers {
                let echoed = record.headers.get(name);
                prop_assert!(echoed.is_some(), "header {} missing", name);
                // Repeated names are folded, so the sent value appears within the joined one
                prop_assert!(echoed.unwrap_or_default().contains(value.as_str()));
            }
            Ok(())
        })?;
    }

    /// Property: the parser yields the same request however the bytes are split
    #[test]
    fn http_parse_is_split_independent(
        body in prop::collection::vec(any::<u8>(), 0..256),
        split in 0usize..512,
    ) {
        let mut raw = format!(
            "POST /api/Tags/tag-crime HTTP/1.1\r\nHost: test\r\nContent-Length: {}\r\n\r\n",
            body.len()
        ).into_bytes();
        raw.extend_from_slice(&body);
        let split = split.min(raw.len());

        let whole = EchoRequest::parse(&raw).unwrap();
        prop_assert!(whole.is_some());
        let (request, used) = whole.unwrap();
        prop_assert_eq!(used, raw.len());
        prop_assert_eq!(&request.body[..], &body[..]);

        if split < raw.len() {
            prop_assert!(EchoRequest::parse(&raw[..split]).unwrap().is_none());
        }
    }

    /// Property: the JSON record always carries exactly the four keys
    #[test]
    fn echo_record_is_structurally_complete(
        body in prop::collection::vec(any::<u8>(), 0..128),
        path_suffix in "[a-z]{0,8}",
    ) {
        let mut raw = format!(
            "PATCH /{path_suffix}?q=1 HTTP/1.1\r\nContent-Length: {}\r\n\r\n",
            body.len()
        ).into_bytes();
        raw.extend_from_slice(&body);

        let (request, _) = EchoRequest::parse(&raw).unwrap().unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&EchoResponse::from_request(&request).to_json().unwrap()).unwrap();
        let object = json.as_object().unwrap();

        prop_assert_eq!(object.len(), 4);
        let expected = format!("/{path_suffix}");
        prop_assert_eq!(json["path"].as_str(), Some(expected.as_str()));
        prop_assert!(json["headers"].is_object());
        prop_assert!(json["body"].is_string());
    }

    /// Property: every text frame gets exactly one ack, in order
    #[test]
    fn websocket_acks_every_frame(messages in prop::collection::vec(".{0,64}", 1..16)) {
        tokio_test::block_on(async {
            let server = spawn_websocket_test_server(WebSocketConfig::default()).await
                .map_err(|e| TestCaseError::fail(format!("Server setup failed: {e}")))?;
            let mut client = WebSocketEchoClient::connect(server.addr).await
                .map_err(|e| TestCaseError::fail(format!("Client connection failed: {e}")))?;

            let mut replies = Vec::new();
            for message in &messages {
                let reply = client.send_text(message).await
                    .map_err(|e| TestCaseError::fail(format!("Send failed: {e}")))?;
                replies.push(reply);
            }
            client.close().await
                .map_err(|e| TestCaseError::fail(format!("Close failed: {e}")))?;

            server.handle.abort();

            prop_assert_eq!(replies.len(), messages.len());
            prop_assert!(replies.iter().all(|reply| reply == "ack"));
            Ok(())
        })?;
    }
}
