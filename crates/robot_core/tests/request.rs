use pretty_assertions::assert_eq;
use robot_core::{
    assemble_headers, basic_auth, build_url, check_input, check_output, set_header, ErrorCode,
    ExpectedContent, HeaderMap, Operation, Payload, RequestDescriptor, StaticConfiguration,
    API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
use serde_json::json;

fn config() -> StaticConfiguration {
    StaticConfiguration::new("robot", "secret").with_user_agent("Tests/1.0")
}

#[test]
fn descriptor_defaults_require_auth_with_timeout() {
    let descriptor = RequestDescriptor::new(Operation::Get, ExpectedContent::JsonArray);
    assert!(descriptor.requires_auth);
    assert_eq!(descriptor.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    assert_eq!(descriptor.url().unwrap().as_str(), format!("{API_BASE_URL}/"));
}

#[test]
fn url_joins_path_and_query() {
    let query = vec![
        ("server_ip".to_string(), "1.2.3.4".to_string()),
        ("note".to_string(), "a b".to_string()),
    ];
    let url = build_url(API_BASE_URL, "/server", &query).unwrap();
    assert_eq!(
        url.as_str(),
        "https://robot-ws.your-server.de/server?server_ip=1.2.3.4&note=a+b"
    );
}

#[test]
fn relative_path_is_an_invalid_url() {
    let err = build_url(API_BASE_URL, "server", &[]).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRequestUrl);
    assert_eq!(err.text, "https://robot-ws.your-server.deserver");
}

#[test]
fn unparseable_url_reports_the_url_string() {
    let err = build_url("https://bad host", "/x", &[]).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidRequestUrl);
    assert_eq!(err.text, "https://bad host/x");
}

#[test]
fn headers_include_agent_accept_and_credentials() {
    let mut descriptor = RequestDescriptor::new(Operation::Post, ExpectedContent::JsonObject);
    descriptor.payload = Payload::json(&json!({"name": "web-1"}));
    descriptor
        .headers
        .insert("X-Trace".to_string(), "abc".to_string());

    let headers = assemble_headers(&descriptor, &config());

    let mut expected = HeaderMap::new();
    expected.insert("User-Agent".into(), "Tests/1.0".into());
    expected.insert("Accept".into(), "application/json".into());
    expected.insert("X-Trace".into(), "abc".into());
    expected.insert("Content-Type".into(), "application/json".into());
    expected.insert("Authorization".into(), "Basic cm9ib3Q6c2VjcmV0".into());
    assert_eq!(headers, expected);
}

#[test]
fn endpoint_headers_override_defaults_case_insensitively() {
    let mut descriptor = RequestDescriptor::new(Operation::Get, ExpectedContent::Empty);
    descriptor.requires_auth = false;
    descriptor
        .headers
        .insert("user-agent".to_string(), "Override/2".to_string());

    let headers = assemble_headers(&descriptor, &config());
    assert_eq!(headers.len(), 1);
    assert_eq!(headers.get("user-agent").map(String::as_str), Some("Override/2"));
    assert!(!headers.contains_key("Accept"));
    assert!(!headers.contains_key("Authorization"));
}

#[test]
fn set_header_replaces_existing_names() {
    let mut headers = HeaderMap::new();
    set_header(&mut headers, "accept", "text/plain");
    set_header(&mut headers, "Accept", "application/json");
    assert_eq!(headers.len(), 1);
    assert_eq!(headers["Accept"], "application/json");
}

#[test]
fn basic_auth_encodes_user_and_password() {
    assert_eq!(basic_auth("Aladdin", "open sesame"), "Basic QWxhZGRpbjpvcGVuIHNlc2FtZQ==");
}

#[test]
fn form_payload_is_url_encoded() {
    let payload = Payload::form(&[("server_name".to_string(), "web 1".to_string())]);
    assert_eq!(payload.body, b"server_name=web+1");
    assert_eq!(payload.content_type, "application/x-www-form-urlencoded");
    assert!(Payload::default().is_empty());
}

#[test]
fn only_post_and_put_carry_a_body() {
    assert!(Operation::Post.carries_body());
    assert!(Operation::Put.carries_body());
    assert!(!Operation::Get.carries_body());
    assert!(!Operation::Head.carries_body());
    assert!(!Operation::Delete.carries_body());
    assert_eq!(Operation::Delete.as_str(), "DELETE");
}

#[test]
fn input_check_requires_username_then_password() {
    let missing_user = StaticConfiguration::new("", "");
    assert_eq!(
        check_input(true, &missing_user).unwrap_err().code,
        ErrorCode::MissingUser
    );
    let missing_password = StaticConfiguration::new("robot", "");
    assert_eq!(
        check_input(true, &missing_password).unwrap_err().code,
        ErrorCode::MissingPassword
    );
    assert!(check_input(false, &missing_user).is_ok());
    assert!(check_input(true, &config()).is_ok());
}

#[test]
fn output_check_classifies_bodies() {
    let code = |expected, body: &[u8]| check_output(expected, body).unwrap_err().code;

    assert_eq!(code(ExpectedContent::JsonArray, b""), ErrorCode::EmptyReply);
    assert_eq!(code(ExpectedContent::JsonArray, b"[]"), ErrorCode::EmptyJson);
    assert_eq!(code(ExpectedContent::JsonArray, b"{}"), ErrorCode::WrongOutputType);
    assert_eq!(code(ExpectedContent::JsonArray, b"null"), ErrorCode::EmptyJson);
    assert_eq!(code(ExpectedContent::JsonObject, b"[1]"), ErrorCode::WrongOutputType);
    assert_eq!(code(ExpectedContent::JsonObject, b"{}"), ErrorCode::EmptyJson);
    assert_eq!(code(ExpectedContent::JsonObject, b"42"), ErrorCode::WrongOutputType);
    assert_eq!(code(ExpectedContent::JsonObject, b"{oops"), ErrorCode::JsonParseError);
}

#[test]
fn parse_errors_carry_parser_message() {
    let err = check_output(ExpectedContent::JsonArray, b"[1,").unwrap_err();
    assert_eq!(err.code, ErrorCode::JsonParseError);
    assert!(!err.text.is_empty());
    assert!(err.to_string().starts_with("Failed to parse the received JSON data: "));
}

#[test]
fn output_check_decodes_documents() {
    let value = check_output(ExpectedContent::JsonArray, br#"[{"server":{"id":1}}]"#).unwrap();
    assert_eq!(value, json!([{"server": {"id": 1}}]));

    let value = check_output(ExpectedContent::JsonObject, br#"{"ok":true}"#).unwrap();
    assert_eq!(value, json!({"ok": true}));

    // No content expected: the body is ignored.
    let value = check_output(ExpectedContent::Empty, b"whatever").unwrap();
    assert_eq!(value, serde_json::Value::Null);
}
