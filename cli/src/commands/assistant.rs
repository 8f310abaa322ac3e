use serde_json::{Value, json};

use crate::util::{api_request, exit_error, read_json_from_file};

pub async fn chat(api_url: &str, message: &str, context_file: Option<&str>, raw: bool) -> i32 {
    let context = match context_file {
        Some(path) => match read_json_from_file(path) {
            Ok(value @ Value::Array(_)) => value,
            Ok(_) => exit_error(
                &format!("Context in '{path}' must be a JSON array"),
                Some(r#"Example: [{"role": "user", "content": "Is the river rising?"}]"#),
            ),
            Err(e) => exit_error(&e, None),
        },
        None => json!([]),
    };

    let body = chat_body(message, context);
    api_request(api_url, reqwest::Method::POST, "/api/chat", Some(body), raw).await
}

pub async fn analyze(api_url: &str, data_file: Option<&str>, raw: bool) -> i32 {
    let body = match data_file {
        Some(path) => match read_json_from_file(path) {
            Ok(value @ Value::Object(_)) => value,
            Ok(_) => exit_error(
                &format!("Analysis data in '{path}' must be a JSON object"),
                Some(r#"Example: {"metrics": [...], "sensors": [{"status": "active"}]}"#),
            ),
            Err(e) => exit_error(&e, None),
        },
        None => json!({}),
    };

    api_request(api_url, reqwest::Method::POST, "/api/analysis", Some(body), raw).await
}

fn chat_body(message: &str, context: Value) -> Value {
    json!({
        "message": message,
        "context": context
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_body_carries_message_and_context() {
        let body = chat_body(
            "what is the water level",
            json!([{"role": "user", "content": "hello"}]),
        );
        assert_eq!(body["message"], "what is the water level");
        assert_eq!(body["context"][0]["content"], "hello");
    }
}
