use std::sync::Arc;

use anyhow::Result;
use llm_relay::providers::types::tool::Tool;
use llm_relay::tool::ToolBox;
use llm_relay::{Agent, ClientConfig, Completion};
use mockito::{Matcher, Server};
use serde_json::json;

fn config(provider: &str, server: &Server) -> ClientConfig {
    ClientConfig {
        provider: provider.to_string(),
        base_url: server.url(),
        timeout_secs: 5,
        ..Default::default()
    }
}

fn lookup_tools() -> Arc<ToolBox> {
    Arc::new(ToolBox::new().with_function(
        Tool::new(
            "lookup",
            "Look a value up",
            json!({
                "type": "object",
                "properties": {"q": {"type": "string"}},
                "required": ["q"]
            }),
        ),
        |args| {
            assert_eq!(args, &json!({"q": "x"}));
            Ok(json!("42"))
        },
    ))
}

#[test]
fn test_ollama_tool_loop() -> Result<()> {
    let mut server = Server::new();

    let first = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "tools": [{"type": "function", "function": {"name": "lookup"}}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "message": {
                    "role": "assistant",
                    "content": "",
                    "tool_calls": [{"function": {"name": "lookup", "arguments": {"q": "x"}}}]
                },
                "done": true
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let second = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""role":"tool""#.to_string()),
            Matcher::Regex(r#""content":"42""#.to_string()),
            Matcher::Regex(r#""tool_name":"lookup""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "message": {
                    "role": "assistant",
                    "content": "<think>\nx is 42\n</think>\n\nThe answer is 42."
                },
                "done": true
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let agent = Agent::new(config("ollama", &server))?.with_tools(lookup_tools());
    let completion = agent.generate("What is x?", Some("Use tools."), None);

    assert_eq!(completion, Completion::success("The answer is 42."));
    first.assert();
    second.assert();
    Ok(())
}

#[test]
fn test_lmstudio_tool_loop() -> Result<()> {
    let mut server = Server::new();

    let first = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::Regex(r#""name":"kv_lookup""#.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_abc123",
                            "type": "function",
                            "function": {"name": "kv_lookup", "arguments": "{\"q\":\"x\"}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let second = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""tool_call_id":"call_abc123""#.to_string()),
            Matcher::Regex(r#""arguments":"\{\\"q\\":\\"x\\"\}""#.to_string()),
            Matcher::Regex(r#""content":"42""#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "x is 42."},
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .expect(1)
        .create();

    let tools = Arc::new(ToolBox::new().with_function(
        Tool::new("kv.lookup", "Look a key up", json!({"type": "object"})),
        |args| {
            assert_eq!(args, &json!({"q": "x"}));
            Ok(json!("42"))
        },
    ));
    let agent = Agent::new(config("lmstudio", &server))?.with_tools(tools);

    assert_eq!(agent.generate("What is x?", None, None), Completion::success("x is 42."));
    first.assert();
    second.assert();
    Ok(())
}

#[test]
fn test_ollama_streaming() -> Result<()> {
    let mut server = Server::new();
    let body = concat!(
        r#"{"message":{"role":"assistant","content":"Hel"},"done":false}"#,
        "\n",
        r#"{"message":{"role":"assistant","content":"lo"},"done":false}"#,
        "\n",
        r#"{"message":{"role":"assistant","content":""},"done":true}"#,
        "\n"
    );
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({"stream": true})))
        .with_status(200)
        .with_body(body)
        .create();

    let agent = Agent::new(ClientConfig {
        stream: true,
        ..config("ollama", &server)
    })?;

    assert_eq!(agent.generate("Say hello", None, None), Completion::success("Hello"));
    mock.assert();
    Ok(())
}

#[test]
fn test_temperature_is_forwarded() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .match_body(Matcher::PartialJson(json!({
            "options": {"num_ctx": 16384, "temperature": 0.7}
        })))
        .with_status(200)
        .with_body(json!({"message": {"role": "assistant", "content": "ok"}, "done": true}).to_string())
        .create();

    let mut config = config("ollama", &server);
    config.num_ctx = 16384;
    config.sampling.temperature = 0.7;
    let agent = Agent::new(config)?;

    assert_eq!(agent.generate("hi", None, None).status, 200);
    mock.assert();
    Ok(())
}

#[test]
fn test_lmstudio_with_image() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .match_header("authorization", "Bearer lm-studio")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""role":"system""#.to_string()),
            Matcher::Regex(r#""type":"image_url""#.to_string()),
            Matcher::Regex(r#"data:image/png;base64,"#.to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "A tiny image."},
                    "finish_reason": "stop"
                }]
            })
            .to_string(),
        )
        .create();

    let agent = Agent::new(config("lmstudio", &server))?;
    let completion = agent.generate(
        "Describe this",
        Some("You describe images."),
        Some(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
    );

    assert_eq!(completion, Completion::success("A tiny image."));
    mock.assert();
    Ok(())
}

#[test]
fn test_unknown_provider_makes_no_request() -> Result<()> {
    let mut server = Server::new();
    let mock = server.mock("POST", Matcher::Any).expect(0).create();

    let agent = Agent::new(config("unknown-provider", &server))?;
    let completion = agent.generate("hi", None, None);

    assert_eq!(completion.into_parts(), (String::new(), 400));
    mock.assert();
    Ok(())
}

#[test]
fn test_backend_failure_status_is_passed_through() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/v1/chat/completions")
        .with_status(500)
        .with_body("internal error")
        .create();

    let agent = Agent::new(config("lmstudio", &server))?;
    assert_eq!(agent.generate("hi", None, None), Completion::failed(500));
    mock.assert();
    Ok(())
}

#[test]
fn test_malformed_body_is_a_decode_failure() -> Result<()> {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/api/chat")
        .with_status(200)
        .with_body("{\"unexpected\": true}")
        .create();

    let agent = Agent::new(config("ollama", &server))?;
    assert_eq!(agent.generate("hi", None, None), Completion::failed(502));
    mock.assert();
    Ok(())
}

#[test]
fn test_unreachable_backend_is_a_timeout() -> Result<()> {
    let agent = Agent::new(ClientConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..Default::default()
    })?;

    assert_eq!(agent.generate("hi", None, None), Completion::failed(408));
    Ok(())
}
