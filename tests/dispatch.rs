//! Tool-call correlation through a running session: every distinct
//! request id gets exactly one response, echoed back with its id and
//! name intact.

mod common;

use std::sync::{Arc, Mutex};

use serde_json::json;

use common::{next_status, wait_for, FakeConnector, FakeDevices};
use voxlink::link::{LinkEvent, ToolCallRequest};
use voxlink::tools::{ForgeKind, MediaForge, PresentationOverlay};
use voxlink::{Result, SessionConfig, SessionController, SessionStatus, SessionUpdate};

struct CountingOverlay {
    opens: Mutex<u32>,
}

impl PresentationOverlay for CountingOverlay {
    fn open(&self) -> Result<bool> {
        let mut opens = self.opens.lock().unwrap();
        *opens += 1;
        Ok(*opens > 1)
    }
}

struct RecordingForge {
    jobs: Mutex<Vec<(ForgeKind, String)>>,
}

impl MediaForge for RecordingForge {
    fn request_generation(&self, kind: ForgeKind, prompt: String) -> Result<()> {
        self.jobs.lock().unwrap().push((kind, prompt));
        Ok(())
    }
}

fn call(id: &str, name: &str, args: serde_json::Value) -> LinkEvent {
    LinkEvent::ToolCall(ToolCallRequest {
        id: id.to_string(),
        name: name.to_string(),
        args,
    })
}

#[tokio::test]
async fn every_request_gets_exactly_one_correlated_response() {
    let (connector, events, log) = FakeConnector::new();
    let forge = Arc::new(RecordingForge {
        jobs: Mutex::new(Vec::new()),
    });
    let session = SessionController::new(
        SessionConfig::default(),
        connector,
        FakeDevices::new(),
        Arc::new(CountingOverlay {
            opens: Mutex::new(0),
        }),
        Arc::clone(&forge) as Arc<dyn MediaForge>,
    );
    let (handle, mut updates) = session.start();
    assert_eq!(next_status(&mut updates).await, SessionStatus::Connecting);
    assert_eq!(next_status(&mut updates).await, SessionStatus::Listening);

    events
        .send(call("a", "openPresentation", json!({})))
        .await
        .unwrap();
    events
        .send(call("b", "generateImage", json!({ "prompt": "a red door" })))
        .await
        .unwrap();
    events
        .send(call("c", "generateVideo", json!({ "prompt": "rain on glass" })))
        .await
        .unwrap();
    // Retransmission of an already-answered id must not produce a
    // second response.
    events
        .send(call("a", "openPresentation", json!({})))
        .await
        .unwrap();
    events
        .send(call("d", "noSuchTool", json!({})))
        .await
        .unwrap();

    events
        .send(LinkEvent::InputTranscript("barrier".to_string()))
        .await
        .unwrap();
    wait_for(&mut updates, |u| matches!(u, SessionUpdate::Transcript(_))).await;

    {
        let sent = log.lock().unwrap();
        let ids: Vec<&str> = sent.tool_responses.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c", "d"]);
        assert_eq!(
            sent.tool_responses[0].response["result"],
            "initial_opening_success"
        );
        assert_eq!(sent.tool_responses[1].response["status"], "FORGING_INITIATED");
        assert_eq!(sent.tool_responses[2].response["status"], "FORGING_INITIATED");
        assert!(sent.tool_responses[3].response["error"]
            .as_str()
            .unwrap()
            .contains("unknown tool"));
    }
    assert_eq!(
        *forge.jobs.lock().unwrap(),
        vec![
            (ForgeKind::Image, "a red door".to_string()),
            (ForgeKind::Video, "rain on glass".to_string()),
        ]
    );

    handle.disconnect();
    handle.join().await.unwrap();
}

#[tokio::test]
async fn reopening_the_presentation_reports_cached() {
    let (connector, events, log) = FakeConnector::new();
    let session = SessionController::new(
        SessionConfig::default(),
        connector,
        FakeDevices::new(),
        Arc::new(CountingOverlay {
            opens: Mutex::new(0),
        }),
        Arc::new(RecordingForge {
            jobs: Mutex::new(Vec::new()),
        }),
    );
    let (handle, mut updates) = session.start();
    assert_eq!(next_status(&mut updates).await, SessionStatus::Connecting);
    assert_eq!(next_status(&mut updates).await, SessionStatus::Listening);

    events
        .send(call("p1", "openPresentation", json!({})))
        .await
        .unwrap();
    assert_eq!(next_status(&mut updates).await, SessionStatus::Presenting);
    events.send(LinkEvent::TurnComplete).await.unwrap();
    assert_eq!(next_status(&mut updates).await, SessionStatus::Listening);

    events
        .send(call("p2", "openPresentation", json!({})))
        .await
        .unwrap();
    assert_eq!(next_status(&mut updates).await, SessionStatus::Presenting);
    events
        .send(LinkEvent::InputTranscript("barrier".to_string()))
        .await
        .unwrap();
    wait_for(&mut updates, |u| matches!(u, SessionUpdate::Transcript(_))).await;

    {
        let sent = log.lock().unwrap();
        assert_eq!(
            sent.tool_responses[0].response["result"],
            "initial_opening_success"
        );
        assert_eq!(sent.tool_responses[1].response["result"], "reopened_from_cache");
    }

    handle.disconnect();
    handle.join().await.unwrap();
}
