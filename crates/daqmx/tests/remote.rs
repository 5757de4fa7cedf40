//! Task lifecycle over the remote adapter with a scripted session server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use daqmx::driver::remote::{EventStream, RpcCode, RpcStatus};
use daqmx::{
    ErrorKind, GrpcOptions, RemoteDriver, SessionInitializationBehavior, SessionTransport, Task,
};
use serde_json::{json, Value};

/// Answers from a fixed table and records every request.
#[derive(Debug, Default)]
struct FakeServer {
    responses: Mutex<HashMap<&'static str, Value>>,
    requests: Mutex<Vec<(String, Value)>>,
}

impl FakeServer {
    fn attached(name: &str) -> Arc<Self> {
        let server = Self::default();
        {
            let mut responses = server.responses.lock().unwrap();
            responses.insert(
                "CreateTask",
                json!({ "task": { "name": name }, "new_session_initialized": false }),
            );
            responses.insert("GetTaskAttributeString", json!({ "status": 0, "value": name }));
            responses.insert("StartTask", json!({ "status": 0 }));
            responses.insert("StopTask", json!({ "status": 0 }));
            responses.insert("SaveTask", json!({ "status": 0 }));
            responses.insert("ClearTask", json!({ "status": 0 }));
            responses.insert(
                "IsTaskDone",
                json!({ "status": -200088, "error_message": "Task specified is invalid or does not exist." }),
            );
        }
        Arc::new(server)
    }

    fn methods(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
    }

    fn request(&self, method: &str) -> Option<Value> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .find(|(m, _)| m == method)
            .map(|(_, r)| r.clone())
    }
}

impl SessionTransport for FakeServer {
    fn invoke(&self, method: &str, request: Value) -> Result<Value, RpcStatus> {
        self.requests.lock().unwrap().push((method.to_string(), request));
        self.responses
            .lock()
            .unwrap()
            .get(method)
            .cloned()
            .ok_or_else(|| RpcStatus::new(RpcCode::Unimplemented, format!("{method} is not implemented")))
    }

    fn subscribe(&self, method: &str, _request: Value) -> Result<Box<dyn EventStream>, RpcStatus> {
        Err(RpcStatus::new(RpcCode::Unimplemented, format!("{method} is not implemented")))
    }
}

fn attach(server: &Arc<FakeServer>, name: &str) -> Arc<RemoteDriver> {
    Arc::new(RemoteDriver::new(
        server.clone(),
        GrpcOptions {
            session_name: name.into(),
            initialization_behavior: SessionInitializationBehavior::AttachToServerSession,
        },
    ))
}

#[test]
fn test_attached_session_survives_drop() {
    let server = FakeServer::attached("shared");
    {
        let task = Task::new(attach(&server, "shared"), "shared").unwrap();
        assert_eq!(task.name(), "shared");
        assert!(!task.owns_on_exit());
        task.start().unwrap();
        task.stop().unwrap();
    }
    let methods = server.methods();
    assert_eq!(methods.first().map(String::as_str), Some("CreateTask"));
    assert!(methods.iter().any(|m| m == "StartTask"));
    assert!(!methods.iter().any(|m| m == "ClearTask"));
}

#[test]
fn test_close_clears_attached_session_by_name() {
    let server = FakeServer::attached("shared");
    let task = Task::new(attach(&server, "shared"), "shared").unwrap();
    task.save("", "me", false, true, false).unwrap();
    task.close().unwrap();

    let save = server.request("SaveTask").unwrap();
    assert_eq!(save["save_as"], json!("shared"));
    assert_eq!(save["author"], json!("me"));
    assert_eq!(server.request("ClearTask").unwrap()["task"]["name"], json!("shared"));
}

#[test]
fn test_server_status_becomes_driver_error() {
    let server = FakeServer::attached("shared");
    let task = Task::new(attach(&server, "shared"), "shared").unwrap();
    let err = task.is_task_done().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Driver);
    assert_eq!(err.code(), -200088);
    assert_eq!(err.task_name(), Some("shared"));

    let err = task.wait_until_done(1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FunctionNotSupported);
    task.close().unwrap();
}
