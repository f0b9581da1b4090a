//! Greeting endpoints

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

/// Greeting record returned by `/helloworld-bean`
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HelloWorldBean {
    pub first_name: String,
    pub last_name: String,
    pub city: String,
}

/// Host name of the machine serving the request, `Unknown` when it cannot be read
pub fn container_hostname() -> String {
    match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            warn!("Failed to resolve host name: {}", e);
            "Unknown".to_string()
        }
    }
}

fn container_greeting(hostname: &str, version: &str) -> String {
    format!(
        "Hello World from Container: {}<br>App Version: {}",
        hostname, version
    )
}

/// GET /hello1
async fn hello(State(state): State<AppState>) -> String {
    container_greeting(&container_hostname(), &state.info.version)
}

/// GET /helloworld-bean
async fn hello_world_bean() -> Json<HelloWorldBean> {
    Json(HelloWorldBean {
        first_name: "Kalyan".to_string(),
        last_name: "Reddy".to_string(),
        city: "Hyderabad".to_string(),
    })
}

/// GET /helloworld1
async fn hello_world() -> &'static str {
    "Hello World1"
}

/// Create greeting routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/hello1", get(hello))
        .route("/helloworld-bean", get(hello_world_bean))
        .route("/helloworld1", get(hello_world))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_greeting() {
        assert_eq!(
            container_greeting("web-7f9c", "V1"),
            "Hello World from Container: web-7f9c<br>App Version: V1"
        );
    }

    #[test]
    fn test_bean_field_order() {
        let bean = HelloWorldBean {
            first_name: "Kalyan".to_string(),
            last_name: "Reddy".to_string(),
            city: "Hyderabad".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&bean).unwrap(),
            r#"{"firstName":"Kalyan","lastName":"Reddy","city":"Hyderabad"}"#
        );
    }

    #[test]
    fn test_hostname_is_never_empty() {
        assert!(!container_hostname().is_empty());
    }
}
