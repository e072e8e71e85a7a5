//! Browser capabilities over an in-memory page, dispatched the way the loop does it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use docsmith_browser::WebDriverController;
use docsmith_core::tools::{Clicker, Navigator, PageExtractor, ScriptExecutor};
use docsmith_core::{browser_session, Dispatcher, FailureKind, ToolRegistry};
use serde_json::{json, Value};

/// Fake page: selector → (text, html); records navigation and clicks
#[derive(Default)]
struct FakePage {
    elements: HashMap<String, (String, String)>,
    script_result: Value,
    log: Arc<Mutex<Vec<String>>>,
}

impl FakePage {
    fn element(&self, selector: &str) -> Result<&(String, String)> {
        self.elements
            .get(selector)
            .ok_or_else(|| anyhow::anyhow!("no such element: {}", selector))
    }
}

#[async_trait]
impl WebDriverController for FakePage {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().push(format!("navigate {}", url));
        Ok(())
    }

    async fn element_text(&mut self, selector: &str) -> Result<String> {
        Ok(self.element(selector)?.0.clone())
    }

    async fn element_html(&mut self, selector: &str) -> Result<String> {
        Ok(self.element(selector)?.1.clone())
    }

    async fn click(&mut self, selector: &str) -> Result<()> {
        self.element(selector)?;
        self.log.lock().unwrap().push(format!("click {}", selector));
        Ok(())
    }

    async fn execute_script(&mut self, script: &str, _args: Vec<Value>) -> Result<Value> {
        self.log.lock().unwrap().push(format!("script {}", script));
        Ok(self.script_result.clone())
    }

    async fn quit(&mut self) -> Result<()> {
        Ok(())
    }
}

fn dispatcher_for(page: FakePage) -> Dispatcher {
    let session = browser_session(page);
    let registry = ToolRegistry::new()
        .with(Arc::new(PageExtractor::new(session.clone())))
        .unwrap()
        .with(Arc::new(Navigator::new(session.clone())))
        .unwrap()
        .with(Arc::new(ScriptExecutor::new(session.clone())))
        .unwrap()
        .with(Arc::new(Clicker::new(session)))
        .unwrap();
    Dispatcher::new(registry)
}

fn docs_page() -> FakePage {
    let mut elements = HashMap::new();
    elements.insert(
        "body".to_string(),
        ("Employees API\nGET /employees".to_string(), "<body><h1>Employees API</h1></body>".to_string()),
    );
    elements.insert(
        "#auth".to_string(),
        ("Bearer tokens".to_string(), "<section id=\"auth\">Bearer tokens</section>".to_string()),
    );
    FakePage {
        elements,
        ..FakePage::default()
    }
}

#[tokio::test]
async fn test_extract_defaults_to_body_text() {
    let dispatcher = dispatcher_for(docs_page());

    let call = dispatcher.resolve("extract_page_content", "{}").unwrap();
    assert_eq!(call.arguments["selector"], "body");

    assert_eq!(call.execute().await.unwrap(), "Employees API\nGET /employees");
}

#[tokio::test]
async fn test_extract_html_format() {
    let dispatcher = dispatcher_for(docs_page());

    let call = dispatcher
        .resolve("extract_page_content", r##"{"selector": "#auth", "format": "html"}"##)
        .unwrap();

    assert_eq!(
        call.execute().await.unwrap(),
        "<section id=\"auth\">Bearer tokens</section>"
    );
}

#[tokio::test]
async fn test_extract_missing_element_is_browser_error() {
    let dispatcher = dispatcher_for(docs_page());

    let call = dispatcher
        .resolve("extract_page_content", r#"{"selector": ".nope"}"#)
        .unwrap();
    let err = call.execute().await.unwrap_err();

    assert!(err.to_string().contains("no such element: .nope"));
}

#[tokio::test]
async fn test_navigate_and_click_share_one_session() {
    let page = docs_page();
    let log = page.log.clone();
    let dispatcher = dispatcher_for(page);

    let navigate = dispatcher
        .resolve("browser_navigate", r#"{"url": "https://developer.example.com/v3"}"#)
        .unwrap();
    assert_eq!(
        navigate.execute().await.unwrap(),
        "Navigated to https://developer.example.com/v3"
    );

    let click = dispatcher
        .resolve("browser_click", r##"{"selector": "#auth"}"##)
        .unwrap();
    assert_eq!(click.execute().await.unwrap(), "clicked #auth");

    assert_eq!(
        *log.lock().unwrap(),
        vec!["navigate https://developer.example.com/v3", "click #auth"]
    );
}

#[tokio::test]
async fn test_navigate_requires_url() {
    let dispatcher = dispatcher_for(docs_page());
    let err = dispatcher.resolve("browser_navigate", "{}").unwrap_err();
    assert_eq!(err.kind(), FailureKind::MissingArgument);
}

#[tokio::test]
async fn test_script_string_result_returned_verbatim() {
    let page = FakePage {
        script_result: json!("Example API"),
        ..docs_page()
    };
    let dispatcher = dispatcher_for(page);

    let call = dispatcher
        .resolve("browser_execute_js", r#"{"script": "return document.title;"}"#)
        .unwrap();

    assert_eq!(call.execute().await.unwrap(), "Example API");
}

#[tokio::test]
async fn test_script_structured_result_returned_as_json() {
    let page = FakePage {
        script_result: json!({"links": 3}),
        ..docs_page()
    };
    let dispatcher = dispatcher_for(page);

    let call = dispatcher
        .resolve("browser_execute_js", r#"{"script": "return {links: 3};"}"#)
        .unwrap();

    assert_eq!(call.execute().await.unwrap(), r#"{"links":3}"#);
}
