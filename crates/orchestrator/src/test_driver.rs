//! Scripted in-process platform driver for scheduler tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::driver::{DriverError, PlatformDriver, ProspectPage, ProspectRef};

type PageResult = Result<ProspectPage, DriverError>;
type SendResult = Result<(), DriverError>;
type PageFactory = Box<dyn Fn() -> PageResult + Send + Sync>;

/// Driver whose responses are scripted per call. Queued results are served
/// first; once the queue is empty the default factory (or an empty final
/// page) answers.
#[derive(Default)]
pub struct ScriptedDriver {
    pages: Mutex<VecDeque<PageResult>>,
    default_page: Mutex<Option<PageFactory>>,
    message_results: Mutex<VecDeque<SendResult>>,
    connection_results: Mutex<VecDeque<SendResult>>,
    fetched_pages: Mutex<Vec<i64>>,
    sent_messages: Mutex<Vec<(String, String)>>,
    sent_connections: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_page(&self, result: PageResult) {
        self.pages.lock().unwrap().push_back(result);
    }

    pub fn set_default_page(
        &self,
        factory: impl Fn() -> PageResult + Send + Sync + 'static,
    ) {
        *self.default_page.lock().unwrap() = Some(Box::new(factory));
    }

    pub fn clear_default_page(&self) {
        *self.default_page.lock().unwrap() = None;
    }

    pub fn push_message_result(&self, result: SendResult) {
        self.message_results.lock().unwrap().push_back(result);
    }

    pub fn push_connection_result(&self, result: SendResult) {
        self.connection_results.lock().unwrap().push_back(result);
    }

    pub fn fetched_pages(&self) -> Vec<i64> {
        self.fetched_pages.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<(String, String)> {
        self.sent_messages.lock().unwrap().clone()
    }

    pub fn sent_connections(&self) -> Vec<String> {
        self.sent_connections.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformDriver for ScriptedDriver {
    async fn fetch_prospect_page(
        &self,
        _source_url: &str,
        page: i64,
    ) -> Result<ProspectPage, DriverError> {
        self.fetched_pages.lock().unwrap().push(page);

        if let Some(result) = self.pages.lock().unwrap().pop_front() {
            return result;
        }
        if let Some(factory) = self.default_page.lock().unwrap().as_ref() {
            return factory();
        }
        Ok(ProspectPage {
            prospects: vec![],
            has_more: false,
            total: None,
        })
    }

    async fn send_message(
        &self,
        prospect: &ProspectRef,
        content: &str,
    ) -> Result<(), DriverError> {
        let result = self
            .message_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.sent_messages
                .lock()
                .unwrap()
                .push((prospect.profile_url.clone(), content.to_string()));
        }
        result
    }

    async fn send_connection_request(&self, prospect: &ProspectRef) -> Result<(), DriverError> {
        let result = self
            .connection_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()));
        if result.is_ok() {
            self.sent_connections
                .lock()
                .unwrap()
                .push(prospect.profile_url.clone());
        }
        result
    }
}
