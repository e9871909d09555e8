use std::sync::Mutex;

use relay_api::BrokerPublisher;

/// Publisher that keeps every message it is handed.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<(String, String)>>,
}

impl RecordingPublisher {
    pub fn published(&self) -> Vec<(String, String)> {
        self.published.lock().unwrap().clone()
    }
}

impl BrokerPublisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) {
        let payload = String::from_utf8_lossy(payload).into_owned();
        self.published.lock().unwrap().push((topic.to_string(), payload));
    }
}
