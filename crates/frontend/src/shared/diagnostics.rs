use contracts::shared::logger::CreateLogRequest;
use gloo_net::http::Request;
use leptos::task::spawn_local;

use super::api_utils::api_url;

/// Канал диагностики для деградаций клиента
pub trait DiagnosticSink {
    fn report(&self, category: &str, message: &str);
}

/// Browser console plus best-effort POST /api/logs
#[derive(Debug, Clone, Copy, Default)]
pub struct ServerDiagnostics;

impl DiagnosticSink for ServerDiagnostics {
    fn report(&self, category: &str, message: &str) {
        log::warn!("[{}] {}", category, message);

        let entry = CreateLogRequest::client(category, message);
        spawn_local(async move {
            let sent = match Request::post(&api_url("/api/logs")).json(&entry) {
                Ok(request) => request.send().await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                log::debug!("diagnostic log not delivered: {}", e);
            }
        });
    }
}
