//! Connection-per-call engine

use super::{connector, exchange, Connector, HttpEngine, Target};
use crate::config::{EngineKind, HttpClientConfig};
use crate::message::{HttpRequest, HttpResponse};
use crate::tls::TlsContext;
use crate::Result;
use std::sync::Arc;

/// Opens a fresh connection for every call and closes it afterwards
///
/// Ignores any [`EngineTuning`](crate::EngineTuning); there is nothing to tune.
#[derive(Debug)]
pub struct SimpleEngine {
    config: Arc<HttpClientConfig>,
    connector: Connector,
}

impl SimpleEngine {
    pub fn new(config: Arc<HttpClientConfig>) -> Result<Self> {
        let connector = connector(&config)?;
        tracing::debug!(trust = %connector.tls_context().trust_kind(), "simple engine ready");
        Ok(SimpleEngine { config, connector })
    }
}

impl HttpEngine for SimpleEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Simple
    }

    fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    fn tls_context(&self) -> &TlsContext {
        self.connector.tls_context()
    }

    fn execute(&self, mut request: HttpRequest) -> Result<HttpResponse> {
        let filters = self.config.filter_chain();
        filters.before_send(&mut request);

        let target = Target::from_url(request.url())?;
        let mut conn = self.connector.connect(&target)?;
        let (response, _) = exchange(&mut conn, &request, &target, false)?;

        filters.after_receive(&request, &response);
        Ok(response)
    }
}
