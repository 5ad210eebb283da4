use {
    tracing::{info, error},
    http::StatusCode,
    visits_core::{CorsPolicy, CounterRecord, HttpResponse, VisitRequest, VisitsBody, DEFAULT_COUNTER_NAME},
    crate::{
        error::CounterError,
        metrics::{Metrics, InFlightGuard},
        store::{BoxedStore, CounterStore},
    },
};

/// Stateless visit counter. Every call reads the counter, creates it when missing and
/// bumps it by one on the store side.
///
/// The returned count is derived from the read, not from the increment, so concurrent
/// requests can observe the same number while the stored total stays exact.
pub struct CounterService {
    store: BoxedStore,
    counter_name: String,
    cors: CorsPolicy,
    metrics: Option<Metrics>,
}

impl CounterService {
    pub fn new(store: BoxedStore, cors: CorsPolicy) -> Self {
        Self {
            store,
            counter_name: DEFAULT_COUNTER_NAME.to_owned(),
            cors,
            metrics: None,
        }
    }

    pub fn with_counter_name(mut self, counter_name: impl Into<String>) -> Self {
        self.counter_name = counter_name.into();
        self
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn counter_name(&self) -> &str {
        &self.counter_name
    }

    pub async fn handle(&self, request: VisitRequest) -> Result<HttpResponse, CounterError> {
        let _in_flight = self.metrics.as_ref().map(|v| InFlightGuard::wrap(v.requests_in_flight.clone()));
        if let Some(metrics) = self.metrics.as_ref() {
            metrics.requests_total.inc();
        }

        let result = self.count_visit(&request).await;
        if let Err(err) = &result {
            error!(method = %request.method, path = %request.path, "failed to count visit: {err}");
            if let Some(metrics) = self.metrics.as_ref() {
                metrics.requests_failed_total.inc();
            }
        }
        result
    }

    /// Same as `handle`, but a failure becomes a plain 500 response (still with cors headers) for surfaces that have to answer.
    pub async fn respond(&self, request: VisitRequest) -> HttpResponse {
        self.handle(request).await.unwrap_or_else(|_| self.cors.apply(response_internal_error()))
    }

    async fn count_visit(&self, request: &VisitRequest) -> Result<HttpResponse, CounterError> {
        info!(method = %request.method, path = %request.path, "counting visit");

        let visits = match self.store.get(&self.counter_name).await? {
            Some(record) => record.visits.checked_add(1)
                .ok_or_else(|| CounterError::CounterOverflow { name: self.counter_name.clone() })?,
            None => {
                info!(counter = %self.counter_name, "no visits counter in store, creating one");
                self.store.create(&CounterRecord::new(&self.counter_name)).await?;
                1
            }
        };

        info!(counter = %self.counter_name, "incrementing the visits count by 1");
        self.store.increment(&self.counter_name, 1).await?;

        Ok(self.cors.apply(HttpResponse::json(&VisitsBody { visits })?))
    }
}

fn response_internal_error() -> HttpResponse {
    HttpResponse::new().with_status(StatusCode::INTERNAL_SERVER_ERROR).with_body("visits: internal error.\n")
}
