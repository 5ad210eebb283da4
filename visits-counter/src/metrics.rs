use {
    std::{convert::Infallible, net::SocketAddr, pin::Pin},
    tracing::{info, error},
    tokio::net::TcpListener,
    hyper::{Request, body::{Incoming, Bytes}, Response, server::conn::http1, http::StatusCode},
    hyper_util::rt::{TokioIo, TokioTimer},
    http_body_util::Full,
    thiserror::Error,
    prometheus::{
        TextEncoder,
        Registry,
        IntGauge,
        IntCounter,
        register_int_gauge_with_registry,
        register_int_counter_with_registry,
    },
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,

    pub(crate) requests_total: IntCounter,
    pub(crate) requests_failed_total: IntCounter,
    pub(crate) requests_in_flight: IntGauge,
}

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("failed to register: {reason}")]
    FailedToRegister {
        reason: String
    },

    #[error("failed to collect: {reason}")]
    FailedToCollect {
        reason: String
    },
}

impl Metrics {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let requests_total = register_int_counter_with_registry!("visits_requests_total", "total visit requests processed", registry)
            .map_err(|err| MetricsError::FailedToRegister { reason: format!("{err:?}") })?;
        let requests_failed_total = register_int_counter_with_registry!("visits_requests_failed_total", "visit requests that failed with a store or response error", registry)
            .map_err(|err| MetricsError::FailedToRegister { reason: format!("{err:?}") })?;
        let requests_in_flight = register_int_gauge_with_registry!("visits_requests_in_flight", "visit requests being processed", registry)
            .map_err(|err| MetricsError::FailedToRegister { reason: format!("{err:?}") })?;

        Ok(Self {
            registry,
            requests_total,
            requests_failed_total,
            requests_in_flight,
        })
    }

    pub fn encode(&self) -> Result<String, MetricsError> {
        let metrics = self.registry.gather();
        let encoder = TextEncoder::new();
        encoder.encode_to_string(&metrics)
            .map_err(|err| MetricsError::FailedToCollect { reason: format!("{err:?}") })
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.get()
    }

    pub fn requests_failed_total(&self) -> u64 {
        self.requests_failed_total.get()
    }
}

/// Decrements the in-flight gauge when the request future completes or is dropped.
pub(crate) struct InFlightGuard {
    gauge: IntGauge,
}

impl InFlightGuard {
    pub(crate) fn wrap(gauge: IntGauge) -> Self {
        gauge.inc();
        Self { gauge }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}

pub async fn run_metrics_server(metrics: Metrics, port: u16) {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let listener = match TcpListener::bind(addr).await {
        Ok(v) => v,
        Err(err) => {
            error!("failed to create TcpListener for metrics server: {err:?}");
            return;
        }
    };

    info!("running metrics server on {addr:?}");

    let metrics_server = MetricsServer::new(metrics);
    loop {
        let (tcp, _) = match listener.accept().await {
            Ok(v) => v,
            Err(err) => {
                error!("failed to accept connection in metrics server: {err:?}");
                continue;
            }
        };
        let io = TokioIo::new(tcp);
        let metrics_server = metrics_server.clone();
        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, metrics_server)
                .await {
                    error!("error while handling metrics request: {err:?}");
                }
        });
    }
}

#[derive(Clone)]
struct MetricsServer {
    metrics: Metrics,
}

impl MetricsServer {
    pub fn new(metrics: Metrics) -> Self {
        Self {
            metrics,
        }
    }
}

impl hyper::service::Service<Request<Incoming>> for MetricsServer {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, _req: Request<Incoming>) -> Self::Future {
        let response = match self.metrics.encode() {
            Ok(v) => Response::new(Full::new(Bytes::from(v))),
            Err(err) => {
                error!("failed to encode metrics: {err:?}");
                let mut response = Response::new(Full::new(Bytes::from("internal server error.\n")));
                *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                response
            }
        };
        Box::pin(async move { Ok(response) })
    }
}
