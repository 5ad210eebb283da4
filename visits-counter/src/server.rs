use {
    std::{convert::Infallible, net::SocketAddr, pin::Pin, sync::Arc},
    tracing::{info, error},
    tokio::net::TcpListener,
    hyper::{Request, Response, body::{Bytes, Incoming}, server::conn::http1},
    hyper_util::rt::{TokioIo, TokioTimer},
    http_body_util::Full,
    visits_core::{HttpResponse, VisitRequest},
    crate::service::CounterService,
};

/// Local http surface: every request, whatever the method or path, counts as a visit.
#[derive(Clone)]
pub struct CounterServer {
    service: Arc<CounterService>,
}

impl CounterServer {
    pub fn new(service: Arc<CounterService>) -> Self {
        Self {
            service,
        }
    }

    pub async fn bind(self, addr: SocketAddr) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!("running on {:?}", listener.local_addr()?);
        self.serve(listener).await;
        Ok(())
    }

    pub async fn serve(self, listener: TcpListener) {
        loop {
            let (tcp, _) = match listener.accept().await {
                Ok(v) => v,
                Err(err) => {
                    error!("failed to accept connection: {err:?}");
                    continue;
                }
            };
            let io = TokioIo::new(tcp);

            let server = self.clone();
            tokio::task::spawn(async move {
                if let Err(err) = http1::Builder::new()
                    .timer(TokioTimer::new())
                    .serve_connection(io, server)
                    .await {
                        error!("error while serving connection: {err:?}");
                    }
            });
        }
    }
}

impl hyper::service::Service<Request<Incoming>> for CounterServer {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let service = self.service.clone();
        let request = VisitRequest::from(&req);
        Box::pin(async move { Ok(into_hyper_response(service.respond(request).await)) })
    }
}

fn into_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut hyper_response = Response::new(Full::new(Bytes::from(response.body)));
    *hyper_response.status_mut() = response.status;
    *hyper_response.headers_mut() = response.headers;
    hyper_response
}
