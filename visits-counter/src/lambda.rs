use {
    lambda_http::{run, service_fn, Body, Error, Request, Response},
    visits_core::{HttpResponse, VisitRequest},
    crate::service::CounterService,
};

/// Serves api gateway / function url events until the runtime shuts the process down.
pub async fn run_lambda(service: CounterService) -> Result<(), Error> {
    run(service_fn(|event: Request| handle_event(&service, event))).await
}

/// Store failures are returned as errors so the platform answers with a 5xx.
pub async fn handle_event(service: &CounterService, event: Request) -> Result<Response<Body>, Error> {
    let response = service.handle(VisitRequest::from(&event)).await?;
    Ok(into_lambda_response(response))
}

pub fn into_lambda_response(response: HttpResponse) -> Response<Body> {
    let body = match String::from_utf8(response.body) {
        Ok(text) => Body::Text(text),
        Err(err) => Body::Binary(err.into_bytes()),
    };
    let mut lambda_response = Response::new(body);
    *lambda_response.status_mut() = response.status;
    *lambda_response.headers_mut() = response.headers;
    lambda_response
}
