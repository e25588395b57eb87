//! Test helpers: an in-process LCD that answers with canned bodies.
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{StatusCode, Uri};

use crate::config::Config;

#[derive(Default)]
pub(crate) struct FakeLcd {
    routes: HashMap<String, (StatusCode, String)>,
    delay: Duration,
}

pub(crate) struct RunningLcd {
    addr: SocketAddr,
}

impl FakeLcd {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `path` with `body`. The query string is ignored when matching.
    pub fn route(self, path: &str, body: &str) -> Self {
        self.respond(path, StatusCode::OK, body)
    }

    pub fn respond(mut self, path: &str, status: StatusCode, body: &str) -> Self {
        let path = path.split('?').next().unwrap_or(path);
        self.routes
            .insert(path.to_string(), (status, body.to_string()));
        self
    }

    /// Delays every response.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn serve(self) -> RunningLcd {
        let routes = Arc::new(self.routes);
        let delay = self.delay;

        let app = Router::new().fallback(move |uri: Uri| {
            let routes = routes.clone();
            async move {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match routes.get(uri.path()) {
                    Some((status, body)) => (*status, body.clone()),
                    None => (StatusCode::NOT_FOUND, format!("no route for {}", uri.path())),
                }
            }
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        RunningLcd { addr }
    }
}

impl RunningLcd {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// One provider chain `cosmos` with a consumer chain `neutron`, both served
/// by the LCD at `url`. Validator `cosmosvaloper1abc` has a consensus
/// address, `cosmosvaloper1def` doesn't. `neutron` has consumer id `1`.
pub(crate) fn config(url: &str) -> Config {
    Config::parse(&format!(
        r#"
        timeout = 2

        [price]
        coingecko-url = "{url}"

        [[chains]]
        name = "cosmos"
        lcd-endpoint = "{url}"
        denoms = [
            {{ denom = "uatom", display-denom = "atom", coingecko-currency = "cosmos" }},
        ]
        validators = [
            {{ address = "cosmosvaloper1abc", consensus-address = "cosmosvalcons1abc" }},
            {{ address = "cosmosvaloper1def" }},
        ]

        [[chains.consumer-chains]]
        name = "neutron"
        lcd-endpoint = "{url}"
        consumer-id = "1"
        "#
    ))
    .unwrap()
}
