use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};
use micro_httpd::protocol::BoxError;
use micro_httpd::{Application, Environment, Server, ServerConfig};

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let config = ServerConfig::builder().write_buffer_threshold(Some(64 * 1024)).build();
    let handle = match Server::start_with(config, ("127.0.0.1", 8080), SimpleApplication).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };
    info!(addr = %handle.local_addr(), "server started, press ctrl-c to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(cause = %e, "can't listen for ctrl-c");
    }
    handle.stopped().await;
}

struct SimpleApplication;

#[async_trait]
impl Application for SimpleApplication {
    async fn call(&self, env: &mut Environment<'_>) -> Result<(), BoxError> {
        let path = env.path().to_owned();
        let body = env.body().read_to_end().await?;
        info!(%path, body_size = body.len(), "receiving request");

        let mut response = env.response();
        response.headers_mut()?.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

        match path.as_str() {
            "/" => response.write(b"Hello World!\r\n").await?,
            "/echo" => response.write(&body).await?,
            _ => {
                response.set_status(StatusCode::NOT_FOUND)?;
                response.write(b"not found\r\n").await?;
            }
        }
        Ok(())
    }
}
