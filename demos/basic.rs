use std::time::Duration;

use layered_http::{ClientOptions, HttpClient, RetryPolicy, TlsTrustStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com/".to_owned());

    let mut options = ClientOptions::default()
        .with_timeout(Duration::from_secs(15))
        .with_retry(RetryPolicy::new(
            3,
            Duration::from_millis(500),
            [429, 502, 503, 504],
        )?);

    if let Ok(path) = std::env::var("CA_CERT_FILE") {
        options = options.with_tls(TlsTrustStore::from_pem_file(path)?);
    }

    let client = HttpClient::from_options(options)?;
    println!("layers: {:?}", client.layers());

    let response = client.send(client.get(url)).await?;
    println!("status: {}", response.status());
    println!("{}", response.text().await?);

    Ok(())
}
