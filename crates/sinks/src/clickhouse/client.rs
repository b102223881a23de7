//! ClickHouse client construction

use canbridge_config::ClickHouseConfig;
use clickhouse::Client;

/// Build an HTTP client from connection settings
///
/// Credentials are only attached when set, so a default-user server works
/// with an empty config.
pub fn build_client(config: &ClickHouseConfig) -> Client {
    let mut client = Client::default()
        .with_url(&config.url)
        .with_database(&config.database);

    if !config.username.is_empty() {
        client = client.with_user(&config.username);
    }

    if !config.password.is_empty() {
        client = client.with_password(&config.password);
    }

    client
}
